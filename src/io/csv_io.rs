use std::io::Read;
use std::path::Path;

use crate::error::StandError;
use crate::models::{Genus, Layer, LayerType, Polygon, PolygonMode, Site, Species};

use super::YieldRow;

/// One species of one layer of a polygon, as read from a flat file.
///
/// Polygon- and layer-level columns are taken from the first row of the
/// polygon or layer; later rows may leave them blank.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PolygonRow {
    pub polygon_id: String,
    pub bec_zone: String,
    pub layer: String,
    pub genus: String,
    pub percent: f32,
    pub age_total: Option<f32>,
    pub years_to_breast_height: Option<f32>,
    pub height: Option<f32>,
    pub site_index: Option<f32>,
    pub site_curve: Option<u32>,
    pub crown_closure: Option<f32>,
    pub base_area: Option<f32>,
    pub trees_per_hectare: Option<f32>,
    pub percent_available: Option<f32>,
    pub mode: Option<String>,
    pub yield_factor: Option<f32>,
    pub stocking_class: Option<String>,
}

/// Column names of [`PolygonRow`], in file order.
pub const POLYGON_COLUMNS: [&str; 17] = [
    "polygon_id",
    "bec_zone",
    "layer",
    "genus",
    "percent",
    "age_total",
    "years_to_breast_height",
    "height",
    "site_index",
    "site_curve",
    "crown_closure",
    "base_area",
    "trees_per_hectare",
    "percent_available",
    "mode",
    "yield_factor",
    "stocking_class",
];

fn new_layer(row: &PolygonRow, layer_type: LayerType) -> Layer {
    let mut layer = Layer::new(layer_type);
    layer.site = Site {
        age_total: row.age_total,
        years_to_breast_height: row.years_to_breast_height,
        height: row.height,
        site_index: row.site_index,
        site_curve: row.site_curve,
    };
    layer.crown_closure = row.crown_closure;
    layer.base_area = row.base_area;
    layer.trees_per_hectare = row.trees_per_hectare;
    layer.stocking_class = row
        .stocking_class
        .as_deref()
        .and_then(|s| s.trim().chars().next());
    layer
}

fn new_polygon(row: &PolygonRow) -> Result<Polygon, StandError> {
    let mut polygon = Polygon::new(row.polygon_id.trim(), row.bec_zone.trim());
    polygon.percent_available = row.percent_available;
    polygon.mode = match row.mode.as_deref().map(str::trim) {
        Some(mode) if !mode.is_empty() => Some(mode.parse::<PolygonMode>()?),
        _ => None,
    };
    if let Some(factor) = row.yield_factor {
        polygon.yield_factor = factor;
    }
    Ok(polygon)
}

/// Group flat rows into polygons, keeping the order polygons first appear in.
pub(crate) fn rows_to_polygons(rows: Vec<PolygonRow>) -> Result<Vec<Polygon>, StandError> {
    let mut polygons: Vec<Polygon> = Vec::new();

    for row in rows {
        if row.polygon_id.trim().is_empty() {
            return Err(StandError::Parse("row without polygon_id".to_string()));
        }
        let layer_type: LayerType = row.layer.parse()?;
        let genus: Genus = row.genus.parse()?;

        let index = match polygons.iter().position(|p| p.id == row.polygon_id.trim()) {
            Some(index) => index,
            None => {
                polygons.push(new_polygon(&row)?);
                polygons.len() - 1
            }
        };
        let layer = polygons[index]
            .layers
            .entry(layer_type)
            .or_insert_with(|| new_layer(&row, layer_type));
        if layer.species_by_genus(genus).is_some() {
            return Err(StandError::Parse(format!(
                "Polygon {}: genus {genus} listed twice in the {layer_type} layer",
                row.polygon_id
            )));
        }
        layer.species.push(Species::new(genus, row.percent));
    }

    Ok(polygons)
}

fn parse_csv_records<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<Polygon>, StandError> {
    let rows = rdr
        .deserialize()
        .collect::<Result<Vec<PolygonRow>, csv::Error>>()?;
    rows_to_polygons(rows)
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Read polygons from a CSV file with one row per species.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<Polygon>, StandError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_csv_records(&mut rdr)
}

/// Read polygons from CSV bytes.
pub fn read_csv_from_bytes(data: &[u8]) -> Result<Vec<Polygon>, StandError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_csv_records(&mut rdr)
}

/// Write yield-table rows to a CSV file.
pub fn write_csv(rows: &[YieldRow], path: impl AsRef<Path>) -> Result<(), StandError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
