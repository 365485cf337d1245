mod csv_io;
mod excel_io;
mod json_io;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StandError;
use crate::models::{Polygon, UtilizationClass, UtilizationSet};

pub use csv_io::{read_csv, read_csv_from_bytes, write_csv, PolygonRow, POLYGON_COLUMNS};
pub use excel_io::{read_excel, write_excel};
pub use json_io::{read_json, read_json_from_bytes, write_json};

/// Trait for reading polygons from a file.
pub trait PolygonReader {
    fn read(&self, path: &Path) -> Result<Vec<Polygon>, StandError>;
}

/// Trait for writing a yield table to a file.
pub trait YieldWriter {
    fn write(&self, rows: &[YieldRow], path: &Path) -> Result<(), StandError>;
}

/// One line of a yield table: a layer total (blank genus) or a species, in
/// one utilization class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldRow {
    pub polygon_id: String,
    pub layer: String,
    pub genus: String,
    pub utilization_class: String,
    pub lorey_height: f32,
    pub basal_area: f32,
    pub trees_per_hectare: f32,
    pub quad_mean_diameter: f32,
    pub whole_stem_volume: f32,
    pub close_utilization_volume: f32,
    pub net_of_decay: f32,
    pub net_of_decay_and_waste: f32,
    pub net_of_decay_waste_and_breakage: f32,
}

/// Column names of [`YieldRow`], in file order.
pub const YIELD_COLUMNS: [&str; 13] = [
    "polygon_id",
    "layer",
    "genus",
    "utilization_class",
    "lorey_height",
    "basal_area",
    "trees_per_hectare",
    "quad_mean_diameter",
    "whole_stem_volume",
    "close_utilization_volume",
    "net_of_decay",
    "net_of_decay_and_waste",
    "net_of_decay_waste_and_breakage",
];

/// Classes reported in a yield table.
const REPORTED_CLASSES: [UtilizationClass; 5] = [
    UtilizationClass::All,
    UtilizationClass::U75To125,
    UtilizationClass::U125To175,
    UtilizationClass::U175To225,
    UtilizationClass::Over225,
];

impl YieldRow {
    fn new(polygon_id: &str, layer: &str, genus: &str, uc: UtilizationClass, u: &UtilizationSet) -> Self {
        Self {
            polygon_id: polygon_id.to_string(),
            layer: layer.to_string(),
            genus: genus.to_string(),
            utilization_class: uc.to_string(),
            lorey_height: u.lorey_height[uc],
            basal_area: u.basal_area[uc],
            trees_per_hectare: u.trees_per_hectare[uc],
            quad_mean_diameter: u.quad_mean_diameter[uc],
            whole_stem_volume: u.whole_stem_volume[uc],
            close_utilization_volume: u.close_utilization_volume[uc],
            net_of_decay: u.net_of_decay[uc],
            net_of_decay_and_waste: u.net_of_decay_and_waste[uc],
            net_of_decay_waste_and_breakage: u.net_of_decay_waste_and_breakage[uc],
        }
    }

    /// The numeric columns, in file order.
    pub fn values(&self) -> [f32; 9] {
        [
            self.lorey_height,
            self.basal_area,
            self.trees_per_hectare,
            self.quad_mean_diameter,
            self.whole_stem_volume,
            self.close_utilization_volume,
            self.net_of_decay,
            self.net_of_decay_and_waste,
            self.net_of_decay_waste_and_breakage,
        ]
    }
}

/// Flatten an estimated polygon into yield rows: per layer, the layer totals
/// followed by each species.
pub fn yield_rows(polygon: &Polygon) -> Vec<YieldRow> {
    let mut rows = Vec::new();
    for layer in polygon.layers.values() {
        let layer_name = layer.layer_type.to_string();
        for uc in REPORTED_CLASSES {
            rows.push(YieldRow::new(&polygon.id, &layer_name, "", uc, &layer.utilization));
        }
        for species in &layer.species {
            let genus = species.genus.to_string();
            for uc in REPORTED_CLASSES {
                rows.push(YieldRow::new(&polygon.id, &layer_name, &genus, uc, &species.utilization));
            }
        }
    }
    rows
}

/// CSV format reader/writer.
pub struct CsvFormat;

impl PolygonReader for CsvFormat {
    fn read(&self, path: &Path) -> Result<Vec<Polygon>, StandError> {
        read_csv(path)
    }
}

impl YieldWriter for CsvFormat {
    fn write(&self, rows: &[YieldRow], path: &Path) -> Result<(), StandError> {
        write_csv(rows, path)
    }
}

/// JSON format reader/writer.
#[derive(Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl PolygonReader for JsonFormat {
    fn read(&self, path: &Path) -> Result<Vec<Polygon>, StandError> {
        read_json(path)
    }
}

impl YieldWriter for JsonFormat {
    fn write(&self, rows: &[YieldRow], path: &Path) -> Result<(), StandError> {
        write_json(rows, path, self.pretty)
    }
}

/// Excel (.xlsx) format reader/writer.
pub struct ExcelFormat;

impl PolygonReader for ExcelFormat {
    fn read(&self, path: &Path) -> Result<Vec<Polygon>, StandError> {
        read_excel(path)
    }
}

impl YieldWriter for ExcelFormat {
    fn write(&self, rows: &[YieldRow], path: &Path) -> Result<(), StandError> {
        write_excel(rows, path)
    }
}
