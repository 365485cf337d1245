use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use crate::error::StandError;
use crate::models::Polygon;

use super::csv_io::{rows_to_polygons, PolygonRow};
use super::{YieldRow, YIELD_COLUMNS};

struct SheetRow<'a> {
    cells: &'a [Data],
    columns: &'a HashMap<String, usize>,
}

impl SheetRow<'_> {
    fn cell(&self, name: &str) -> Option<&Data> {
        self.columns
            .get(name)
            .and_then(|&idx| self.cells.get(idx))
            .filter(|c| !c.is_empty())
    }

    fn string(&self, name: &str) -> String {
        self.cell(name)
            .map(|c| c.to_string().trim().to_string())
            .unwrap_or_default()
    }

    fn opt_string(&self, name: &str) -> Option<String> {
        Some(self.string(name)).filter(|s| !s.is_empty())
    }

    fn opt_f32(&self, name: &str) -> Result<Option<f32>, StandError> {
        match self.cell(name) {
            None => Ok(None),
            Some(c) => c.as_f64().map(|v| Some(v as f32)).ok_or_else(|| {
                StandError::Excel(format!("column {name}: '{c}' is not a number"))
            }),
        }
    }

    fn to_polygon_row(&self) -> Result<PolygonRow, StandError> {
        Ok(PolygonRow {
            polygon_id: self.string("polygon_id"),
            bec_zone: self.string("bec_zone"),
            layer: self.string("layer"),
            genus: self.string("genus"),
            percent: self.opt_f32("percent")?.unwrap_or(0.0),
            age_total: self.opt_f32("age_total")?,
            years_to_breast_height: self.opt_f32("years_to_breast_height")?,
            height: self.opt_f32("height")?,
            site_index: self.opt_f32("site_index")?,
            site_curve: self.opt_f32("site_curve")?.map(|v| v as u32),
            crown_closure: self.opt_f32("crown_closure")?,
            base_area: self.opt_f32("base_area")?,
            trees_per_hectare: self.opt_f32("trees_per_hectare")?,
            percent_available: self.opt_f32("percent_available")?,
            mode: self.opt_string("mode"),
            yield_factor: self.opt_f32("yield_factor")?,
            stocking_class: self.opt_string("stocking_class"),
        })
    }
}

/// Read polygons from the first sheet of an Excel (.xlsx) file.
///
/// The header row names the same columns as the CSV polygon format, in any
/// order; blank rows are skipped.
pub fn read_excel(path: impl AsRef<Path>) -> Result<Vec<Polygon>, StandError> {
    let mut workbook: Xlsx<_> = open_workbook(path.as_ref())?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| StandError::Excel("No sheets found in workbook".to_string()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.to_string().trim().to_lowercase(), idx))
        .collect();
    if !columns.contains_key("polygon_id") {
        return Err(StandError::Excel(
            "header row has no polygon_id column".to_string(),
        ));
    }

    let mut polygon_rows = Vec::new();
    for cells in rows {
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let row = SheetRow {
            cells,
            columns: &columns,
        };
        polygon_rows.push(row.to_polygon_row()?);
    }
    rows_to_polygons(polygon_rows)
}

/// Write yield-table rows to an Excel (.xlsx) file.
pub fn write_excel(rows: &[YieldRow], path: impl AsRef<Path>) -> Result<(), StandError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Yields")?;

    for (col, header) in YIELD_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        worksheet.write_string(r, 0, &row.polygon_id)?;
        worksheet.write_string(r, 1, &row.layer)?;
        worksheet.write_string(r, 2, &row.genus)?;
        worksheet.write_string(r, 3, &row.utilization_class)?;
        for (offset, value) in row.values().into_iter().enumerate() {
            worksheet.write_number(r, 4 + offset as u16, f64::from(value))?;
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}
