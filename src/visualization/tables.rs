use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::analysis::BatchStatistics;
use crate::estimation::BatchReport;
use crate::models::{Layer, Polygon, UtilizationClass, UtilizationSet};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn yield_cells(name: String, percent: Option<f32>, u: &UtilizationSet, uc: UtilizationClass) -> Vec<Cell> {
    vec![
        Cell::new(name),
        Cell::new(percent.map(|p| format!("{p:.1}%")).unwrap_or_default()),
        Cell::new(format!("{:.1}", u.lorey_height[uc])),
        Cell::new(format!("{:.2}", u.basal_area[uc])),
        Cell::new(format!("{:.0}", u.trees_per_hectare[uc])),
        Cell::new(format!("{:.1}", u.quad_mean_diameter[uc])),
        Cell::new(format!("{:.1}", u.whole_stem_volume[uc])),
        Cell::new(format!("{:.1}", u.close_utilization_volume[uc])),
        Cell::new(format!("{:.1}", u.net_of_decay_waste_and_breakage[uc])),
    ]
}

/// Format the estimated yields of a polygon as a string: one table per
/// layer, with the layer totals under each species.
pub fn format_polygon_summary(polygon: &Polygon) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n{}\n",
        format!("Polygon {}", polygon.id).bold().green()
    ));
    let mode = polygon
        .mode
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string());
    output.push_str(&format!(
        "{}\n",
        format!(
            "BEC: {} | Mode: {} | Percent Available: {:.0}%",
            polygon.bec_zone,
            mode,
            polygon.effective_percent_available()
        )
        .dimmed()
    ));
    output.push_str(&format!("{}\n", "=".repeat(70)));

    for layer in polygon.layers.values() {
        output.push_str(&format!("{} layer\n", layer.layer_type));
        let mut table = new_table(vec![
            "Species", "%", "HL (m)", "BA (m²/ha)", "TPH", "DQ (cm)", "WS Vol", "CU Vol", "Net Vol",
        ]);
        for sp in &layer.species {
            table.add_row(yield_cells(
                sp.genus.to_string(),
                Some(sp.percent_genus),
                &sp.utilization,
                UtilizationClass::All,
            ));
        }
        table.add_row(yield_cells(
            "Total".to_string(),
            None,
            &layer.utilization,
            UtilizationClass::All,
        ));
        output.push_str(&format!("{table}\n"));
    }
    output
}

/// Print the estimated yields of a polygon.
pub fn print_polygon_summary(polygon: &Polygon) {
    print!("{}", format_polygon_summary(polygon));
}

/// Format the layer totals of a layer by utilization class as a string.
pub fn format_utilization_table(layer: &Layer) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n{}\n",
        format!("{} Layer by Utilization Class", layer.layer_type).bold().green()
    ));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    let mut table = new_table(vec![
        "Class", "", "HL (m)", "BA (m²/ha)", "TPH", "DQ (cm)", "WS Vol", "CU Vol", "Net Vol",
    ]);
    for uc in UtilizationClass::ALL_CLASSES {
        table.add_row(yield_cells(uc.to_string(), None, &layer.utilization, uc));
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print the layer totals by utilization class.
pub fn print_utilization_table(layer: &Layer) {
    print!("{}", format_utilization_table(layer));
}

/// Format the outcome of a batch run as a string.
pub fn format_batch_report(report: &BatchReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Batch Summary".bold().green()));
    output.push_str(&format!(
        "{}\n",
        format!(
            "Processed: {} | Skipped: {} | Bypassed: {}",
            report.processed.len(),
            report.skipped.len(),
            report.bypassed.len()
        )
        .dimmed()
    ));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    if report.bypassed.is_empty() {
        return output;
    }
    let mut table = new_table(vec!["Polygon", "Reason"]);
    for b in &report.bypassed {
        table.add_row(vec![Cell::new(&b.id), Cell::new(&b.reason)]);
    }
    output.push_str(&format!("{table}"));
    output
}

/// Print the outcome of a batch run.
pub fn print_batch_report(report: &BatchReport) {
    print!("{}", format_batch_report(report));
}

/// Format stand-level batch statistics as a string.
pub fn format_statistics_table(stats: &BatchStatistics) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Stand Statistics".bold().green()));
    output.push_str(&format!(
        "{}\n",
        format!(
            "Confidence Level: {:.0}% | Sample Size: {} polygons",
            stats.confidence_level * 100.0,
            stats.basal_area.sample_size
        )
        .dimmed()
    ));
    output.push_str(&format!("{}\n", "=".repeat(70)));

    let mut table = new_table(vec!["Metric", "Mean", "Std Dev", "Min", "Max", "Lower CI", "Upper CI"]);
    let metrics = [
        ("Basal Area (m²/ha)", &stats.basal_area),
        ("TPH", &stats.trees_per_hectare),
        ("Whole Stem (m³/ha)", &stats.whole_stem_volume),
        ("Close Util. (m³/ha)", &stats.close_utilization_volume),
        ("Net DWB (m³/ha)", &stats.net_volume),
    ];
    for (name, m) in &metrics {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.1}", m.mean)),
            Cell::new(format!("{:.2}", m.std_dev)),
            Cell::new(format!("{:.1}", m.min)),
            Cell::new(format!("{:.1}", m.max)),
            Cell::new(format!("{:.1}", m.lower)),
            Cell::new(format!("{:.1}", m.upper)),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print stand-level batch statistics with confidence intervals.
pub fn print_statistics_table(stats: &BatchStatistics) {
    print!("{}", format_statistics_table(stats));
}
