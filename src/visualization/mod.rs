mod tables;

pub use tables::{
    format_polygon_summary, print_polygon_summary,
    format_utilization_table, print_utilization_table,
    format_batch_report, print_batch_report,
    format_statistics_table, print_statistics_table,
};
