mod statistics;

pub use statistics::{BatchStatistics, MetricSummary};
