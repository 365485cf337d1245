use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

use crate::error::StandError;
use crate::models::{Polygon, UtilizationClass, UtilizationSet};

/// Spread of one per-polygon metric across a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Bounds of the confidence interval on the mean
    pub lower: f64,
    pub upper: f64,
    pub sample_size: usize,
}

/// Stand-level statistics over every processed polygon of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub confidence_level: f64,
    pub basal_area: MetricSummary,
    pub trees_per_hectare: MetricSummary,
    pub whole_stem_volume: MetricSummary,
    pub close_utilization_volume: MetricSummary,
    pub net_volume: MetricSummary,
}

/// Per-hectare totals of each polygon over all of its layers.
fn stand_totals(polygons: &[Polygon], metric: fn(&UtilizationSet) -> f32) -> Vec<f64> {
    polygons
        .iter()
        .map(|p| {
            p.layers
                .values()
                .map(|l| f64::from(metric(&l.utilization)))
                .sum::<f64>()
        })
        .collect()
}

impl BatchStatistics {
    /// Summarize estimated polygons at a given confidence level (e.g. 0.95).
    pub fn compute(polygons: &[Polygon], confidence: f64) -> Result<Self, StandError> {
        if polygons.is_empty() {
            return Err(StandError::IllegalArgument(
                "no processed polygons to summarize".to_string(),
            ));
        }
        if confidence <= 0.0 || confidence >= 1.0 {
            return Err(StandError::IllegalArgument(format!(
                "confidence must be in (0, 1), got {confidence}"
            )));
        }
        let summary = |metric: fn(&UtilizationSet) -> f32| {
            summarize(&stand_totals(polygons, metric), confidence)
        };

        Ok(BatchStatistics {
            confidence_level: confidence,
            basal_area: summary(|u| u.basal_area[UtilizationClass::All])?,
            trees_per_hectare: summary(|u| u.trees_per_hectare[UtilizationClass::All])?,
            whole_stem_volume: summary(|u| u.whole_stem_volume[UtilizationClass::All])?,
            close_utilization_volume: summary(|u| {
                u.close_utilization_volume[UtilizationClass::All]
            })?,
            net_volume: summary(|u| u.net_of_decay_waste_and_breakage[UtilizationClass::All])?,
        })
    }
}

/// Mean, spread and confidence interval of a set of values.
///
/// A single value has zero spread and a degenerate interval.
fn summarize(values: &[f64], confidence: f64) -> Result<MetricSummary, StandError> {
    let n = values.len();
    let mean = values.mean();
    let min = values.min();
    let max = values.max();
    if n < 2 {
        return Ok(MetricSummary {
            mean,
            std_dev: 0.0,
            min,
            max,
            lower: mean,
            upper: mean,
            sample_size: n,
        });
    }

    let std_dev = values.std_dev();
    let std_error = std_dev / (n as f64).sqrt();
    let t_dist = StudentsT::new(0.0, 1.0, (n - 1) as f64)
        .map_err(|e| StandError::IllegalArgument(e.to_string()))?;
    let margin = t_dist.inverse_cdf(1.0 - (1.0 - confidence) / 2.0) * std_error;

    Ok(MetricSummary {
        mean,
        std_dev,
        min,
        max,
        lower: mean - margin,
        upper: mean + margin,
        sample_size: n,
    })
}
