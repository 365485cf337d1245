use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::adjustments::adjust_layer;
use super::primary::{estimate_primary_layer, predicted_basal_area};
use super::validation::{check_mode_minima, complete_site, find_default_polygon_mode, validate_layers};
use super::veteran::estimate_veteran_layer;
use crate::coefficients::{BecDefinition, BecZoneLookup, ControlMap};
use crate::config::EstimatorConfig;
use crate::error::StandError;
use crate::models::{LayerType, Polygon, PolygonMode, DEFAULT_PERCENT_AVAILABLE};

/// A polygon left out of a batch, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct BypassedPolygon {
    pub id: String,
    pub reason: String,
}

/// Outcome of a batch run, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub processed: Vec<Polygon>,
    /// Polygons whose mode asked for them not to be processed
    pub skipped: Vec<String>,
    pub bypassed: Vec<BypassedPolygon>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.bypassed.len()
    }
}

/// Estimation API over a loaded control map and run configuration.
pub struct Estimator<'a> {
    control: &'a ControlMap,
    config: &'a EstimatorConfig,
}

impl<'a> Estimator<'a> {
    pub fn new(control: &'a ControlMap, config: &'a EstimatorConfig) -> Self {
        Self { control, config }
    }

    fn bec(&self, polygon: &Polygon) -> Result<&'a BecDefinition, StandError> {
        self.control.bec(&polygon.bec_zone).map_err(|_| {
            StandError::StandValidation(format!(
                "Polygon {}: unknown BEC zone '{}'",
                polygon.id, polygon.bec_zone
            ))
        })
    }

    /// Complete the site values of every layer and check the polygon against
    /// the domain minima. Returns the completed polygon and its mode.
    pub fn validate_polygon(&self, polygon: &Polygon) -> Result<(Polygon, PolygonMode), StandError> {
        let bec = self.bec(polygon)?;
        let mut polygon = polygon.clone();
        for layer in polygon.layers.values_mut() {
            complete_site(layer, bec.region, self.control)?;
        }
        validate_layers(&polygon, &self.config.minima)?;

        let mode = match polygon.mode {
            Some(mode) => mode,
            None => find_default_polygon_mode(&polygon, &self.config.minima, || {
                predicted_basal_area(self.control, bec, &polygon)
            })?,
        };
        if mode != PolygonMode::DontProcess {
            check_mode_minima(&polygon, mode)?;
        }
        Ok((polygon, mode))
    }

    /// Percent of the polygon that is forested: the input value, else the
    /// stocking class share of the primary layer, else the default.
    fn percent_available(&self, polygon: &Polygon, bec: &BecDefinition) -> Result<f32, StandError> {
        if let Some(pa) = polygon.percent_available.filter(|p| *p > 0.0) {
            return Ok(pa);
        }
        match polygon.primary_layer().and_then(|l| l.stocking_class) {
            Some(class) => Ok(self.control.stocking_factor(class, bec.region)?.percent),
            None => Ok(DEFAULT_PERCENT_AVAILABLE),
        }
    }

    /// Estimate the yields of one polygon.
    ///
    /// Returns `None` for polygons whose mode says not to process them.
    pub fn process_polygon(&self, polygon: &Polygon) -> Result<Option<Polygon>, StandError> {
        let (mut polygon, mode) = self.validate_polygon(polygon)?;
        match mode {
            PolygonMode::Start => {}
            PolygonMode::DontProcess => {
                debug!(polygon = %polygon.id, "Polygon not processed");
                return Ok(None);
            }
            other => {
                return Err(StandError::StandValidation(format!(
                    "Polygon {}: unsupported polygon mode {other}",
                    polygon.id
                )));
            }
        }
        polygon.mode = Some(mode);

        let bec = self.bec(&polygon)?;
        let mut primary = estimate_primary_layer(self.control, &self.config.solver, bec, &polygon)?;
        let veteran = estimate_veteran_layer(self.control, &self.config.minima, bec, &polygon)?;

        let percent_available = self.percent_available(&polygon, bec)?;
        adjust_layer(&mut primary, percent_available)?;
        polygon.layers.insert(LayerType::Primary, primary);
        if let Some(mut veteran) = veteran {
            adjust_layer(&mut veteran, percent_available)?;
            polygon.layers.insert(LayerType::Veteran, veteran);
        }
        polygon.percent_available = Some(percent_available);
        debug!(polygon = %polygon.id, species = polygon.num_species(), "Processed polygon");
        Ok(Some(polygon))
    }

    fn run_batch(&self, polygons: &[Polygon]) -> Result<BatchReport, StandError> {
        // A fatal error stops the remaining workers instead of waiting on them.
        let results = polygons
            .par_iter()
            .map(|polygon| match self.process_polygon(polygon) {
                Err(e) if e.is_fatal() => Err(e),
                result => Ok((polygon.id.as_str(), result)),
            })
            .collect::<Result<Vec<_>, StandError>>()?;

        let mut report = BatchReport::default();
        for (id, result) in results {
            match result {
                Ok(Some(polygon)) => report.processed.push(polygon),
                Ok(None) => report.skipped.push(id.to_string()),
                Err(e) if e.is_bypassable() => {
                    warn!(polygon = %id, error = %e, "Bypassing polygon");
                    report.bypassed.push(BypassedPolygon {
                        id: id.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Process every polygon in parallel.
    ///
    /// Per-polygon data problems are bypassed and reported; missing
    /// coefficients abort the run.
    pub fn process_batch(&self, polygons: &[Polygon]) -> Result<BatchReport, StandError> {
        let report = match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| StandError::IllegalArgument(format!("thread pool: {e}")))?
                .install(|| self.run_batch(polygons))?,
            None => self.run_batch(polygons)?,
        };
        info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            bypassed = report.bypassed.len(),
            "Batch complete"
        );
        Ok(report)
    }
}
