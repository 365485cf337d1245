//! Yield estimation for forest polygons.

pub mod adjustments;
pub mod basal_area;
mod cascade;
pub mod classification;
pub mod diameter;
mod estimator;
pub mod height;
pub mod math;
mod primary;
pub mod reconcile;
pub mod root_finder;
pub mod validation;
mod veteran;
pub mod volume;

#[cfg(test)]
pub(crate) mod fixtures;

pub use estimator::{BatchReport, BypassedPolygon, Estimator};
pub use primary::{estimate_primary_layer, predicted_basal_area};
pub use veteran::estimate_veteran_layer;
