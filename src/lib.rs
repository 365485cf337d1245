pub mod analysis;
pub mod coefficients;
pub mod config;
pub mod error;
pub mod estimation;
pub mod io;
pub mod models;
pub mod visualization;

pub use analysis::BatchStatistics;
pub use coefficients::ControlMap;
pub use config::EstimatorConfig;
pub use error::StandError;
pub use estimation::{BatchReport, Estimator};
pub use io::{PolygonReader, YieldRow, YieldWriter};
pub use models::{Layer, LayerType, Polygon, PolygonMode, Species, UtilizationClass};
