use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StandError;

/// Run configuration, read from TOML.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Control (coefficient) file; the CLI flag takes precedence
    pub control_file: Option<PathBuf>,
    /// Worker threads for batch runs; rayon's default when absent
    pub threads: Option<usize>,
    pub minima: Minima,
    pub solver: SolverOptions,
}

/// Domain minima applied during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Minima {
    pub height: f32,
    pub veteran_height: f32,
    pub base_area: f32,
    pub predicted_base_area: f32,
    pub veteran_years_to_breast_height: f32,
    pub percent_total_tolerance: f32,
}

impl Default for Minima {
    fn default() -> Self {
        Self {
            height: 6.0,
            veteran_height: 10.0,
            base_area: 0.0,
            predicted_base_area: 2.0,
            veteran_years_to_breast_height: 6.0,
            percent_total_tolerance: 0.01,
        }
    }
}

/// Newton solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Finite-difference step for the Jacobian
    pub step: f64,
    /// Central rather than forward differences
    pub symmetric: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 2.0e-3,
            max_iterations: 100,
            step: 1.0e-4,
            symmetric: true,
        }
    }
}

impl EstimatorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, StandError> {
        let config: EstimatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StandError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), StandError> {
        if self.solver.tolerance <= 0.0 || self.solver.step <= 0.0 {
            return Err(StandError::IllegalArgument(
                "solver tolerance and step must be positive".to_string(),
            ));
        }
        if self.solver.max_iterations == 0 {
            return Err(StandError::IllegalArgument(
                "solver max_iterations must be at least 1".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(StandError::IllegalArgument(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
