use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::layer::{Layer, LayerType};
use crate::error::StandError;

/// Percent of the polygon assumed forested when none is recorded.
pub const DEFAULT_PERCENT_AVAILABLE: f32 = 90.0;

/// Coastal / interior split of the biogeoclimatic zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(alias = "C")]
    Coastal,
    #[serde(alias = "I")]
    Interior,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Coastal => write!(f, "Coastal"),
            Region::Interior => write!(f, "Interior"),
        }
    }
}

/// How a polygon is to be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolygonMode {
    Start,
    Young,
    Batn,
    Batc,
    DontProcess,
}

impl std::fmt::Display for PolygonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolygonMode::Start => write!(f, "Start"),
            PolygonMode::Young => write!(f, "Young"),
            PolygonMode::Batn => write!(f, "Batn"),
            PolygonMode::Batc => write!(f, "Batc"),
            PolygonMode::DontProcess => write!(f, "DontProcess"),
        }
    }
}

impl std::str::FromStr for PolygonMode {
    type Err = StandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "1" => Ok(PolygonMode::Start),
            "young" | "2" => Ok(PolygonMode::Young),
            "batn" | "3" => Ok(PolygonMode::Batn),
            "batc" | "4" => Ok(PolygonMode::Batc),
            "dontprocess" | "dont_process" | "-1" => Ok(PolygonMode::DontProcess),
            _ => Err(StandError::Parse(format!("Unknown polygon mode: '{s}'"))),
        }
    }
}

/// The top-level inventory unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: String,
    /// Biogeoclimatic zone alias, e.g. "CWH"
    pub bec_zone: String,
    #[serde(default)]
    pub percent_available: Option<f32>,
    #[serde(default)]
    pub mode: Option<PolygonMode>,
    #[serde(default = "default_yield_factor")]
    pub yield_factor: f32,
    pub layers: BTreeMap<LayerType, Layer>,
}

fn default_yield_factor() -> f32 {
    1.0
}

impl Polygon {
    pub fn new(id: impl Into<String>, bec_zone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bec_zone: bec_zone.into(),
            percent_available: None,
            mode: None,
            yield_factor: 1.0,
            layers: BTreeMap::new(),
        }
    }

    pub fn primary_layer(&self) -> Option<&Layer> {
        self.layers.get(&LayerType::Primary)
    }

    pub fn veteran_layer(&self) -> Option<&Layer> {
        self.layers.get(&LayerType::Veteran)
    }

    /// The forested percent, defaulted when not recorded.
    pub fn effective_percent_available(&self) -> f32 {
        self.percent_available
            .filter(|p| *p > 0.0)
            .unwrap_or(DEFAULT_PERCENT_AVAILABLE)
    }

    pub fn num_species(&self) -> usize {
        self.layers.values().map(|l| l.species.len()).sum()
    }
}
