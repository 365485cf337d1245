use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::TableId;
use crate::error::StandError;
use crate::models::Region;

/// A biogeoclimatic zone and the aliases used as secondary coefficient keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BecDefinition {
    pub alias: String,
    pub region: Region,
    pub name: String,
    /// Zone whose growth coefficients apply; the zone itself when absent
    #[serde(default)]
    pub growth_alias: Option<String>,
    /// Zone whose decay coefficients apply; the zone itself when absent
    #[serde(default)]
    pub decay_alias: Option<String>,
}

impl BecDefinition {
    pub fn new(alias: &str, region: Region, name: &str) -> Self {
        Self {
            alias: alias.to_string(),
            region,
            name: name.to_string(),
            growth_alias: None,
            decay_alias: None,
        }
    }

    pub fn growth_bec(&self) -> &str {
        self.growth_alias.as_deref().unwrap_or(&self.alias)
    }

    pub fn decay_bec(&self) -> &str {
        self.decay_alias.as_deref().unwrap_or(&self.alias)
    }
}

/// Resolves a zone code to its definition.
pub trait BecZoneLookup {
    fn bec(&self, alias: &str) -> Result<&BecDefinition, StandError>;

    fn region(&self, alias: &str) -> Result<Region, StandError> {
        self.bec(alias).map(|b| b.region)
    }
}

/// Zone definitions keyed by upper-case alias.
#[derive(Debug, Clone, PartialEq)]
pub struct BecTable {
    zones: HashMap<String, BecDefinition>,
}

impl BecTable {
    pub fn new(definitions: Vec<BecDefinition>) -> Self {
        Self {
            zones: definitions
                .into_iter()
                .map(|d| (d.alias.to_uppercase(), d))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl Default for BecTable {
    fn default() -> Self {
        Self::new(default_bec_definitions())
    }
}

impl BecZoneLookup for BecTable {
    fn bec(&self, alias: &str) -> Result<&BecDefinition, StandError> {
        self.zones
            .get(&alias.trim().to_uppercase())
            .ok_or_else(|| StandError::MissingCoefficients {
                table: TableId::BecZones.name(),
                key: alias.to_string(),
            })
    }
}

/// The standard provincial zones.
pub fn default_bec_definitions() -> Vec<BecDefinition> {
    use Region::{Coastal, Interior};
    [
        ("AT", Interior, "Alpine Tundra"),
        ("BG", Interior, "Bunchgrass"),
        ("BWBS", Interior, "Boreal White and Black Spruce"),
        ("CDF", Coastal, "Coastal Douglas Fir"),
        ("CWH", Coastal, "Coastal Western Hemlock"),
        ("ESSF", Interior, "Engelmann Spruce-Subalpine Fir"),
        ("ICH", Interior, "Interior Cedar-Hemlock"),
        ("IDF", Interior, "Interior Douglas Fir"),
        ("MH", Coastal, "Mountain Hemlock"),
        ("MS", Interior, "Montane Spruce"),
        ("PP", Interior, "Ponderosa Pine"),
        ("SBPS", Interior, "Sub-Boreal Pine-Spruce"),
        ("SBS", Interior, "Sub-Boreal Spruce"),
        ("SWB", Interior, "Spruce-Willow-Birch"),
        ("CMA", Coastal, "Coastal Mountain-heather Alpine"),
        ("IMA", Interior, "Interior Mountain-heather Alpine"),
    ]
    .into_iter()
    .map(|(alias, region, name)| BecDefinition::new(alias, region, name))
    .collect()
}
