use serde::{Deserialize, Serialize};

use super::genus::Genus;
use super::utilization::{HasUtilization, UtilizationSet};
use crate::error::StandError;

/// Rank of a species within the primary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeciesRank {
    Primary,
    Secondary,
}

/// Coefficient-table group numbers assigned to a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EquationGroups {
    pub volume: u32,
    pub decay: u32,
    pub breakage: u32,
    pub basal_area: u32,
}

/// One genus within a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub genus: Genus,
    /// Percent of the layer's basal area (0-100)
    pub percent_genus: f32,
    /// Fraction of the layer's basal area; carries more precision than the percent
    #[serde(default)]
    pub fraction_genus: f32,
    #[serde(default)]
    pub groups: EquationGroups,
    #[serde(default)]
    pub rank: Option<SpeciesRank>,
    #[serde(default)]
    pub utilization: UtilizationSet,
}

impl Species {
    pub fn new(genus: Genus, percent_genus: f32) -> Self {
        Self {
            genus,
            percent_genus,
            fraction_genus: percent_genus / 100.0,
            groups: EquationGroups::default(),
            rank: None,
            utilization: UtilizationSet::default(),
        }
    }

    /// A copy of this species carrying a different percent.
    pub fn with_percent(&self, percent_genus: f32) -> Self {
        Self {
            percent_genus,
            fraction_genus: percent_genus / 100.0,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), StandError> {
        if !(0.0..=100.0).contains(&self.percent_genus) || self.percent_genus.is_nan() {
            return Err(StandError::StandValidation(format!(
                "Species {}: percent must be between 0 and 100, got {}",
                self.genus, self.percent_genus
            )));
        }
        Ok(())
    }
}

impl HasUtilization for Species {
    fn utilization(&self) -> &UtilizationSet {
        &self.utilization
    }

    fn utilization_mut(&mut self) -> &mut UtilizationSet {
        &mut self.utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_fraction() {
        let sp = Species::new(Genus::H, 60.0);
        assert!((sp.fraction_genus - 0.6).abs() < 1e-6);
        assert!(sp.rank.is_none());
    }

    #[test]
    fn test_with_percent_keeps_identity() {
        let mut sp = Species::new(Genus::PL, 75.0);
        sp.groups.volume = 12;
        let merged = sp.with_percent(100.0);
        assert_eq!(merged.genus, Genus::PL);
        assert_eq!(merged.groups.volume, 12);
        assert_eq!(merged.percent_genus, 100.0);
        assert!((merged.fraction_genus - 1.0).abs() < 1e-6);
        assert_eq!(sp.percent_genus, 75.0);
    }

    #[test]
    fn test_validate_percent_range() {
        assert!(Species::new(Genus::B, 0.0).validate().is_ok());
        assert!(Species::new(Genus::B, 100.0).validate().is_ok());
        assert!(matches!(
            Species::new(Genus::B, 100.5).validate(),
            Err(StandError::StandValidation(_))
        ));
        assert!(Species::new(Genus::B, -1.0).validate().is_err());
    }

    #[test]
    fn test_deserialize_minimal() {
        let sp: Species = serde_json::from_str(r#"{"genus":"S","percent_genus":18.0}"#).unwrap();
        assert_eq!(sp.genus, Genus::S);
        assert_eq!(sp.fraction_genus, 0.0);
        assert_eq!(sp.groups, EquationGroups::default());
    }
}
