use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bec::{BecDefinition, BecTable, BecZoneLookup};
use super::site_curve::{ChapmanRichardsCurves, SiteCurve};
use super::{CoefficientTable, Coefficients, TableId};
use crate::error::StandError;
use crate::models::{EquationGroups, Genus, Region, UtilizationClass};

/// Non-primary lorey height coefficients; equation 1 regresses on the layer
/// lead height, any other equation on the primary species height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NonprimaryHeightCoefficients {
    pub equation_index: u32,
    pub c1: f32,
    pub c2: f32,
}

/// Physical size limits for a species' components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentSizeLimits {
    pub lorey_height_maximum: f32,
    pub quad_mean_diameter_maximum: f32,
    pub min_dq_to_lorey_height_ratio: f32,
    pub max_dq_to_lorey_height_ratio: f32,
}

/// Upper bounds on stand basal area and diameter for a basal-area group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpperBounds {
    pub basal_area: f32,
    pub quad_mean_diameter: f32,
}

/// Adjustment applied to layers with a stocking class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockingFactor {
    pub factor: f32,
    /// Percent of the polygon the stocking class occupies
    pub percent: f32,
}

/// All coefficient tables needed by the estimators.
///
/// Loaded once before any estimation and shared by reference across workers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlMap {
    pub primary_height: CoefficientTable<(Genus, Region), Coefficients<3>>,
    pub nonprimary_height: CoefficientTable<(Genus, Genus, Region), NonprimaryHeightCoefficients>,
    pub species_dq: CoefficientTable<Genus, Coefficients<3>>,
    pub component_size_limits: CoefficientTable<(Genus, Region), ComponentSizeLimits>,
    pub basal_area_by_utilization:
        CoefficientTable<(UtilizationClass, Genus, String), Coefficients<2>>,
    pub dq_by_utilization: CoefficientTable<(UtilizationClass, Genus, String), Coefficients<4>>,
    pub total_stand_whole_stem_volume: CoefficientTable<u32, Coefficients<9>>,
    pub whole_stem_volume_by_utilization: CoefficientTable<(UtilizationClass, u32), Coefficients<4>>,
    pub close_utilization_volume: CoefficientTable<(UtilizationClass, u32), Coefficients<3>>,
    pub net_decay_volume: CoefficientTable<(UtilizationClass, u32), Coefficients<3>>,
    pub net_decay_waste: CoefficientTable<Genus, Coefficients<6>>,
    pub net_breakage: CoefficientTable<u32, Coefficients<4>>,
    pub decay_modifiers: CoefficientTable<(Genus, Region), f32>,
    pub waste_modifiers: CoefficientTable<(Genus, Region), f32>,
    pub basal_area_yield: CoefficientTable<(String, Genus), Coefficients<7>>,
    pub dq_yield: CoefficientTable<(String, Genus), Coefficients<5>>,
    pub upper_bounds: CoefficientTable<u32, UpperBounds>,
    pub veteran_basal_area: CoefficientTable<(Genus, Region), Coefficients<3>>,
    pub veteran_dq: CoefficientTable<(Genus, Region), Coefficients<3>>,
    /// Whole-stem, close-utilization, decay and waste adjustments for veteran volumes
    pub veteran_volume_adjust: CoefficientTable<Genus, Coefficients<4>>,
    pub equation_groups: CoefficientTable<(Genus, String), EquationGroups>,
    /// Replacement basal-area group keyed by (default group, inventory type group)
    pub equation_group_modifiers: CoefficientTable<(u32, u32), u32>,
    pub stocking_class_factors: CoefficientTable<(char, Region), StockingFactor>,
    pub site_curves: CoefficientTable<u32, SiteCurve>,
    pub default_site_curves: CoefficientTable<(Genus, Region), u32>,
    /// Zone definitions replacing the standard ones with the same alias
    pub bec_zones: Vec<BecDefinition>,
    /// Caps the age used by the yield estimators at this many centuries when positive
    pub yield_age_control: u32,
}

fn standard_becs() -> &'static BecTable {
    static TABLE: OnceLock<BecTable> = OnceLock::new();
    TABLE.get_or_init(BecTable::default)
}

impl ControlMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, StandError> {
        let map: ControlMap = serde_json::from_str(json)?;
        debug!(
            volume_groups = map.total_stand_whole_stem_volume.len(),
            bec_overrides = map.bec_zones.len(),
            "Parsed control map"
        );
        Ok(map)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StandError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let map = Self::from_json_str(&content)?;
        info!(path = %path.display(), "Loaded control map");
        Ok(map)
    }

    pub fn site_curves(&self) -> ChapmanRichardsCurves<'_> {
        ChapmanRichardsCurves::new(&self.site_curves)
    }

    pub fn primary_height(&self, genus: Genus, region: Region) -> Result<Coefficients<3>, StandError> {
        self.primary_height
            .lookup(TableId::PrimaryHeight, &(genus, region))
            .copied()
    }

    pub fn nonprimary_height(
        &self,
        genus: Genus,
        primary: Genus,
        region: Region,
    ) -> Result<NonprimaryHeightCoefficients, StandError> {
        self.nonprimary_height
            .lookup(TableId::NonprimaryHeight, &(genus, primary, region))
            .copied()
    }

    pub fn species_dq(&self, genus: Genus) -> Result<Coefficients<3>, StandError> {
        self.species_dq.lookup(TableId::SpeciesDq, &genus).copied()
    }

    pub fn component_size_limits(
        &self,
        genus: Genus,
        region: Region,
    ) -> Result<ComponentSizeLimits, StandError> {
        self.component_size_limits
            .lookup(TableId::ComponentSizeLimits, &(genus, region))
            .copied()
    }

    pub fn basal_area_by_utilization(
        &self,
        uc: UtilizationClass,
        genus: Genus,
        growth_bec: &str,
    ) -> Result<Coefficients<2>, StandError> {
        self.basal_area_by_utilization
            .lookup(
                TableId::BasalAreaByUtilization,
                &(uc, genus, growth_bec.to_string()),
            )
            .copied()
    }

    pub fn dq_by_utilization(
        &self,
        uc: UtilizationClass,
        genus: Genus,
        growth_bec: &str,
    ) -> Result<Coefficients<4>, StandError> {
        self.dq_by_utilization
            .lookup(TableId::DqByUtilization, &(uc, genus, growth_bec.to_string()))
            .copied()
    }

    pub fn total_stand_whole_stem_volume(
        &self,
        volume_group: u32,
    ) -> Result<Coefficients<9>, StandError> {
        self.total_stand_whole_stem_volume
            .lookup(TableId::TotalStandWholeStemVolume, &volume_group)
            .copied()
    }

    pub fn whole_stem_volume_by_utilization(
        &self,
        uc: UtilizationClass,
        volume_group: u32,
    ) -> Result<Coefficients<4>, StandError> {
        self.whole_stem_volume_by_utilization
            .lookup(TableId::WholeStemVolumeByUtilization, &(uc, volume_group))
            .copied()
    }

    pub fn close_utilization_volume(
        &self,
        uc: UtilizationClass,
        volume_group: u32,
    ) -> Result<Coefficients<3>, StandError> {
        self.close_utilization_volume
            .lookup(TableId::CloseUtilizationVolume, &(uc, volume_group))
            .copied()
    }

    pub fn net_decay_volume(
        &self,
        uc: UtilizationClass,
        decay_group: u32,
    ) -> Result<Coefficients<3>, StandError> {
        self.net_decay_volume
            .lookup(TableId::NetDecayVolume, &(uc, decay_group))
            .copied()
    }

    pub fn net_decay_waste(&self, genus: Genus) -> Result<Coefficients<6>, StandError> {
        self.net_decay_waste
            .lookup(TableId::NetDecayWaste, &genus)
            .copied()
    }

    pub fn net_breakage(&self, breakage_group: u32) -> Result<Coefficients<4>, StandError> {
        self.net_breakage
            .lookup(TableId::NetBreakage, &breakage_group)
            .copied()
    }

    /// Decay modifier; species without one are unmodified.
    pub fn decay_modifier(&self, genus: Genus, region: Region) -> f32 {
        self.decay_modifiers
            .get(&(genus, region))
            .copied()
            .unwrap_or(0.0)
    }

    /// Waste modifier; species without one are unmodified.
    pub fn waste_modifier(&self, genus: Genus, region: Region) -> f32 {
        self.waste_modifiers
            .get(&(genus, region))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn basal_area_yield(
        &self,
        decay_bec: &str,
        genus: Genus,
    ) -> Result<Coefficients<7>, StandError> {
        self.basal_area_yield
            .lookup(TableId::BasalAreaYield, &(decay_bec.to_string(), genus))
            .copied()
    }

    pub fn dq_yield(&self, decay_bec: &str, genus: Genus) -> Result<Coefficients<5>, StandError> {
        self.dq_yield
            .lookup(TableId::DqYield, &(decay_bec.to_string(), genus))
            .copied()
    }

    pub fn upper_bounds(&self, basal_area_group: u32) -> Result<UpperBounds, StandError> {
        self.upper_bounds
            .lookup(TableId::UpperBounds, &basal_area_group)
            .copied()
    }

    pub fn veteran_basal_area(
        &self,
        genus: Genus,
        region: Region,
    ) -> Result<Coefficients<3>, StandError> {
        self.veteran_basal_area
            .lookup(TableId::VeteranBasalArea, &(genus, region))
            .copied()
    }

    pub fn veteran_dq(&self, genus: Genus, region: Region) -> Result<Coefficients<3>, StandError> {
        self.veteran_dq
            .lookup(TableId::VeteranDq, &(genus, region))
            .copied()
    }

    pub fn veteran_volume_adjust(&self, genus: Genus) -> Result<Coefficients<4>, StandError> {
        self.veteran_volume_adjust
            .lookup(TableId::VeteranVolumeAdjust, &genus)
            .copied()
    }

    pub fn equation_groups(&self, genus: Genus, bec: &str) -> Result<EquationGroups, StandError> {
        self.equation_groups
            .lookup(TableId::EquationGroups, &(genus, bec.to_string()))
            .copied()
    }

    /// The basal-area group after inventory-type-group replacement.
    pub fn modified_basal_area_group(&self, default_group: u32, itg: u32) -> u32 {
        self.equation_group_modifiers
            .get(&(default_group, itg))
            .copied()
            .unwrap_or(default_group)
    }

    pub fn stocking_factor(
        &self,
        stocking_class: char,
        region: Region,
    ) -> Result<StockingFactor, StandError> {
        self.stocking_class_factors
            .lookup(
                TableId::StockingClassFactors,
                &(stocking_class.to_ascii_uppercase(), region),
            )
            .copied()
    }

    pub fn default_site_curve(&self, genus: Genus, region: Region) -> Result<u32, StandError> {
        self.default_site_curves
            .lookup(TableId::DefaultSiteCurves, &(genus, region))
            .copied()
    }
}

impl BecZoneLookup for ControlMap {
    fn bec(&self, alias: &str) -> Result<&BecDefinition, StandError> {
        let wanted = alias.trim();
        self.bec_zones
            .iter()
            .find(|b| b.alias.eq_ignore_ascii_case(wanted))
            .map(Ok)
            .unwrap_or_else(|| standard_becs().bec(wanted))
    }
}

/// Weighted sum of per-entity coefficients, accumulated in double precision.
pub fn weighted_coefficient_sum<T, const N: usize>(
    entities: &[T],
    weight: impl Fn(&T) -> f64,
    coefficients: impl Fn(&T) -> Result<Coefficients<N>, StandError>,
) -> Result<Coefficients<N>, StandError> {
    if entities.is_empty() {
        return Err(StandError::IllegalArgument(
            "cannot weight coefficients over an empty set".to_string(),
        ));
    }
    let mut working = [0.0f64; N];
    for entity in entities {
        let coe = coefficients(entity)?;
        let w = weight(entity);
        for (acc, c) in working.iter_mut().zip(coe.as_array()) {
            *acc += f64::from(*c) * w;
        }
    }
    Ok(Coefficients::new(working.map(|v| v as f32)))
}
