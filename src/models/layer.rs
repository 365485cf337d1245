use serde::{Deserialize, Serialize};

use super::genus::Genus;
use super::species::{Species, SpeciesRank};
use super::utilization::{HasUtilization, UtilizationSet};
use crate::error::StandError;

/// Vertical stratum of a stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerType {
    Primary,
    Veteran,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Primary => write!(f, "Primary"),
            LayerType::Veteran => write!(f, "Veteran"),
        }
    }
}

impl std::str::FromStr for LayerType {
    type Err = StandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "p" => Ok(LayerType::Primary),
            "veteran" | "v" => Ok(LayerType::Veteran),
            _ => Err(StandError::Parse(format!("Unknown layer type: '{s}'"))),
        }
    }
}

/// Age and height observations for the leading site species.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    pub age_total: Option<f32>,
    pub years_to_breast_height: Option<f32>,
    /// Dominant (lead) height in metres
    pub height: Option<f32>,
    pub site_index: Option<f32>,
    pub site_curve: Option<u32>,
}

impl Site {
    pub fn breast_height_age(&self) -> Option<f32> {
        match (self.age_total, self.years_to_breast_height) {
            (Some(age), Some(ytbh)) => Some(age - ytbh),
            _ => None,
        }
    }
}

/// Anything carrying site observations.
pub trait HasSite {
    fn site(&self) -> &Site;

    fn breast_height_age(&self) -> Option<f32> {
        self.site().breast_height_age()
    }
}

/// A layer of a polygon: its species plus aggregate per-class metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub layer_type: LayerType,
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub crown_closure: Option<f32>,
    /// Observed basal area (m²/ha), if measured
    #[serde(default)]
    pub base_area: Option<f32>,
    /// Observed trees per hectare, if measured
    #[serde(default)]
    pub trees_per_hectare: Option<f32>,
    #[serde(default)]
    pub stocking_class: Option<char>,
    pub species: Vec<Species>,
    #[serde(default)]
    pub inventory_type_group: Option<u32>,
    #[serde(default)]
    pub utilization: UtilizationSet,
}

impl Layer {
    pub fn new(layer_type: LayerType) -> Self {
        Self {
            layer_type,
            site: Site::default(),
            crown_closure: None,
            base_area: None,
            trees_per_hectare: None,
            stocking_class: None,
            species: Vec::new(),
            inventory_type_group: None,
            utilization: UtilizationSet::default(),
        }
    }

    pub fn species_by_genus(&self, genus: Genus) -> Option<&Species> {
        self.species.iter().find(|s| s.genus == genus)
    }

    pub fn primary_species(&self) -> Option<&Species> {
        self.species
            .iter()
            .find(|s| s.rank == Some(SpeciesRank::Primary))
    }

    pub fn percent_total(&self) -> f32 {
        self.species.iter().map(|s| s.percent_genus).sum()
    }

    /// Lorey height of the layer: basal-area weighted species heights.
    /// Rebuild the layer's utilization from its species: per-hectare values
    /// are summed, diameters derived and lorey height weighted by basal area.
    pub fn sum_species_utilization(&mut self) {
        let mut total = UtilizationSet::default();
        for species in &self.species {
            let u = &species.utilization;
            total.basal_area.accumulate(&u.basal_area);
            total.trees_per_hectare.accumulate(&u.trees_per_hectare);
            total.whole_stem_volume.accumulate(&u.whole_stem_volume);
            total
                .close_utilization_volume
                .accumulate(&u.close_utilization_volume);
            total.net_of_decay.accumulate(&u.net_of_decay);
            total.net_of_decay_and_waste.accumulate(&u.net_of_decay_and_waste);
            total
                .net_of_decay_waste_and_breakage
                .accumulate(&u.net_of_decay_waste_and_breakage);
        }
        for uc in super::UtilizationClass::ALL_CLASSES {
            total.quad_mean_diameter[uc] =
                super::quad_mean_diameter(total.basal_area[uc], total.trees_per_hectare[uc]);
        }
        self.utilization = total;
        self.utilization.lorey_height[super::UtilizationClass::All] = self.weighted_lorey_height();
    }

    pub fn weighted_lorey_height(&self) -> f32 {
        let (weighted, total) = self.species.iter().fold((0.0f32, 0.0f32), |(w, t), s| {
            let ba = s.utilization.basal_area[super::UtilizationClass::All];
            let hl = s.utilization.lorey_height[super::UtilizationClass::All];
            (w + ba * hl, t + ba)
        });
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }
}

impl HasSite for Layer {
    fn site(&self) -> &Site {
        &self.site
    }
}

impl HasUtilization for Layer {
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
    use crate::models::UtilizationClass;

    #[test]
    fn test_breast_height_age() {
        let site = Site {
            age_total: Some(105.0),
            years_to_breast_height: Some(7.1),
            ..Site::default()
        };
        assert!((site.breast_height_age().unwrap() - 97.9).abs() < 1e-4);
        assert_eq!(Site::default().breast_height_age(), None);
    }

    #[test]
    fn test_layer_type_parse() {
        assert_eq!("P".parse::<LayerType>().unwrap(), LayerType::Primary);
        assert_eq!("veteran".parse::<LayerType>().unwrap(), LayerType::Veteran);
        assert!("middle".parse::<LayerType>().is_err());
    }

    #[test]
    fn test_weighted_lorey_height() {
        let mut layer = Layer::new(LayerType::Primary);
        let mut a = Species::new(Genus::B, 25.0);
        a.utilization.basal_area[UtilizationClass::All] = 1.0;
        a.utilization.lorey_height[UtilizationClass::All] = 20.0;
        let mut b = Species::new(Genus::H, 75.0);
        b.utilization.basal_area[UtilizationClass::All] = 3.0;
        b.utilization.lorey_height[UtilizationClass::All] = 30.0;
        layer.species = vec![a, b];
        assert!((layer.weighted_lorey_height() - 27.5).abs() < 1e-5);
        assert_eq!(Layer::new(LayerType::Veteran).weighted_lorey_height(), 0.0);
    }

    #[test]
    fn test_sum_species_utilization() {
        let mut layer = Layer::new(LayerType::Primary);
        let mut a = Species::new(Genus::B, 50.0);
        a.utilization.basal_area = crate::models::UtilizationVector::new(0.0, 2.0, 0.0, 2.0, 0.0, 0.0);
        a.utilization.trees_per_hectare =
            crate::models::UtilizationVector::new(0.0, 100.0, 0.0, 100.0, 0.0, 0.0);
        a.utilization.lorey_height[UtilizationClass::All] = 18.0;
        a.utilization.whole_stem_volume[UtilizationClass::All] = 12.0;
        let mut b = a.clone();
        b.genus = Genus::S;
        b.utilization.lorey_height[UtilizationClass::All] = 22.0;
        layer.species = vec![a, b];

        layer.sum_species_utilization();
        let u = &layer.utilization;
        assert_eq!(u.basal_area[UtilizationClass::All], 4.0);
        assert_eq!(u.trees_per_hectare[UtilizationClass::U125To175], 200.0);
        assert_eq!(u.whole_stem_volume[UtilizationClass::All], 24.0);
        assert!((u.lorey_height[UtilizationClass::All] - 20.0).abs() < 1e-5);
        let expected_dq = crate::models::quad_mean_diameter(4.0, 200.0);
        assert!((u.quad_mean_diameter[UtilizationClass::All] - expected_dq).abs() < 1e-5);
    }

    #[test]
    fn test_percent_total() {
        let mut layer = Layer::new(LayerType::Primary);
        layer.species = vec![Species::new(Genus::B, 40.0), Species::new(Genus::S, 60.0)];
        assert_eq!(layer.percent_total(), 100.0);
        assert!(layer.species_by_genus(Genus::S).is_some());
        assert!(layer.species_by_genus(Genus::F).is_none());
    }
}
