mod bec;
mod control_map;
mod site_curve;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Index;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StandError;

pub use bec::{default_bec_definitions, BecDefinition, BecTable, BecZoneLookup};
pub use control_map::{
    weighted_coefficient_sum, ComponentSizeLimits, ControlMap, NonprimaryHeightCoefficients,
    StockingFactor, UpperBounds,
};
pub use site_curve::{ChapmanRichardsCurves, SiteCurve, SiteCurveOracle};

/// A fixed-length, immutable coefficient tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Coefficients<const N: usize>([f32; N]);

impl<const N: usize> Coefficients<N> {
    pub fn new(values: [f32; N]) -> Self {
        Self(values)
    }

    pub fn zero() -> Self {
        Self([0.0; N])
    }

    pub fn as_array(&self) -> &[f32; N] {
        &self.0
    }

    /// A copy with `f` applied to every coefficient.
    pub fn map(&self, f: impl Fn(usize, f32) -> f32) -> Self {
        let mut out = self.0;
        for (i, v) in out.iter_mut().enumerate() {
            *v = f(i, *v);
        }
        Self(out)
    }
}

impl<const N: usize> Index<usize> for Coefficients<N> {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.0[i]
    }
}

impl<const N: usize> TryFrom<Vec<f32>> for Coefficients<N> {
    type Error = String;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        let len = values.len();
        <[f32; N]>::try_from(values)
            .map(Self)
            .map_err(|_| format!("expected {N} coefficients, found {len}"))
    }
}

impl<const N: usize> From<Coefficients<N>> for Vec<f32> {
    fn from(c: Coefficients<N>) -> Self {
        c.0.to_vec()
    }
}

/// Identifies a coefficient table in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableId {
    PrimaryHeight,
    NonprimaryHeight,
    SpeciesDq,
    ComponentSizeLimits,
    BasalAreaByUtilization,
    DqByUtilization,
    TotalStandWholeStemVolume,
    WholeStemVolumeByUtilization,
    CloseUtilizationVolume,
    NetDecayVolume,
    NetDecayWaste,
    NetBreakage,
    BasalAreaYield,
    DqYield,
    UpperBounds,
    VeteranBasalArea,
    VeteranDq,
    VeteranVolumeAdjust,
    EquationGroups,
    StockingClassFactors,
    SiteCurves,
    DefaultSiteCurves,
    BecZones,
}

impl TableId {
    pub fn name(self) -> &'static str {
        match self {
            TableId::PrimaryHeight => "primary_height",
            TableId::NonprimaryHeight => "nonprimary_height",
            TableId::SpeciesDq => "species_dq",
            TableId::ComponentSizeLimits => "component_size_limits",
            TableId::BasalAreaByUtilization => "basal_area_by_utilization",
            TableId::DqByUtilization => "dq_by_utilization",
            TableId::TotalStandWholeStemVolume => "total_stand_whole_stem_volume",
            TableId::WholeStemVolumeByUtilization => "whole_stem_volume_by_utilization",
            TableId::CloseUtilizationVolume => "close_utilization_volume",
            TableId::NetDecayVolume => "net_decay_volume",
            TableId::NetDecayWaste => "net_decay_waste",
            TableId::NetBreakage => "net_breakage",
            TableId::BasalAreaYield => "basal_area_yield",
            TableId::DqYield => "dq_yield",
            TableId::UpperBounds => "upper_bounds",
            TableId::VeteranBasalArea => "veteran_basal_area",
            TableId::VeteranDq => "veteran_dq",
            TableId::VeteranVolumeAdjust => "veteran_volume_adjust",
            TableId::EquationGroups => "equation_groups",
            TableId::StockingClassFactors => "stocking_class_factors",
            TableId::SiteCurves => "site_curves",
            TableId::DefaultSiteCurves => "default_site_curves",
            TableId::BecZones => "bec_zones",
        }
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A keyed lookup table, read-only once loaded.
///
/// Serialized as a list of `{ "key": ..., "coe": ... }` entries so tuple keys
/// survive formats that only allow string map keys.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable<K: Eq + Hash, V> {
    entries: HashMap<K, V>,
}

#[derive(Serialize, Deserialize)]
struct TableEntry<K, V> {
    key: K,
    coe: V,
}

impl<K: Eq + Hash, V> Default for CoefficientTable<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Debug, V> CoefficientTable<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Look up `key`, failing with [`StandError::MissingCoefficients`] when absent.
    pub fn lookup(&self, id: TableId, key: &K) -> Result<&V, StandError> {
        self.entries
            .get(key)
            .ok_or_else(|| StandError::MissingCoefficients {
                table: id.name(),
                key: format!("{key:?}"),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for CoefficientTable<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, V> Serialize for CoefficientTable<K, V>
where
    K: Eq + Hash + Serialize,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<TableEntry<&K, &V>> = self
            .entries
            .iter()
            .map(|(key, coe)| TableEntry { key, coe })
            .collect();
        entries.serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for CoefficientTable<K, V>
where
    K: Eq + Hash + Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<TableEntry<K, V>>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|e| (e.key, e.coe)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genus, Region};

    #[test]
    fn test_coefficients_from_vec() {
        let c: Coefficients<3> = serde_json::from_str("[1.0, 2.0, 3.0]").unwrap();
        assert_eq!(c[2], 3.0);
        let bad: Result<Coefficients<3>, _> = serde_json::from_str("[1.0, 2.0]");
        assert!(bad.is_err());
    }

    #[test]
    fn test_coefficients_map_is_pure() {
        let c = Coefficients::new([1.0, -2.0, 3.0]);
        let clamped = c.map(|_, v| v.max(0.0));
        assert_eq!(clamped.as_array(), &[1.0, 0.0, 3.0]);
        assert_eq!(c[1], -2.0);
    }

    #[test]
    fn test_lookup_missing_reports_table_and_key() {
        let table: CoefficientTable<(Genus, Region), Coefficients<3>> = CoefficientTable::new();
        let err = table
            .lookup(TableId::PrimaryHeight, &(Genus::H, Region::Coastal))
            .unwrap_err();
        match err {
            StandError::MissingCoefficients { table, key } => {
                assert_eq!(table, "primary_height");
                assert!(key.contains('H'));
                assert!(key.contains("Coastal"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_table_entries_deserialize() {
        let json = r#"[
            {"key": ["H", "C"], "coe": [1.0, 0.1, -0.01]},
            {"key": ["F", "Interior"], "coe": [0.9, 0.2, -0.02]}
        ]"#;
        let table: CoefficientTable<(Genus, Region), Coefficients<3>> =
            serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        let coe = table
            .lookup(TableId::PrimaryHeight, &(Genus::F, Region::Interior))
            .unwrap();
        assert_eq!(coe[0], 0.9);
    }
}
