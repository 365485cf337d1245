use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// `π / 40 000`: converts DQ² (cm²) × trees/ha into basal area (m²/ha).
pub const PI_40K: f32 = std::f32::consts::PI / 40_000.0;

/// Diameter classes a stand is disaggregated into.
///
/// `Small` is the sub-merchantable band, `All` is the total over every tree
/// at least 7.5 cm, and the remaining four are the ordered merchantable bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UtilizationClass {
    Small,
    All,
    U75To125,
    U125To175,
    U175To225,
    Over225,
}

impl UtilizationClass {
    /// Every slot, in vector order.
    pub const ALL_CLASSES: [UtilizationClass; 6] = [
        UtilizationClass::Small,
        UtilizationClass::All,
        UtilizationClass::U75To125,
        UtilizationClass::U125To175,
        UtilizationClass::U175To225,
        UtilizationClass::Over225,
    ];

    /// The four merchantable bands, smallest first.
    pub const BANDS: [UtilizationClass; 4] = [
        UtilizationClass::U75To125,
        UtilizationClass::U125To175,
        UtilizationClass::U175To225,
        UtilizationClass::Over225,
    ];

    /// Position in a [`UtilizationVector`].
    pub fn index(self) -> usize {
        match self {
            UtilizationClass::Small => 0,
            UtilizationClass::All => 1,
            UtilizationClass::U75To125 => 2,
            UtilizationClass::U125To175 => 3,
            UtilizationClass::U175To225 => 4,
            UtilizationClass::Over225 => 5,
        }
    }

    /// Legacy class number: -1 for small, 0 for all, 1..=4 for the bands.
    /// Coefficient tables keyed by band use this number.
    pub fn legacy_index(self) -> i32 {
        self.index() as i32 - 1
    }

    pub fn from_legacy_index(index: i32) -> Option<Self> {
        usize::try_from(index + 1)
            .ok()
            .and_then(|i| Self::ALL_CLASSES.get(i).copied())
    }

    pub fn lower_bound(self) -> f32 {
        match self {
            UtilizationClass::Small => 4.0,
            UtilizationClass::All => 7.5,
            UtilizationClass::U75To125 => 7.5,
            UtilizationClass::U125To175 => 12.5,
            UtilizationClass::U175To225 => 17.5,
            UtilizationClass::Over225 => 22.5,
        }
    }

    pub fn upper_bound(self) -> f32 {
        match self {
            UtilizationClass::Small => 7.5,
            UtilizationClass::All => 2000.0,
            UtilizationClass::U75To125 => 12.5,
            UtilizationClass::U125To175 => 17.5,
            UtilizationClass::U175To225 => 22.5,
            UtilizationClass::Over225 => 2000.0,
        }
    }

    pub fn is_band(self) -> bool {
        !matches!(self, UtilizationClass::Small | UtilizationClass::All)
    }

    /// The next smaller band, if this is a band above the first.
    pub fn previous_band(self) -> Option<Self> {
        match self {
            UtilizationClass::U125To175 => Some(UtilizationClass::U75To125),
            UtilizationClass::U175To225 => Some(UtilizationClass::U125To175),
            UtilizationClass::Over225 => Some(UtilizationClass::U175To225),
            _ => None,
        }
    }
}

impl std::fmt::Display for UtilizationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UtilizationClass::Small => write!(f, "4.0-7.5"),
            UtilizationClass::All => write!(f, "All"),
            UtilizationClass::U75To125 => write!(f, "7.5-12.5"),
            UtilizationClass::U125To175 => write!(f, "12.5-17.5"),
            UtilizationClass::U175To225 => write!(f, "17.5-22.5"),
            UtilizationClass::Over225 => write!(f, "22.5+"),
        }
    }
}

/// A fixed six-slot vector indexed by [`UtilizationClass`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UtilizationVector([f32; 6]);

impl UtilizationVector {
    pub fn new(small: f32, all: f32, b1: f32, b2: f32, b3: f32, b4: f32) -> Self {
        Self([small, all, b1, b2, b3, b4])
    }

    /// A vector with only the `Small` and `All` slots set.
    pub fn small_and_all(small: f32, all: f32) -> Self {
        Self([small, all, 0.0, 0.0, 0.0, 0.0])
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> &[f32; 6] {
        &self.0
    }

    pub fn band_values(&self) -> [f32; 4] {
        [self.0[2], self.0[3], self.0[4], self.0[5]]
    }

    /// Sum of the four merchantable bands.
    pub fn band_sum(&self) -> f32 {
        self.band_values().iter().sum()
    }

    /// Write the band sum into `All` and return it.
    pub fn store_band_sum(&mut self) -> f32 {
        let sum = self.band_sum();
        self[UtilizationClass::All] = sum;
        sum
    }

    /// Apply `f` to every slot.
    pub fn map(&self, f: impl Fn(UtilizationClass, f32) -> f32) -> Self {
        let mut out = *self;
        for uc in UtilizationClass::ALL_CLASSES {
            out[uc] = f(uc, self[uc]);
        }
        out
    }

    /// Slot-wise accumulate.
    pub fn accumulate(&mut self, other: &UtilizationVector) {
        for i in 0..6 {
            self.0[i] += other.0[i];
        }
    }
}

impl Index<UtilizationClass> for UtilizationVector {
    type Output = f32;

    fn index(&self, uc: UtilizationClass) -> &f32 {
        &self.0[uc.index()]
    }
}

impl IndexMut<UtilizationClass> for UtilizationVector {
    fn index_mut(&mut self, uc: UtilizationClass) -> &mut f32 {
        &mut self.0[uc.index()]
    }
}

/// The per-class metrics carried by every species and layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilizationSet {
    pub lorey_height: UtilizationVector,
    pub basal_area: UtilizationVector,
    pub trees_per_hectare: UtilizationVector,
    pub quad_mean_diameter: UtilizationVector,
    pub whole_stem_volume: UtilizationVector,
    pub close_utilization_volume: UtilizationVector,
    pub net_of_decay: UtilizationVector,
    pub net_of_decay_and_waste: UtilizationVector,
    pub net_of_decay_waste_and_breakage: UtilizationVector,
}

impl UtilizationSet {
    /// The five cascading volume vectors, whole stem first.
    pub fn volumes(&self) -> [&UtilizationVector; 5] {
        [
            &self.whole_stem_volume,
            &self.close_utilization_volume,
            &self.net_of_decay,
            &self.net_of_decay_and_waste,
            &self.net_of_decay_waste_and_breakage,
        ]
    }

    /// Every per-hectare vector: basal area, trees per hectare and the volumes.
    pub fn per_hectare_mut(&mut self) -> [&mut UtilizationVector; 7] {
        [
            &mut self.basal_area,
            &mut self.trees_per_hectare,
            &mut self.whole_stem_volume,
            &mut self.close_utilization_volume,
            &mut self.net_of_decay,
            &mut self.net_of_decay_and_waste,
            &mut self.net_of_decay_waste_and_breakage,
        ]
    }
}

/// Anything that owns a [`UtilizationSet`].
pub trait HasUtilization {
    fn utilization(&self) -> &UtilizationSet;
    fn utilization_mut(&mut self) -> &mut UtilizationSet;
}

/// Basal area (m²/ha) of `trees_per_hectare` trees with quad-mean-diameter `dq`.
pub fn basal_area(dq: f32, trees_per_hectare: f32) -> f32 {
    PI_40K * dq * dq * trees_per_hectare
}

/// Trees per hectare carrying `basal_area` at quad-mean-diameter `dq`.
pub fn trees_per_hectare(basal_area: f32, dq: f32) -> f32 {
    if basal_area != 0.0 {
        basal_area / (PI_40K * dq * dq)
    } else {
        0.0
    }
}

/// Quad-mean-diameter from basal area and trees per hectare.
pub fn quad_mean_diameter(basal_area: f32, trees_per_hectare: f32) -> f32 {
    if basal_area > 1.0e6 || basal_area * trees_per_hectare <= 0.0 {
        return 0.0;
    }
    (basal_area / trees_per_hectare / PI_40K).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_indices_and_bounds() {
        assert_eq!(UtilizationClass::Small.index(), 0);
        assert_eq!(UtilizationClass::Over225.index(), 5);
        assert_eq!(UtilizationClass::Small.legacy_index(), -1);
        assert_eq!(UtilizationClass::U75To125.legacy_index(), 1);
        assert_eq!(
            UtilizationClass::from_legacy_index(4),
            Some(UtilizationClass::Over225)
        );
        assert_eq!(UtilizationClass::from_legacy_index(5), None);
        assert_eq!(UtilizationClass::from_legacy_index(-2), None);

        let lower: Vec<f32> = UtilizationClass::ALL_CLASSES
            .iter()
            .map(|uc| uc.lower_bound())
            .collect();
        assert_eq!(lower, vec![4.0, 7.5, 7.5, 12.5, 17.5, 22.5]);
        let upper: Vec<f32> = UtilizationClass::ALL_CLASSES
            .iter()
            .map(|uc| uc.upper_bound())
            .collect();
        assert_eq!(upper, vec![7.5, 2000.0, 12.5, 17.5, 22.5, 2000.0]);
    }

    #[test]
    fn test_previous_band() {
        assert_eq!(UtilizationClass::U75To125.previous_band(), None);
        assert_eq!(
            UtilizationClass::Over225.previous_band(),
            Some(UtilizationClass::U175To225)
        );
        assert_eq!(UtilizationClass::All.previous_band(), None);
    }

    #[test]
    fn test_store_band_sum() {
        let mut v = UtilizationVector::new(0.5, 0.0, 1.0, 2.0, 3.0, 4.0);
        let sum = v.store_band_sum();
        assert_eq!(sum, 10.0);
        assert_eq!(v[UtilizationClass::All], 10.0);
        assert_eq!(v[UtilizationClass::Small], 0.5);
    }

    #[test]
    fn test_basal_area_tph_dq_consistency() {
        let ba = basal_area(30.2601795, 620.504883);
        assert!((ba - 44.6249847).abs() < 0.01);
        let tph = trees_per_hectare(44.6249847, 30.2601795);
        assert!((tph - 620.504883).abs() < 0.1);
        let dq = quad_mean_diameter(44.6249847, 620.504883);
        assert!((dq - 30.2601795).abs() < 0.001);
    }

    #[test]
    fn test_degenerate_conversions() {
        assert_eq!(trees_per_hectare(0.0, 0.0), 0.0);
        assert_eq!(quad_mean_diameter(0.0, 10.0), 0.0);
        assert_eq!(quad_mean_diameter(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_serde_as_array() {
        let v = UtilizationVector::new(0.0, 1.0, 2.0, 3.0, 4.0, 5.0);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[0.0,1.0,2.0,3.0,4.0,5.0]");
    }
}
