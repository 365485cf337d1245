//! Quad-mean-diameter estimators.

use super::math::{clamp, exponent_ratio, safe_exponent};
use crate::coefficients::{Coefficients, ComponentSizeLimits};
use crate::error::StandError;
use crate::models::{quad_mean_diameter, trees_per_hectare, Genus, UtilizationClass, UtilizationVector};

/// Basal area of a single 7.5 cm tree.
const SINGLE_TREE_BASAL_AREA: f64 = 0.004_417_864_67;

/// Smallest diameter a species partition may be assigned.
const SPECIES_DQ_FLOOR: f32 = 7.6;

/// Stand-level totals of the primary layer, all trees at least 7.5 cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandTotals {
    pub lorey_height: f32,
    pub basal_area: f32,
    pub trees_per_hectare: f32,
    pub quad_mean_diameter: f32,
}

/// A split of the stand between one species (1) and the rest (2).
struct Partition {
    stand_tph: f32,
    ba1: f32,
    ba2: f32,
    tph1: f32,
    dq1: f32,
    dq2: f32,
}

impl Partition {
    fn new(stand: &StandTotals, ba1: f32, tph1: f32) -> Self {
        let ba2 = stand.basal_area - ba1;
        Self {
            stand_tph: stand.trees_per_hectare,
            ba1,
            ba2,
            tph1,
            dq1: quad_mean_diameter(ba1, tph1),
            dq2: quad_mean_diameter(ba2, stand.trees_per_hectare - tph1),
        }
    }

    fn fix_second(&mut self, dq2: f32) {
        self.dq2 = dq2;
        self.tph1 = self.stand_tph - trees_per_hectare(self.ba2, dq2);
        self.dq1 = quad_mean_diameter(self.ba1, self.tph1);
    }

    fn fix_first(&mut self, dq1: f32) {
        self.dq1 = dq1;
        self.tph1 = trees_per_hectare(self.ba1, dq1);
        let tph2 = self.stand_tph - self.tph1;
        self.dq2 = if tph2 > 0.0 && self.ba2 > 0.0 {
            quad_mean_diameter(self.ba2, tph2)
        } else {
            1000.0
        };
    }
}

/// Quad-mean-diameter of one species of the primary layer.
///
/// The species' share of the stand trees is found by solving a quadratic in
/// its trees per hectare, driven by a basal-area ratio built from the
/// distinguishing coefficients of every species present. The result is then
/// clamped to the species' size limits relative to its lorey height.
pub fn species_quad_mean_diameter(
    genus: Genus,
    species_lorey_height: f32,
    fractions: &[(Genus, f32)],
    stand: &StandTotals,
    limits: &ComponentSizeLimits,
    dq_coefficients: impl Fn(Genus) -> Result<Coefficients<3>, StandError>,
) -> Result<f32, StandError> {
    let fraction_of = |g: Genus| {
        fractions
            .iter()
            .find(|(other, _)| *other == g)
            .map_or(0.0, |(_, f)| *f)
    };
    let fraction = fraction_of(genus);
    let stand_dq = stand.quad_mean_diameter;
    let min_dq = SPECIES_DQ_FLOOR.min(stand_dq);

    if fraction >= 1.0 || stand_dq < min_dq {
        return Ok(stand_dq);
    }
    let fraction_other = 1.0 - fraction;

    let base = dq_coefficients(Genus::ALL[0])?;
    let (mut a0, mut a1, a2) = (base[0], base[1], base[2]);
    for other in Genus::ALL.iter().skip(1).copied() {
        if other == genus {
            let coe = dq_coefficients(other)?;
            a0 += coe[0];
            a1 += coe[1];
        } else {
            let other_fraction = fraction_of(other);
            if other_fraction > 0.0 {
                let coe = dq_coefficients(other)?;
                let mult = -other_fraction / fraction_other;
                a0 += mult * coe[0];
                a1 -= mult * coe[1];
            }
        }
    }

    let hl1 = species_lorey_height.max(4.0);
    let hl2 = (stand.lorey_height - species_lorey_height * fraction) / fraction_other;
    let height_ratio = clamp((hl1 - 3.0) / (hl2 - 3.0), 0.05, 20.0);
    let r = (a0 + a1 * height_ratio.ln() + a2 * stand_dq.ln()).exp();

    let ba1 = fraction * stand.basal_area;
    let ba2 = stand.basal_area - ba1;
    let tph1 = if (r - 1.0).abs() < 0.0005 {
        fraction * stand.trees_per_hectare
    } else {
        let r = f64::from(r);
        let tph = f64::from(stand.trees_per_hectare);
        let (ba1, ba2) = (f64::from(ba1), f64::from(ba2));
        let aa = (r - 1.0) * SINGLE_TREE_BASAL_AREA;
        let bb = SINGLE_TREE_BASAL_AREA * (1.0 - r) * tph + ba1 + ba2 * r;
        let cc = -ba1 * tph;
        let term = bb * bb - 4.0 * aa * cc;
        if term <= 0.0 {
            return Err(StandError::ProcessingFailure(format!(
                "no trees-per-hectare partition for {genus}: discriminant {term}"
            )));
        }
        let root = (-bb + term.sqrt()) / (2.0 * aa);
        if root <= 0.0 || root > tph {
            return Err(StandError::ProcessingFailure(format!(
                "trees-per-hectare partition {root} for {genus} outside (0, {tph}]"
            )));
        }
        root as f32
    };

    let mut partition = Partition::new(stand, ba1, tph1);

    if partition.dq2 < min_dq {
        partition.fix_second(min_dq);
    }
    let dq_min = min_dq.max(limits.min_dq_to_lorey_height_ratio * species_lorey_height);
    let dq_max = SPECIES_DQ_FLOOR.max(
        limits
            .quad_mean_diameter_maximum
            .min(limits.max_dq_to_lorey_height_ratio * species_lorey_height),
    );
    if partition.dq1 < dq_min {
        partition.fix_first(dq_min);
    }
    if partition.dq1 > dq_max {
        partition.fix_first(dq_max);
        if partition.dq2 < min_dq {
            partition.fix_second(min_dq);
        }
    }
    Ok(partition.dq1)
}

/// Splits the stand diameter into the four merchantable bands.
///
/// Reads `dq[All]` and writes every band slot.
pub fn quad_mean_diameter_by_utilization(
    dq: &mut UtilizationVector,
    coefficients: impl Fn(UtilizationClass) -> Result<Coefficients<4>, StandError>,
) -> Result<(), StandError> {
    let dq07 = dq[UtilizationClass::All];
    for uc in UtilizationClass::BANDS {
        let a = coefficients(uc)?;
        dq[uc] = match uc {
            UtilizationClass::U75To125 => {
                if dq07 < 7.5001 {
                    7.5
                } else {
                    let logit = a[1] / a[0] * (dq07 - 7.5);
                    let estimate = 7.5 + a[0] * (1.0 - safe_exponent(logit)?).powf(a[2]);
                    estimate.min(dq07)
                }
            }
            UtilizationClass::U125To175 | UtilizationClass::U175To225 => {
                let logit = a[0] + a[1] * (dq07 / 7.5).powf(a[2]);
                uc.lower_bound() + 5.0 * exponent_ratio(logit)?
            }
            _ => {
                let logit = a[2] + a[1] * dq07.powf(a[3]);
                let estimate = dq07 + a[0] * (1.0 - exponent_ratio(logit)?);
                estimate.max(22.5)
            }
        };
    }
    Ok(())
}

/// Yield-model stand diameter from dominant height and breast-height age.
pub fn quad_mean_diameter_yield(
    coe: &Coefficients<5>,
    dominant_height: f32,
    breast_height_age: f32,
    age_control: u32,
    upper_bound: f32,
) -> Result<f32, StandError> {
    if dominant_height <= 5.0 {
        return Ok(SPECIES_DQ_FLOOR);
    }
    let age = capped_age(breast_height_age, age_control)?;
    let tr = age.ln();
    let scale = (coe[1] + coe[2] * tr).max(0.0);
    let power = (coe[3] + coe[4] * tr).max(0.0);
    let dq = coe[0] + scale * (dominant_height - 5.0).powf(power);
    Ok(clamp(dq, SPECIES_DQ_FLOOR, upper_bound))
}

/// Breast-height age, capped by the yield age control when it is positive.
pub(crate) fn capped_age(breast_height_age: f32, age_control: u32) -> Result<f32, StandError> {
    let age = if age_control > 0 {
        breast_height_age.min(age_control as f32 * 100.0)
    } else {
        breast_height_age
    };
    if age <= 0.0 {
        return Err(StandError::StandValidation(format!(
            "breast height age must be positive for yield estimation, got {age}"
        )));
    }
    Ok(age)
}

/// Diameter of a veteran species from its lorey height.
pub fn veteran_quad_mean_diameter(coe: &Coefficients<3>, lorey_height: f32) -> f32 {
    (coe[0] + coe[1] * lorey_height.powf(coe[2])).max(22.5)
}
