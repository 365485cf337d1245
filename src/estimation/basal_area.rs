//! Basal area estimators.

use super::diameter::capped_age;
use super::math::{exponent_ratio, EMPIRICAL_OCCUPANCY};
use crate::coefficients::Coefficients;
use crate::error::StandError;
use crate::models::{UtilizationClass, UtilizationVector};

/// Splits `ba[All]` into the four merchantable bands.
///
/// Each step estimates the share of the basal area at or above the next band
/// from the stand diameter; `dq` must already carry the band diameters.
pub fn basal_area_by_utilization(
    ba: &mut UtilizationVector,
    dq: &UtilizationVector,
    coefficients: impl Fn(UtilizationClass) -> Result<Coefficients<2>, StandError>,
) -> Result<(), StandError> {
    let dq_all = dq[UtilizationClass::All];
    let total = ba[UtilizationClass::All];

    // Basal area at or above the lower bound of bands 2, 3 and 4.
    let mut above = [total, 0.0, 0.0, 0.0];
    for (i, uc) in [
        UtilizationClass::U75To125,
        UtilizationClass::U125To175,
        UtilizationClass::U175To225,
    ]
    .into_iter()
    .enumerate()
    {
        let a = coefficients(uc)?;
        let logit = if uc == UtilizationClass::U75To125 {
            a[0] + a[1] * dq_all.powf(0.25)
        } else {
            a[0] + a[1] * dq_all
        };
        above[i + 1] = above[i] * exponent_ratio(logit)?;

        if uc == UtilizationClass::U75To125 && dq_all < 12.5 {
            let spread = (dq[UtilizationClass::U75To125] - 7.4) / (dq_all - 7.4);
            let ba12_max = (1.0 - spread * spread) * total;
            above[1] = above[1].min(ba12_max);
        }
    }

    ba[UtilizationClass::U75To125] = total - above[1];
    ba[UtilizationClass::U125To175] = above[1] - above[2];
    ba[UtilizationClass::U175To225] = above[2] - above[3];
    ba[UtilizationClass::Over225] = above[3];
    Ok(())
}

/// Yield-model stand basal area from dominant height and breast-height age.
#[allow(clippy::too_many_arguments)]
pub fn basal_area_yield(
    coe: &Coefficients<7>,
    dominant_height: f32,
    breast_height_age: f32,
    veteran_basal_area: f32,
    full_occupancy: bool,
    upper_bound: f32,
    age_control: u32,
) -> Result<f32, StandError> {
    let age = capped_age(breast_height_age, age_control)?;
    let tr = age.ln();
    let coe = coe.map(|i, c| if i == 5 { c.min(0.0) } else { c });

    let a00 = (coe[0] + coe[1] * tr).max(0.0);
    let ap = (coe[3] + coe[4] * tr).max(0.0);

    let mut bap = if dominant_height <= coe[2] {
        0.0
    } else {
        let bap = a00
            * (dominant_height - coe[2]).powf(ap)
            * (coe[5] * dominant_height + coe[6] * veteran_basal_area).exp();
        bap.min(upper_bound)
    };
    if full_occupancy {
        bap /= EMPIRICAL_OCCUPANCY;
    }
    Ok(bap)
}

/// Basal area of a veteran layer from its height and crown closure.
pub fn veteran_basal_area(coe: &Coefficients<3>, height: f32, crown_closure: f32) -> f32 {
    let ba = coe[0] * (height - coe[1]).max(0.0).powf(coe[2]) * crown_closure / 4.0;
    ba.max(0.01)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band_coefficients(uc: UtilizationClass) -> Result<Coefficients<2>, StandError> {
        Ok(match uc {
            UtilizationClass::U75To125 => Coefficients::new([0.9, 0.967]),
            UtilizationClass::U125To175 => Coefficients::new([-0.265, 0.1]),
            _ => Coefficients::new([-1.595, 0.1]),
        })
    }

    #[test]
    fn test_bands_sum_to_total() {
        let mut ba = UtilizationVector::small_and_all(0.0, 40.0);
        let dq = UtilizationVector::new(0.0, 25.0, 10.8, 15.2, 20.2, 33.8);
        basal_area_by_utilization(&mut ba, &dq, band_coefficients).unwrap();
        assert!((ba.band_sum() - 40.0).abs() < 1e-3);
        for uc in UtilizationClass::BANDS {
            assert!(ba[uc] > 0.0, "{uc}");
        }
        assert!(ba[UtilizationClass::Over225] > ba[UtilizationClass::U75To125]);
        assert_eq!(ba[UtilizationClass::All], 40.0);
    }

    #[test]
    fn test_small_stand_caps_second_band_share() {
        let mut ba = UtilizationVector::small_and_all(0.0, 10.0);
        let dq = UtilizationVector::new(0.0, 9.0, 8.5, 13.0, 18.0, 23.0);
        basal_area_by_utilization(&mut ba, &dq, band_coefficients).unwrap();
        let spread: f32 = (8.5 - 7.4) / (9.0 - 7.4);
        let ba12_max = (1.0 - spread * spread) * 10.0;
        let above_first = 10.0 - ba[UtilizationClass::U75To125];
        assert!(above_first <= ba12_max + 1e-4);
        assert!((ba.band_sum() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_basal_area_yield() {
        let coe = Coefficients::new([1.0, 0.0, 5.0, 1.0, 0.0, 0.1, -0.01]);
        let bare = basal_area_yield(&coe, 25.0, 60.0, 0.0, false, 60.0, 0).unwrap();
        assert!((bare - 20.0).abs() < 1e-4);

        let full = basal_area_yield(&coe, 25.0, 60.0, 0.0, true, 60.0, 0).unwrap();
        assert!((full - 20.0 / 0.85).abs() < 1e-3);

        let with_veterans = basal_area_yield(&coe, 25.0, 60.0, 10.0, false, 60.0, 0).unwrap();
        assert!((with_veterans - 20.0 * (-0.1f32).exp()).abs() < 1e-3);

        assert_eq!(basal_area_yield(&coe, 4.0, 60.0, 0.0, false, 60.0, 0).unwrap(), 0.0);
        assert_eq!(basal_area_yield(&coe, 25.0, 60.0, 0.0, false, 15.0, 0).unwrap(), 15.0);
        assert!(basal_area_yield(&coe, 25.0, -1.0, 0.0, false, 60.0, 0).is_err());
    }

    #[test]
    fn test_veteran_basal_area() {
        let coe = Coefficients::new([0.1, 10.0, 1.0]);
        assert!((veteran_basal_area(&coe, 30.0, 8.0) - 4.0).abs() < 1e-5);
        assert_eq!(veteran_basal_area(&coe, 8.0, 8.0), 0.01);
    }
}
