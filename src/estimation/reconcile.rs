//! Reconciliation of per-band basal area, trees per hectare and diameter.
//!
//! After the bands are estimated independently they rarely agree with the
//! stand totals. Three modes repair them, tried in order: move basal area
//! down when even the smallest admissible diameters leave too few trees,
//! otherwise scale the diameters with a common multiplier while pinning
//! out-of-band classes at their bounds, and as a last resort put the whole
//! stand into the single band its diameter falls in.

use tracing::debug;

use crate::error::StandError;
use crate::models::{
    quad_mean_diameter, trees_per_hectare, UtilizationClass, UtilizationVector, PI_40K,
};

/// Relative tolerance on the band sums entering reconciliation.
const ENTRY_TOLERANCE: f32 = 0.000_03;

/// Relative tolerance on the band sums after a scaling pass.
const RESULT_TOLERANCE: f32 = 0.000_2;

/// Bands are accepted without scaling when trees per hectare agree this closely.
const ACCEPT_TOLERANCE: f32 = 0.000_01;

const MAX_SCALING_PASSES: usize = 4;

/// Make the four bands consistent with the `All` totals.
///
/// On success the band sums of basal area and trees per hectare equal the
/// `All` slots and every occupied band's diameter lies within its bounds.
pub fn reconcile_components(
    basal_area: &mut UtilizationVector,
    trees_per_hectare_util: &mut UtilizationVector,
    dq: &mut UtilizationVector,
) -> Result<(), StandError> {
    let ba_all = basal_area[UtilizationClass::All];
    if ba_all == 0.0 {
        for uc in UtilizationClass::BANDS {
            basal_area[uc] = 0.0;
            trees_per_hectare_util[uc] = 0.0;
        }
        return Ok(());
    }

    let ba_sum = basal_area.band_sum();
    if (ba_sum - ba_all).abs() > ENTRY_TOLERANCE * ba_sum {
        return Err(StandError::ProcessingFailure(format!(
            "band basal areas sum to {ba_sum}, expected {ba_all}"
        )));
    }
    let tph_all = trees_per_hectare_util[UtilizationClass::All];
    let dq_all = quad_mean_diameter(ba_all, tph_all);
    if dq_all < UtilizationClass::All.lower_bound() {
        return Err(StandError::ProcessingFailure(format!(
            "stand diameter {dq_all} below {}",
            UtilizationClass::All.lower_bound()
        )));
    }

    let tph_sum_high: f32 = UtilizationClass::BANDS
        .iter()
        .map(|uc| trees_per_hectare(basal_area[*uc], uc.lower_bound()))
        .sum();

    if tph_sum_high < tph_all {
        debug!(tph_sum_high, tph_all, "Reconciling bands by moving basal area down");
        move_basal_area_down(basal_area, trees_per_hectare_util, dq, tph_sum_high);
        return Ok(());
    }

    if let Err(e) = scale_if_inconsistent(basal_area, trees_per_hectare_util, dq) {
        debug!(cause = %e, "Diameter scaling failed, collapsing into one band");
        collapse_into_single_band(basal_area, trees_per_hectare_util, dq);
    }
    Ok(())
}

/// Every band at its lower diameter bound still yields too few trees: shift
/// basal area into smaller bands until the missing trees are made up.
pub(crate) fn move_basal_area_down(
    basal_area: &mut UtilizationVector,
    tph: &mut UtilizationVector,
    dq: &mut UtilizationVector,
    tph_sum_high: f32,
) {
    let mut need = tph[UtilizationClass::All] - tph_sum_high;

    for uc in UtilizationClass::BANDS.into_iter().rev() {
        let Some(previous) = uc.previous_band() else {
            break;
        };
        let ba = basal_area[uc];
        let gain = trees_per_hectare(ba, previous.lower_bound()) - trees_per_hectare(ba, uc.lower_bound());
        if gain <= need {
            basal_area[previous] += ba;
            basal_area[uc] = 0.0;
            need -= gain;
        } else {
            let moved = ba * need / gain;
            basal_area[previous] += moved;
            basal_area[uc] = ba - moved;
            need = 0.0;
        }
    }

    for uc in UtilizationClass::BANDS {
        dq[uc] = uc.lower_bound();
        tph[uc] = trees_per_hectare(basal_area[uc], uc.lower_bound());
    }
}

/// Run [`scale_diameters`] unless the bands already agree with the totals.
pub(crate) fn scale_if_inconsistent(
    basal_area: &mut UtilizationVector,
    tph: &mut UtilizationVector,
    dq: &mut UtilizationVector,
) -> Result<(), StandError> {
    let tph_all = tph[UtilizationClass::All];
    let tph_sum = tph.band_sum();
    if (tph_sum - tph_all).abs() / tph_all > ACCEPT_TOLERANCE {
        return scale_diameters(basal_area, tph, dq);
    }
    for uc in UtilizationClass::BANDS {
        if basal_area[uc] > 0.0 {
            if tph[uc] <= 0.0 {
                return scale_diameters(basal_area, tph, dq);
            }
            let dq_band = quad_mean_diameter(basal_area[uc], tph[uc]);
            if dq_band < uc.lower_bound() || dq_band > uc.upper_bound() {
                return scale_diameters(basal_area, tph, dq);
            }
        }
    }
    Ok(())
}

/// Scale every free band's diameter by a common multiplier that restores the
/// tree count, pinning the worst out-of-band class at its bound each pass.
pub(crate) fn scale_diameters(
    basal_area: &UtilizationVector,
    tph: &mut UtilizationVector,
    dq: &mut UtilizationVector,
) -> Result<(), StandError> {
    let mut pinned = [false; 4];
    let mut ba_fixed = 0.0f32;
    let mut tph_fixed = 0.0f32;
    let mut trial = UtilizationVector::zero();
    let mut passes = 0;

    loop {
        passes += 1;
        if passes > MAX_SCALING_PASSES {
            return Err(StandError::ProcessingFailure(
                "diameter scaling did not settle".to_string(),
            ));
        }

        let sum: f64 = UtilizationClass::BANDS
            .iter()
            .enumerate()
            .filter(|(i, uc)| basal_area[**uc] != 0.0 && !pinned[*i])
            .map(|(_, uc)| f64::from(basal_area[*uc]) / f64::from(dq[*uc] * dq[*uc]))
            .sum();

        let ba_free = basal_area[UtilizationClass::All] - ba_fixed;
        let tph_free = tph[UtilizationClass::All] - tph_fixed;
        if ba_free <= 0.0 || tph_free <= 0.0 {
            return Err(StandError::ProcessingFailure(format!(
                "no basal area ({ba_free}) or trees ({tph_free}) left to distribute"
            )));
        }
        let multiplier = (sum / f64::from(PI_40K) / f64::from(tph_free)).sqrt() as f32;

        for (i, uc) in UtilizationClass::BANDS.into_iter().enumerate() {
            if !pinned[i] && basal_area[uc] > 0.0 {
                trial[uc] = dq[uc] * multiplier;
            }
        }

        let mut worst: Option<(usize, UtilizationClass, f32)> = None;
        let mut worst_violation = 0.0f32;
        for (i, uc) in UtilizationClass::BANDS.into_iter().enumerate() {
            if basal_area[uc] > 0.0 && trial[uc] < uc.lower_bound() {
                let violation = 1.0 - trial[uc] / uc.lower_bound();
                if violation > worst_violation {
                    worst_violation = violation;
                    worst = Some((i, uc, uc.lower_bound()));
                }
            }
            if trial[uc] > uc.upper_bound() {
                let violation = trial[uc] / uc.upper_bound() - 1.0;
                if violation > worst_violation {
                    worst_violation = violation;
                    worst = Some((i, uc, uc.upper_bound()));
                }
            }
        }

        let Some((i, uc, bound)) = worst else {
            break;
        };
        pinned[i] = true;
        trial[uc] = bound;
        ba_fixed += basal_area[uc];
        tph_fixed += trees_per_hectare(basal_area[uc], bound);
    }

    for uc in UtilizationClass::BANDS {
        dq[uc] = trial[uc];
        tph[uc] = trees_per_hectare(basal_area[uc], trial[uc]);
    }

    let ba_all = basal_area[UtilizationClass::All];
    let tph_all = tph[UtilizationClass::All];
    let ba_sum = basal_area.band_sum();
    let tph_sum = tph.band_sum();
    if (ba_sum - ba_all).abs() > RESULT_TOLERANCE * ba_all
        || (tph_sum - tph_all).abs() > RESULT_TOLERANCE * tph_all
    {
        return Err(StandError::ProcessingFailure(format!(
            "scaled bands sum to ba {ba_sum}, tph {tph_sum}; expected {ba_all}, {tph_all}"
        )));
    }
    Ok(())
}

/// Put the whole stand into the first band whose upper bound exceeds the
/// stand diameter; the empty bands get their midpoints.
pub(crate) fn collapse_into_single_band(
    basal_area: &mut UtilizationVector,
    tph: &mut UtilizationVector,
    dq: &mut UtilizationVector,
) {
    for uc in UtilizationClass::BANDS {
        basal_area[uc] = 0.0;
        tph[uc] = 0.0;
        dq[uc] = uc.lower_bound() + 2.5;
    }
    let dq_all = dq[UtilizationClass::All];
    if let Some(uc) = UtilizationClass::BANDS
        .into_iter()
        .find(|uc| dq_all < uc.upper_bound())
    {
        basal_area[uc] = basal_area[UtilizationClass::All];
        tph[uc] = tph[UtilizationClass::All];
        dq[uc] = dq_all;
    }
}
