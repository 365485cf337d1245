//! The cascading volume estimators.
//!
//! Each stage derives one volume vector from the previous stage's vector:
//! whole stem, close utilization, net of decay, net of decay and waste, and
//! net of decay, waste and breakage. A band whose input is not positive gets
//! zero without consulting the regression.

use super::math::{clamp, ratio};
use crate::coefficients::Coefficients;
use crate::error::StandError;
use crate::models::{UtilizationClass, UtilizationVector};

/// Additive adjustments to the volume regressions, used for veteran layers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeAdjustments {
    /// Added to the whole-stem argument of the target class only
    pub whole_stem: f32,
    pub close_utilization: UtilizationVector,
    pub decay: UtilizationVector,
    pub waste: UtilizationVector,
}

/// Applies `f` to every band selected by `target`.
///
/// Any band with no input is zeroed, selected or not. With `target == All`
/// every other band is estimated; otherwise only that band is, and the rest
/// of `output` is left untouched.
fn estimate_bands(
    target: UtilizationClass,
    input: &UtilizationVector,
    output: &mut UtilizationVector,
    mut f: impl FnMut(UtilizationClass, f32) -> Result<f32, StandError>,
) -> Result<(), StandError> {
    for uc in UtilizationClass::BANDS {
        let base = input[uc];
        if base <= 0.0 {
            output[uc] = 0.0;
            continue;
        }
        if target != UtilizationClass::All && target != uc {
            continue;
        }
        output[uc] = f(uc, base)?;
    }
    Ok(())
}

/// Whole-stem volume per tree, in double precision.
pub(crate) fn whole_stem_volume_per_tree_f64(
    coe: &Coefficients<9>,
    lorey_height: f64,
    dq: f64,
) -> f64 {
    let c = coe.as_array().map(f64::from);
    let log_mean_volume = c[0]
        + c[1] * dq.ln()
        + c[2] * lorey_height.ln()
        + c[3] * dq
        + c[4] / dq
        + c[5] * lorey_height
        + c[6] * dq * dq
        + c[7] * lorey_height * dq
        + c[8] * lorey_height / dq;
    log_mean_volume.exp()
}

/// Whole-stem volume (m³) of an average tree of the given lorey height and diameter.
pub fn whole_stem_volume_per_tree(coe: &Coefficients<9>, lorey_height: f32, dq: f32) -> f32 {
    whole_stem_volume_per_tree_f64(coe, f64::from(lorey_height), f64::from(dq)) as f32
}

/// Scale the bands so they sum to the `All` slot.
fn normalize_bands(vector: &mut UtilizationVector) -> Result<(), StandError> {
    let sum = vector.band_sum();
    if sum <= 0.0 {
        return Err(StandError::ProcessingFailure(format!(
            "cannot normalize utilization bands with sum {sum}"
        )));
    }
    let k = vector[UtilizationClass::All] / sum;
    for uc in UtilizationClass::BANDS {
        vector[uc] *= k;
    }
    Ok(())
}

/// Whole-stem volume by band from basal area.
///
/// When estimating every band, `whole_stem[All]` must already hold the
/// stand-level estimate; the bands are normalized to it.
pub fn whole_stem_volume(
    target: UtilizationClass,
    adjust: f32,
    lorey_height: f32,
    dq: &UtilizationVector,
    basal_area: &UtilizationVector,
    whole_stem: &mut UtilizationVector,
    coefficients: impl Fn(UtilizationClass) -> Result<Coefficients<4>, StandError>,
) -> Result<(), StandError> {
    let dq_sp = dq[UtilizationClass::All];
    estimate_bands(target, basal_area, whole_stem, |uc, ba| {
        let a = coefficients(uc)?;
        let size_term = if uc == UtilizationClass::Over225 {
            a[3] * dq_sp
        } else {
            a[3] * dq_sp.ln()
        };
        let mut arg = a[0] + a[1] * lorey_height.ln() + a[2] * dq[uc].ln() + size_term;
        if uc == target {
            arg += adjust;
        }
        Ok(ba * arg.exp())
    })?;

    if target == UtilizationClass::All {
        normalize_bands(whole_stem)?;
    }
    Ok(())
}

/// Close-utilization volume by band as a share of whole-stem volume.
#[allow(clippy::too_many_arguments)]
pub fn close_utilization_volume(
    target: UtilizationClass,
    adjust: &UtilizationVector,
    lorey_height: f32,
    dq: &UtilizationVector,
    whole_stem: &UtilizationVector,
    close_utilization: &mut UtilizationVector,
    coefficients: impl Fn(UtilizationClass) -> Result<Coefficients<3>, StandError>,
) -> Result<(), StandError> {
    estimate_bands(target, whole_stem, close_utilization, |uc, ws| {
        let a = coefficients(uc)?;
        let arg = a[0] + a[1] * dq[uc] + a[2] * lorey_height + adjust[uc];
        Ok(ws * ratio(arg, 7.0))
    })?;

    if target == UtilizationClass::All {
        close_utilization.store_band_sum();
    }
    Ok(())
}

/// Close-utilization volume net of decay.
#[allow(clippy::too_many_arguments)]
pub fn net_decay_volume(
    target: UtilizationClass,
    adjust: &UtilizationVector,
    decay_modifier: f32,
    breast_height_age: f32,
    dq: &UtilizationVector,
    close_utilization: &UtilizationVector,
    net_decay: &mut UtilizationVector,
    coefficients: impl Fn(UtilizationClass) -> Result<Coefficients<3>, StandError>,
) -> Result<(), StandError> {
    let dq_sp = dq[UtilizationClass::All];
    let age_tr = breast_height_age.max(20.0).ln();

    estimate_bands(target, close_utilization, net_decay, |uc, cu| {
        let a = coefficients(uc)?;
        let size = if uc == UtilizationClass::Over225 {
            dq[uc]
        } else {
            dq_sp
        };
        let arg = a[0] + a[1] * size.ln() + a[2] * age_tr + adjust[uc] + decay_modifier;
        Ok(cu * ratio(arg, 8.0))
    })?;

    if target == UtilizationClass::All {
        net_decay.store_band_sum();
    }
    Ok(())
}

/// Net-of-decay volume less waste.
///
/// The waste fraction never exceeds the decay fraction. A non-zero adjustment
/// shifts the logit of the waste-to-decay ratio afterwards.
#[allow(clippy::too_many_arguments)]
pub fn net_decay_waste_volume(
    target: UtilizationClass,
    adjust: &UtilizationVector,
    waste_modifier: f32,
    lorey_height: f32,
    coe: &Coefficients<6>,
    dq: &UtilizationVector,
    close_utilization: &UtilizationVector,
    net_decay: &UtilizationVector,
    net_decay_waste: &mut UtilizationVector,
) -> Result<(), StandError> {
    estimate_bands(target, net_decay, net_decay_waste, |uc, nd| {
        if nd.is_nan() || nd <= 0.0 {
            return Ok(0.0);
        }
        let mut a0 = coe[0];
        if uc == UtilizationClass::Over225 {
            a0 += coe[5];
        }
        let cu = close_utilization[uc];
        let frd = 1.0 - nd / cu;

        let arg = a0 + coe[1] * frd + coe[3] * dq[uc].ln() + coe[4] * lorey_height.ln();
        let arg = clamp(arg + waste_modifier, -10.0, 10.0);

        let frw = (1.0 - (coe[2] * frd).exp()) * arg.exp() / (1.0 + arg.exp()) * (1.0 - frd);
        let frw = frd.min(frw);

        let mut result = cu * (1.0 - frd - frw);

        if adjust[uc] != 0.0 {
            let share = result / nd;
            if share > 0.0 && share < 1.0 {
                let arg = clamp((share / (1.0 - share)).ln() + adjust[uc], -10.0, 10.0);
                result = arg.exp() / (1.0 + arg.exp()) * nd;
            }
        }
        Ok(result)
    })?;

    if target == UtilizationClass::All {
        net_decay_waste.store_band_sum();
    }
    Ok(())
}

/// Net-of-decay-and-waste volume less breakage.
pub fn net_breakage_volume(
    target: UtilizationClass,
    coe: &Coefficients<4>,
    dq: &UtilizationVector,
    close_utilization: &UtilizationVector,
    net_decay_waste: &UtilizationVector,
    net_breakage: &mut UtilizationVector,
) -> Result<(), StandError> {
    estimate_bands(target, net_decay_waste, net_breakage, |uc, nw| {
        let percent_broken = clamp(coe[0] + coe[1] * dq[uc].ln(), coe[2], coe[3]);
        let broken = (percent_broken / 100.0 * close_utilization[uc]).min(nw);
        Ok(nw - broken)
    })?;

    if target == UtilizationClass::All {
        net_breakage.store_band_sum();
    }
    Ok(())
}
