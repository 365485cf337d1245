use crate::error::StandError;

/// Ratio of empirical to full stand occupancy.
pub const EMPIRICAL_OCCUPANCY: f32 = 0.85;

/// Largest logit whose exponential still fits in an `f32`.
const MAX_LOGIT: f32 = 88.0;

/// `e^logit`, failing instead of overflowing.
pub fn safe_exponent(logit: f32) -> Result<f32, StandError> {
    if logit > MAX_LOGIT {
        return Err(StandError::ProcessingFailure(format!(
            "logit {logit} exceeds {MAX_LOGIT}"
        )));
    }
    Ok(logit.exp())
}

/// Logistic transform `e^x / (1 + e^x)`.
pub fn exponent_ratio(logit: f32) -> Result<f32, StandError> {
    let e = safe_exponent(logit)?;
    Ok(e / (1.0 + e))
}

/// Logistic transform with the argument capped at `limit`.
pub fn ratio(arg: f32, limit: f32) -> f32 {
    let e = arg.min(limit).exp();
    e / (1.0 + e)
}

/// Clamp without the `min <= max` precondition of [`f32::clamp`]; `max` wins.
pub fn clamp(x: f32, min: f32, max: f32) -> f32 {
    x.max(min).min(max)
}
