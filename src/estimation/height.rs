//! Lorey height estimators.

use crate::coefficients::{Coefficients, NonprimaryHeightCoefficients};

/// Ratio between primary lorey height and lead dominant height (above breast height).
fn height_multiplier(coe: &Coefficients<3>, trees_per_hectare_primary: f32) -> f32 {
    coe[0] - coe[1] + coe[1] * (coe[2] * (trees_per_hectare_primary - 100.0)).exp()
}

/// Lorey height of the primary species from the dominant height of the lead species.
pub fn primary_height_from_lead_height(
    lead_height: f32,
    coe: &Coefficients<3>,
    trees_per_hectare_primary: f32,
) -> f32 {
    1.3 + (lead_height - 1.3) * height_multiplier(coe, trees_per_hectare_primary)
}

/// Inverse of [`primary_height_from_lead_height`].
pub fn lead_height_from_primary_height(
    primary_height: f32,
    coe: &Coefficients<3>,
    trees_per_hectare_primary: f32,
) -> f32 {
    1.3 + (primary_height - 1.3) / height_multiplier(coe, trees_per_hectare_primary)
}

/// Lorey height of a non-primary species of the primary layer.
pub fn non_primary_lorey_height(
    coe: &NonprimaryHeightCoefficients,
    lead_height: f32,
    primary_height: f32,
) -> f32 {
    let height = if coe.equation_index == 1 {
        lead_height
    } else {
        primary_height
    };
    1.3 + coe.c1 * (height - 1.3).powf(coe.c2)
}
