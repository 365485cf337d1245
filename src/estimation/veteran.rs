//! Estimation of the veteran layer.
//!
//! Veterans are remnant trees of a previous stand; every one of them is
//! counted in the largest utilization band.

use std::cmp::Ordering;

use tracing::debug;

use super::basal_area::veteran_basal_area;
use super::cascade::estimate_species_volumes;
use super::diameter::veteran_quad_mean_diameter;
use super::volume::VolumeAdjustments;
use crate::coefficients::{BecDefinition, ControlMap};
use crate::config::Minima;
use crate::error::StandError;
use crate::models::{
    trees_per_hectare, Layer, Polygon, SpeciesRank, UtilizationClass, UtilizationSet,
    UtilizationVector,
};

const VETERAN_BAND: UtilizationClass = UtilizationClass::Over225;

fn invalid(polygon: &Polygon, message: impl std::fmt::Display) -> StandError {
    StandError::StandValidation(format!("Polygon {}: {message}", polygon.id))
}

/// Per-genus volume adjustments, all applied to the veteran band.
fn veteran_adjustments(coe: &[f32; 4]) -> VolumeAdjustments {
    let in_band = |v: f32| {
        let mut vector = UtilizationVector::zero();
        vector[VETERAN_BAND] = v;
        vector
    };
    VolumeAdjustments {
        whole_stem: coe[0],
        close_utilization: in_band(coe[1]),
        decay: in_band(coe[2]),
        waste: in_band(coe[3]),
    }
}

/// Estimate the veteran layer of `polygon`, if it has one.
pub fn estimate_veteran_layer(
    control: &ControlMap,
    minima: &Minima,
    bec: &BecDefinition,
    polygon: &Polygon,
) -> Result<Option<Layer>, StandError> {
    let Some(input) = polygon.veteran_layer() else {
        return Ok(None);
    };
    let mut layer = input.clone();
    let ytbh = layer
        .site
        .years_to_breast_height
        .unwrap_or(0.0)
        .max(minima.veteran_years_to_breast_height);
    layer.site.years_to_breast_height = Some(ytbh);

    let Some(height) = layer.site.height else {
        return Err(invalid(polygon, "veteran layer has no height"));
    };
    let Some(breast_height_age) = layer.site.breast_height_age() else {
        return Err(invalid(polygon, "veteran layer has no age"));
    };
    let Some(leading) = layer
        .species
        .iter()
        .max_by(|a, b| {
            a.percent_genus
                .partial_cmp(&b.percent_genus)
                .unwrap_or(Ordering::Equal)
        })
        .map(|s| s.genus)
    else {
        return Err(invalid(polygon, "veteran layer has no species"));
    };

    let basal_area = match layer.base_area {
        Some(ba) => ba,
        None => {
            let Some(crown_closure) = layer.crown_closure else {
                return Err(invalid(
                    polygon,
                    "veteran layer needs basal area or crown closure",
                ));
            };
            let coe = control.veteran_basal_area(leading, bec.region)?;
            veteran_basal_area(&coe, height, crown_closure)
        }
    };

    for species in &mut layer.species {
        species.fraction_genus = species.percent_genus / 100.0;
        species.rank = (species.genus == leading).then_some(SpeciesRank::Primary);
        species.groups = control.equation_groups(species.genus, &bec.alias)?;

        let dq = veteran_quad_mean_diameter(&control.veteran_dq(species.genus, bec.region)?, height);
        let ba = basal_area * species.fraction_genus;
        let mut u = UtilizationSet::default();
        u.lorey_height[UtilizationClass::All] = height;
        for uc in [UtilizationClass::All, VETERAN_BAND] {
            u.basal_area[uc] = ba;
            u.quad_mean_diameter[uc] = dq;
            u.trees_per_hectare[uc] = trees_per_hectare(ba, dq);
        }
        species.utilization = u;

        let adjust = control.veteran_volume_adjust(species.genus)?;
        estimate_species_volumes(
            control,
            species,
            bec.region,
            breast_height_age,
            VETERAN_BAND,
            &veteran_adjustments(adjust.as_array()),
        )?;
        let u = &mut species.utilization;
        for volume in [
            &mut u.whole_stem_volume,
            &mut u.close_utilization_volume,
            &mut u.net_of_decay,
            &mut u.net_of_decay_and_waste,
            &mut u.net_of_decay_waste_and_breakage,
        ] {
            volume[UtilizationClass::All] = volume[VETERAN_BAND];
        }
    }
    layer.sum_species_utilization();
    debug!(polygon = %polygon.id, basal_area, leading = %leading, "Estimated veteran layer");
    Ok(Some(layer))
}
