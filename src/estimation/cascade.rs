//! The volume cascade of a single species, wired to its coefficient tables.

use super::volume::{
    close_utilization_volume, net_breakage_volume, net_decay_volume, net_decay_waste_volume,
    whole_stem_volume, VolumeAdjustments,
};
use crate::coefficients::ControlMap;
use crate::error::StandError;
use crate::models::{Region, Species, UtilizationClass};

/// Estimate every volume of `species` for the `target` class.
///
/// Diameter, basal area and lorey height must already be set; with
/// `target == All` the whole-stem `All` slot must hold the stand-level volume.
pub fn estimate_species_volumes(
    control: &ControlMap,
    species: &mut Species,
    region: Region,
    breast_height_age: f32,
    target: UtilizationClass,
    adjustments: &VolumeAdjustments,
) -> Result<(), StandError> {
    let genus = species.genus;
    let groups = species.groups;
    let u = &mut species.utilization;
    let lorey_height = u.lorey_height[UtilizationClass::All];

    whole_stem_volume(
        target,
        adjustments.whole_stem,
        lorey_height,
        &u.quad_mean_diameter,
        &u.basal_area,
        &mut u.whole_stem_volume,
        |uc| control.whole_stem_volume_by_utilization(uc, groups.volume),
    )?;
    close_utilization_volume(
        target,
        &adjustments.close_utilization,
        lorey_height,
        &u.quad_mean_diameter,
        &u.whole_stem_volume,
        &mut u.close_utilization_volume,
        |uc| control.close_utilization_volume(uc, groups.volume),
    )?;
    net_decay_volume(
        target,
        &adjustments.decay,
        control.decay_modifier(genus, region),
        breast_height_age,
        &u.quad_mean_diameter,
        &u.close_utilization_volume,
        &mut u.net_of_decay,
        |uc| control.net_decay_volume(uc, groups.decay),
    )?;
    net_decay_waste_volume(
        target,
        &adjustments.waste,
        control.waste_modifier(genus, region),
        lorey_height,
        &control.net_decay_waste(genus)?,
        &u.quad_mean_diameter,
        &u.close_utilization_volume,
        &u.net_of_decay,
        &mut u.net_of_decay_and_waste,
    )?;
    net_breakage_volume(
        target,
        &control.net_breakage(groups.breakage)?,
        &u.quad_mean_diameter,
        &u.close_utilization_volume,
        &u.net_of_decay_and_waste,
        &mut u.net_of_decay_waste_and_breakage,
    )
}
