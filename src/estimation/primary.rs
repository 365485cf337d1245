//! Estimation of the primary layer.
//!
//! The layer's basal area and tree count are partitioned among its species so
//! that each species' share of whole-stem volume matches its input percent,
//! then every species is split into utilization bands and run through the
//! volume cascade. The layer totals are the sums over its species.

use tracing::debug;

use super::adjustments::apply_stocking_factor;
use super::basal_area::{basal_area_by_utilization, basal_area_yield};
use super::cascade::estimate_species_volumes;
use super::classification::{find_base_area_group, find_itg, find_primary_species};
use super::diameter::{
    quad_mean_diameter_by_utilization, quad_mean_diameter_yield, species_quad_mean_diameter,
    StandTotals,
};
use super::height::{non_primary_lorey_height, primary_height_from_lead_height};
use super::reconcile::reconcile_components;
use super::root_finder::{NewtonSolver, RootSpecies, StandRootFunction};
use super::volume::{whole_stem_volume_per_tree, VolumeAdjustments};
use crate::coefficients::{weighted_coefficient_sum, BecDefinition, ControlMap};
use crate::config::SolverOptions;
use crate::error::StandError;
use crate::models::{
    quad_mean_diameter, trees_per_hectare, Genus, Layer, Polygon, Species, SpeciesRank,
    UtilizationClass, UtilizationSet,
};

fn invalid(polygon: &Polygon, message: impl std::fmt::Display) -> StandError {
    StandError::StandValidation(format!("Polygon {}: {message}", polygon.id))
}

/// Rank the species, set the inventory type group and resolve every
/// species' equation groups. Returns the primary genus.
fn classify(
    control: &ControlMap,
    bec: &BecDefinition,
    layer: &mut Layer,
) -> Result<(Genus, u32), StandError> {
    let primaries = find_primary_species(&layer.species)?;
    let Some(primary) = primaries.first() else {
        return Err(StandError::IllegalArgument(
            "layer has no primary species".to_string(),
        ));
    };
    let secondary = primaries.get(1);
    let itg = find_itg(primary, secondary)?;

    for species in &mut layer.species {
        species.fraction_genus = species.percent_genus / 100.0;
        species.rank = if species.genus == primary.genus {
            Some(SpeciesRank::Primary)
        } else if secondary.is_some_and(|s| s.genus == species.genus) {
            Some(SpeciesRank::Secondary)
        } else {
            None
        };
        let mut groups = control.equation_groups(species.genus, &bec.alias)?;
        groups.basal_area = control.modified_basal_area_group(groups.basal_area, itg);
        species.groups = groups;
    }
    layer.inventory_type_group = Some(itg);
    Ok((primary.genus, itg))
}

/// Yield-model inputs read from the layer's site.
struct YieldSite {
    lead_height: f32,
    breast_height_age: f32,
}

fn yield_site(polygon: &Polygon, layer: &Layer) -> Result<YieldSite, StandError> {
    let Some(lead_height) = layer.site.height else {
        return Err(invalid(polygon, "primary layer has no height"));
    };
    let Some(breast_height_age) = layer.site.breast_height_age() else {
        return Err(invalid(polygon, "primary layer has no breast height age"));
    };
    Ok(YieldSite {
        lead_height,
        breast_height_age,
    })
}

/// Basal area from the yield model, before the polygon's yield factor.
fn yield_basal_area(
    control: &ControlMap,
    bec: &BecDefinition,
    polygon: &Polygon,
    layer: &Layer,
    primary_genus: Genus,
    itg: u32,
    full_occupancy: bool,
) -> Result<f32, StandError> {
    let site = yield_site(polygon, layer)?;
    let group = find_base_area_group(control, primary_genus, &bec.alias, itg)?;
    let bounds = control.upper_bounds(group)?;
    let coe = weighted_coefficient_sum(
        &layer.species,
        |s| f64::from(s.fraction_genus),
        |s| control.basal_area_yield(bec.decay_bec(), s.genus),
    )?;
    let veteran_basal_area = polygon
        .veteran_layer()
        .and_then(|v| v.base_area)
        .unwrap_or(0.0);
    basal_area_yield(
        &coe,
        site.lead_height,
        site.breast_height_age,
        veteran_basal_area,
        full_occupancy,
        bounds.basal_area,
        control.yield_age_control,
    )
}

/// Full-occupancy basal area the yield model predicts for the primary layer.
pub fn predicted_basal_area(
    control: &ControlMap,
    bec: &BecDefinition,
    polygon: &Polygon,
) -> Result<f32, StandError> {
    let Some(input) = polygon.primary_layer() else {
        return Err(invalid(polygon, "no primary layer"));
    };
    let mut layer = input.clone();
    let (primary_genus, itg) = classify(control, bec, &mut layer)?;
    yield_basal_area(control, bec, polygon, &layer, primary_genus, itg, true)
}

/// Stand basal area and trees per hectare: the input values where given,
/// otherwise the yield model's.
fn stand_density(
    control: &ControlMap,
    bec: &BecDefinition,
    polygon: &Polygon,
    layer: &Layer,
    primary_genus: Genus,
    itg: u32,
) -> Result<(f32, f32), StandError> {
    let basal_area = match layer.base_area {
        Some(ba) => ba,
        None => {
            let ba = yield_basal_area(control, bec, polygon, layer, primary_genus, itg, false)?;
            ba * polygon.yield_factor
        }
    };
    let trees = match layer.trees_per_hectare {
        Some(tph) => tph,
        None => {
            let site = yield_site(polygon, layer)?;
            let group = find_base_area_group(control, primary_genus, &bec.alias, itg)?;
            let bounds = control.upper_bounds(group)?;
            let coe = weighted_coefficient_sum(
                &layer.species,
                |s| f64::from(s.fraction_genus),
                |s| control.dq_yield(bec.decay_bec(), s.genus),
            )?;
            let dq = quad_mean_diameter_yield(
                &coe,
                site.lead_height,
                site.breast_height_age,
                control.yield_age_control,
                bounds.quad_mean_diameter,
            )?;
            trees_per_hectare(basal_area, dq)
        }
    };
    debug!(basal_area, trees, "Primary layer density");
    Ok((basal_area, trees))
}

/// Partition the layer among its species with the root finder, or hand the
/// whole layer to a lone species.
fn partition_species(
    control: &ControlMap,
    bec: &BecDefinition,
    solver: &SolverOptions,
    layer: &mut Layer,
    stand: &StandTotals,
) -> Result<(), StandError> {
    if let [single] = layer.species.as_mut_slice() {
        let coe = control.total_stand_whole_stem_volume(single.groups.volume)?;
        let u = &mut single.utilization;
        let hl = u.lorey_height[UtilizationClass::All];
        u.basal_area[UtilizationClass::All] = stand.basal_area;
        u.trees_per_hectare[UtilizationClass::All] = stand.trees_per_hectare;
        u.quad_mean_diameter[UtilizationClass::All] = stand.quad_mean_diameter;
        u.whole_stem_volume[UtilizationClass::All] = stand.trees_per_hectare
            * whole_stem_volume_per_tree(&coe, hl, stand.quad_mean_diameter);
        return Ok(());
    }

    let fractions: Vec<(Genus, f32)> = layer
        .species
        .iter()
        .map(|s| (s.genus, s.fraction_genus))
        .collect();
    let roots = layer
        .species
        .iter()
        .map(|s| {
            let lorey_height = s.utilization.lorey_height[UtilizationClass::All];
            let limits = control.component_size_limits(s.genus, bec.region)?;
            let base_dq = species_quad_mean_diameter(
                s.genus,
                lorey_height,
                &fractions,
                stand,
                &limits,
                |g| control.species_dq(g),
            )?;
            Ok(RootSpecies {
                base_dq,
                lorey_height,
                volume_coefficients: control.total_stand_whole_stem_volume(s.groups.volume)?,
            })
        })
        .collect::<Result<Vec<_>, StandError>>()?;

    let percents: Vec<f32> = layer.species.iter().map(|s| s.percent_genus).collect();
    let function = StandRootFunction::new(stand.basal_area, &roots);
    let solution = NewtonSolver::new(solver.clone()).solve(
        StandRootFunction::initial_point(&percents),
        &StandRootFunction::goal(&percents, stand.quad_mean_diameter),
        |x| function.evaluate(x),
    )?;

    for (species, c) in layer.species.iter_mut().zip(function.components(&solution)?) {
        if c.basal_area <= 0.0 || c.trees_per_hectare <= 0.0 {
            return Err(StandError::ProcessingFailure(format!(
                "species {} left with basal area {} after partitioning",
                species.genus, c.basal_area
            )));
        }
        let u = &mut species.utilization;
        u.basal_area[UtilizationClass::All] = c.basal_area as f32;
        u.trees_per_hectare[UtilizationClass::All] = c.trees_per_hectare as f32;
        u.quad_mean_diameter[UtilizationClass::All] = c.quad_mean_diameter as f32;
        u.whole_stem_volume[UtilizationClass::All] = c.whole_stem_volume as f32;
        species.percent_genus = c.percent as f32;
        species.fraction_genus = (c.percent / 100.0) as f32;
    }
    Ok(())
}

/// Split a species' totals into the utilization bands and reconcile them.
fn split_by_utilization(
    control: &ControlMap,
    growth_bec: &str,
    species: &mut Species,
) -> Result<(), StandError> {
    let genus = species.genus;
    let u = &mut species.utilization;
    quad_mean_diameter_by_utilization(&mut u.quad_mean_diameter, |uc| {
        control.dq_by_utilization(uc, genus, growth_bec)
    })?;
    basal_area_by_utilization(&mut u.basal_area, &u.quad_mean_diameter, |uc| {
        control.basal_area_by_utilization(uc, genus, growth_bec)
    })?;
    for uc in UtilizationClass::BANDS {
        u.trees_per_hectare[uc] = trees_per_hectare(u.basal_area[uc], u.quad_mean_diameter[uc]);
    }
    reconcile_components(
        &mut u.basal_area,
        &mut u.trees_per_hectare,
        &mut u.quad_mean_diameter,
    )
}

/// Estimate the primary layer of `polygon`.
///
/// The polygon's site values must be complete. The returned layer carries
/// per-species and layer utilization before the forested-area adjustment.
pub fn estimate_primary_layer(
    control: &ControlMap,
    solver: &SolverOptions,
    bec: &BecDefinition,
    polygon: &Polygon,
) -> Result<Layer, StandError> {
    let Some(input) = polygon.primary_layer() else {
        return Err(invalid(polygon, "no primary layer"));
    };
    let mut layer = input.clone();
    for species in &mut layer.species {
        species.utilization = UtilizationSet::default();
    }
    let (primary_genus, itg) = classify(control, bec, &mut layer)?;
    let site = yield_site(polygon, &layer)?;
    let (basal_area, trees) = stand_density(control, bec, polygon, &layer, primary_genus, itg)?;
    if basal_area <= 0.0 || trees <= 0.0 {
        return Err(StandError::ProcessingFailure(format!(
            "primary layer of polygon {} has basal area {basal_area} and {trees} trees",
            polygon.id
        )));
    }
    let dq = quad_mean_diameter(basal_area, trees);
    if dq < UtilizationClass::All.lower_bound() {
        return Err(StandError::ProcessingFailure(format!(
            "primary layer diameter {dq} below {}",
            UtilizationClass::All.lower_bound()
        )));
    }

    let primary_height = primary_height_from_lead_height(
        site.lead_height,
        &control.primary_height(primary_genus, bec.region)?,
        trees,
    );
    for species in &mut layer.species {
        let lorey_height = if species.genus == primary_genus {
            primary_height
        } else {
            let coe = control.nonprimary_height(species.genus, primary_genus, bec.region)?;
            non_primary_lorey_height(&coe, site.lead_height, primary_height)
        };
        species.utilization.lorey_height[UtilizationClass::All] = lorey_height;
        species.utilization.basal_area[UtilizationClass::All] = basal_area * species.fraction_genus;
    }

    let stand = StandTotals {
        lorey_height: layer.weighted_lorey_height(),
        basal_area,
        trees_per_hectare: trees,
        quad_mean_diameter: dq,
    };
    partition_species(control, bec, solver, &mut layer, &stand)?;

    for species in &mut layer.species {
        split_by_utilization(control, bec.growth_bec(), species)?;
        estimate_species_volumes(
            control,
            species,
            bec.region,
            site.breast_height_age,
            UtilizationClass::All,
            &VolumeAdjustments::default(),
        )?;
    }
    layer.sum_species_utilization();

    if let Some(class) = layer.stocking_class {
        let stocking = control.stocking_factor(class, bec.region)?;
        apply_stocking_factor(&mut layer, stocking.factor);
    }
    debug!(
        polygon = %polygon.id,
        itg,
        primary = %primary_genus,
        basal_area,
        trees,
        "Estimated primary layer"
    );
    Ok(layer)
}
