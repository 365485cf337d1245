//! Adjustments applied to estimated layers before they are reported.

use crate::error::StandError;
use crate::models::{
    basal_area, quad_mean_diameter, HasUtilization, Layer, UtilizationClass, UtilizationSet,
};

/// Margin kept between a derived diameter and its class bounds.
const DQ_EPS: f32 = 0.005;

/// Largest basal-area correction accepted when forcing a class into bounds.
const MAX_BASAL_AREA_CORRECTION: f32 = 0.1;

/// Scale the per-hectare values of a layer and its species by a stocking factor.
pub fn apply_stocking_factor(layer: &mut Layer, factor: f32) {
    scale_per_hectare(&mut layer.utilization, factor);
    for species in &mut layer.species {
        scale_per_hectare(species.utilization_mut(), factor);
    }
}

fn scale_per_hectare(utilization: &mut UtilizationSet, factor: f32) {
    for vector in utilization.per_hectare_mut() {
        for uc in UtilizationClass::BANDS {
            vector[uc] *= factor;
        }
        vector.store_band_sum();
    }
}

/// Expresses per-hectare values over the forested area only.
fn scale_to_percent_available(utilization: &mut UtilizationSet, percent_available: f32) {
    if percent_available <= 0.0 || percent_available >= 100.0 {
        return;
    }
    let factor = 100.0 / percent_available;
    for vector in utilization.per_hectare_mut() {
        for uc in UtilizationClass::ALL_CLASSES {
            if vector[uc] > 0.0 {
                vector[uc] *= factor;
            }
        }
    }
}

/// Clears every slot without both basal area and trees; lorey height is kept.
fn reset_empty_slots(utilization: &mut UtilizationSet) {
    for uc in UtilizationClass::ALL_CLASSES {
        if utilization.basal_area[uc] <= 0.0 || utilization.trees_per_hectare[uc] <= 0.0 {
            for vector in utilization.per_hectare_mut() {
                vector[uc] = 0.0;
            }
        }
    }
}

/// Move basal area just inside the diameter bounds implied by the tree count.
fn adjust_basal_area_to_bounds(utilization: &mut UtilizationSet) -> Result<(), StandError> {
    for uc in UtilizationClass::ALL_CLASSES {
        let tph = utilization.trees_per_hectare[uc];
        if tph <= 0.0 {
            continue;
        }
        let ba = utilization.basal_area[uc];
        let low = basal_area(uc.lower_bound() + DQ_EPS, tph);
        let high = basal_area(uc.upper_bound() - DQ_EPS, tph);
        let target = if ba < low {
            low
        } else if ba > high {
            high
        } else {
            continue;
        };
        if (target - ba).abs() > MAX_BASAL_AREA_CORRECTION {
            return Err(StandError::ProcessingFailure(format!(
                "basal area {ba} in class {uc} needs correction to {target}"
            )));
        }
        utilization.basal_area[uc] = target;
    }
    Ok(())
}

/// Recompute each occupied class's diameter from its basal area and tree count.
fn recompute_diameters(utilization: &mut UtilizationSet) -> Result<(), StandError> {
    for uc in UtilizationClass::ALL_CLASSES {
        let ba = utilization.basal_area[uc];
        if ba <= 0.0 {
            continue;
        }
        let mut dq = quad_mean_diameter(ba, utilization.trees_per_hectare[uc]);
        if dq < uc.lower_bound() {
            dq += DQ_EPS;
            if dq < uc.lower_bound() {
                return Err(StandError::ProcessingFailure(format!(
                    "diameter {dq} below class {uc} lower bound"
                )));
            }
        }
        if dq > uc.upper_bound() {
            dq -= DQ_EPS;
            if dq > uc.upper_bound() {
                return Err(StandError::ProcessingFailure(format!(
                    "diameter {dq} above class {uc} upper bound"
                )));
            }
        }
        utilization.quad_mean_diameter[uc] = dq;
    }
    Ok(())
}

/// Final per-entity corrections: forested-area scaling, clearing empty
/// classes and forcing diameters into their class bounds.
pub fn post_create_adjustments<T: HasUtilization>(
    entity: &mut T,
    percent_available: f32,
) -> Result<(), StandError> {
    let utilization = entity.utilization_mut();
    scale_to_percent_available(utilization, percent_available);
    reset_empty_slots(utilization);
    adjust_basal_area_to_bounds(utilization)?;
    recompute_diameters(utilization)
}

/// [`post_create_adjustments`] on a layer and all its species.
pub fn adjust_layer(layer: &mut Layer, percent_available: f32) -> Result<(), StandError> {
    post_create_adjustments(layer, percent_available)?;
    for species in &mut layer.species {
        post_create_adjustments(species, percent_available)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{trees_per_hectare, Genus, LayerType, Species, UtilizationVector};

    fn species_with(ba: UtilizationVector, tph: UtilizationVector) -> Species {
        let mut sp = Species::new(Genus::H, 100.0);
        sp.utilization.basal_area = ba;
        sp.utilization.trees_per_hectare = tph;
        sp.utilization.lorey_height = UtilizationVector::small_and_all(0.0, 21.0);
        sp.utilization.whole_stem_volume = ba.map(|_, v| v * 10.0);
        sp
    }

    #[test]
    fn test_percent_available_scaling() {
        let tph = trees_per_hectare(2.0, 20.0);
        let mut sp = species_with(
            UtilizationVector::new(0.0, 2.0, 0.0, 0.0, 2.0, 0.0),
            UtilizationVector::new(0.0, tph, 0.0, 0.0, tph, 0.0),
        );
        post_create_adjustments(&mut sp, 50.0).unwrap();
        let u = &sp.utilization;
        assert!((u.basal_area[UtilizationClass::All] - 4.0).abs() < 1e-5);
        assert!((u.trees_per_hectare[UtilizationClass::All] - 2.0 * tph).abs() < 1e-3);
        assert!((u.whole_stem_volume[UtilizationClass::U175To225] - 40.0).abs() < 1e-4);
        assert!((u.quad_mean_diameter[UtilizationClass::U175To225] - 20.0).abs() < 1e-3);
        assert_eq!(u.lorey_height[UtilizationClass::All], 21.0);
    }

    #[test]
    fn test_full_availability_is_unscaled() {
        let tph = trees_per_hectare(2.0, 20.0);
        let ba = UtilizationVector::new(0.0, 2.0, 0.0, 0.0, 2.0, 0.0);
        let mut sp = species_with(ba, UtilizationVector::new(0.0, tph, 0.0, 0.0, tph, 0.0));
        post_create_adjustments(&mut sp, 100.0).unwrap();
        assert_eq!(sp.utilization.basal_area, ba);
    }

    #[test]
    fn test_empty_slots_reset() {
        let mut sp = species_with(
            UtilizationVector::new(0.0, 2.0, 0.5, 0.0, 1.5, 0.0),
            UtilizationVector::new(0.0, 60.0, 0.0, 0.0, 60.0, 0.0),
        );
        post_create_adjustments(&mut sp, 100.0).unwrap();
        let u = &sp.utilization;
        assert_eq!(u.basal_area[UtilizationClass::U75To125], 0.0);
        assert_eq!(u.whole_stem_volume[UtilizationClass::U75To125], 0.0);
        assert_eq!(u.lorey_height[UtilizationClass::All], 21.0);
    }

    #[test]
    fn test_basal_area_nudged_into_bounds() {
        // 100 trees at exactly 12.5 cm sit on the band's lower edge.
        let ba = basal_area(12.5, 100.0);
        let mut sp = species_with(
            UtilizationVector::new(0.0, ba, 0.0, ba, 0.0, 0.0),
            UtilizationVector::new(0.0, 100.0, 0.0, 100.0, 0.0, 0.0),
        );
        post_create_adjustments(&mut sp, 100.0).unwrap();
        let dq = sp.utilization.quad_mean_diameter[UtilizationClass::U125To175];
        assert!(dq > 12.5 && dq < 12.51, "{dq}");
    }

    #[test]
    fn test_large_correction_fails() {
        let mut sp = species_with(
            UtilizationVector::new(0.0, 10.0, 10.0, 0.0, 0.0, 0.0),
            UtilizationVector::new(0.0, 100.0, 100.0, 0.0, 0.0, 0.0),
        );
        assert!(matches!(
            post_create_adjustments(&mut sp, 100.0),
            Err(StandError::ProcessingFailure(_))
        ));
    }

    #[test]
    fn test_stocking_factor() {
        let mut layer = Layer::new(LayerType::Primary);
        layer.utilization.basal_area = UtilizationVector::new(0.0, 3.0, 1.0, 2.0, 0.0, 0.0);
        layer.species.push(species_with(
            UtilizationVector::new(0.0, 3.0, 1.0, 2.0, 0.0, 0.0),
            UtilizationVector::new(0.0, 50.0, 30.0, 20.0, 0.0, 0.0),
        ));
        apply_stocking_factor(&mut layer, 0.5);
        assert!((layer.utilization.basal_area[UtilizationClass::All] - 1.5).abs() < 1e-6);
        let sp = &layer.species[0].utilization;
        assert!((sp.trees_per_hectare[UtilizationClass::All] - 25.0).abs() < 1e-5);
        assert!((sp.whole_stem_volume[UtilizationClass::U125To175] - 10.0).abs() < 1e-5);
    }
}
