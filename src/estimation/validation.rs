//! Pre-estimation checks and polygon mode resolution.

use tracing::debug;

use crate::coefficients::{ControlMap, SiteCurveOracle};
use crate::config::Minima;
use crate::error::StandError;
use crate::models::{
    GenusDictionary, Layer, LayerType, Polygon, PolygonMode, Region, Site, SpeciesDictionary,
};

fn invalid(polygon: &Polygon, message: impl std::fmt::Display) -> StandError {
    StandError::StandValidation(format!("Polygon {}: {message}", polygon.id))
}

/// Fill a missing years-to-breast-height, height or site index from the site
/// curve, using the layer's curve or the default one for its leading genus.
pub fn complete_site(
    layer: &mut Layer,
    region: Region,
    control: &ControlMap,
) -> Result<(), StandError> {
    let site = layer.site;
    if site.years_to_breast_height.is_some() && site.height.is_some() && site.site_index.is_some() {
        return Ok(());
    }
    let curve = match site.site_curve {
        Some(curve) => curve,
        None => {
            let Some(lead) = layer.primary_species().or_else(|| layer.species.first()) else {
                return Ok(());
            };
            control.default_site_curve(lead.genus, region)?
        }
    };
    let oracle = control.site_curves();
    let mut completed = Site {
        site_curve: Some(curve),
        ..site
    };

    if completed.years_to_breast_height.is_none() {
        if let Some(si) = completed.site_index {
            completed.years_to_breast_height = Some(oracle.years_to_breast_height(curve, si)?);
        }
    }
    if let Some(bh_age) = completed.breast_height_age() {
        match (completed.height, completed.site_index) {
            (None, Some(si)) => completed.height = Some(oracle.height(curve, bh_age, si)?),
            (Some(h), None) => completed.site_index = Some(oracle.site_index(curve, bh_age, h)?),
            _ => {}
        }
    }
    debug!(layer = %layer.layer_type, curve, "Completed site values");
    layer.site = completed;
    Ok(())
}

/// Mode a polygon is processed in when its input does not name one.
///
/// `predicted_base_area` is only consulted when basal area or trees per
/// hectare are missing.
pub fn find_default_polygon_mode(
    polygon: &Polygon,
    minima: &Minima,
    predicted_base_area: impl FnOnce() -> Result<f32, StandError>,
) -> Result<PolygonMode, StandError> {
    let Some(primary) = polygon.primary_layer() else {
        return Err(invalid(polygon, "no primary layer"));
    };
    let height = primary.site.height.unwrap_or(0.0);
    if height < minima.height {
        return Ok(PolygonMode::Young);
    }
    match (primary.base_area, primary.trees_per_hectare) {
        (Some(ba), Some(_)) => {
            let percent_forest = polygon.effective_percent_available();
            if ba * 100.0 / percent_forest < minima.base_area {
                return Ok(PolygonMode::Young);
            }
        }
        _ => {
            if predicted_base_area()? < minima.predicted_base_area {
                return Ok(PolygonMode::Young);
            }
        }
    }
    Ok(PolygonMode::Start)
}

fn require_positive(
    polygon: &Polygon,
    mode: PolygonMode,
    name: &str,
    value: Option<f32>,
    floor: f32,
) -> Result<(), StandError> {
    match value {
        Some(v) if v > floor => Ok(()),
        Some(v) => Err(invalid(
            polygon,
            format!("{mode} mode requires {name} above {floor}, got {v}"),
        )),
        None => Err(invalid(polygon, format!("{mode} mode requires {name}"))),
    }
}

/// Per-mode minimum values of the primary layer.
pub fn check_mode_minima(polygon: &Polygon, mode: PolygonMode) -> Result<(), StandError> {
    let Some(layer) = polygon.primary_layer() else {
        return Err(invalid(polygon, "no primary layer"));
    };
    let site = &layer.site;
    match mode {
        PolygonMode::Start => {
            require_positive(polygon, mode, "site index", site.site_index, 0.0)?;
            require_positive(polygon, mode, "total age", site.age_total, 0.0)?;
            require_positive(polygon, mode, "breast height age", site.breast_height_age(), 0.0)?;
            require_positive(polygon, mode, "height", site.height, 4.5)?;
            if let Some(ba) = layer.base_area {
                require_positive(polygon, mode, "basal area", Some(ba), 0.0)?;
            }
            if let Some(tph) = layer.trees_per_hectare {
                require_positive(polygon, mode, "trees per hectare", Some(tph), 0.0)?;
            }
        }
        PolygonMode::Young => {
            require_positive(polygon, mode, "site index", site.site_index, 0.0)?;
            require_positive(polygon, mode, "total age", site.age_total, 0.0)?;
            require_positive(
                polygon,
                mode,
                "years to breast height",
                site.years_to_breast_height,
                0.0,
            )?;
        }
        PolygonMode::Batn | PolygonMode::Batc => {
            require_positive(polygon, mode, "site index", site.site_index, 0.0)?;
            require_positive(polygon, mode, "total age", site.age_total, 0.0)?;
            require_positive(polygon, mode, "breast height age", site.breast_height_age(), 0.0)?;
            require_positive(polygon, mode, "height", site.height, 1.3)?;
            if mode == PolygonMode::Batc {
                require_positive(polygon, mode, "crown closure", layer.crown_closure, 0.0)?;
            }
        }
        PolygonMode::DontProcess => {}
    }
    Ok(())
}

/// Checks every layer against the domain minima.
pub fn validate_layers(polygon: &Polygon, minima: &Minima) -> Result<(), StandError> {
    if polygon.primary_layer().is_none() {
        return Err(invalid(polygon, "no primary layer"));
    }
    for layer in polygon.layers.values() {
        if layer.species.is_empty() {
            return Err(invalid(polygon, format!("{} layer has no species", layer.layer_type)));
        }
        let dictionary = GenusDictionary;
        let mut seen = vec![false; dictionary.aliases().len() + 1];
        for species in &layer.species {
            species.validate()?;
            let index = dictionary.index_of(species.genus).ok_or_else(|| {
                invalid(polygon, format!("genus {} is not in the dictionary", species.genus))
            })?;
            if std::mem::replace(&mut seen[index], true) {
                return Err(invalid(
                    polygon,
                    format!("{} layer lists genus {} more than once", layer.layer_type, species.genus),
                ));
            }
        }
        let total = layer.percent_total();
        if (total - 100.0).abs() > minima.percent_total_tolerance {
            return Err(invalid(
                polygon,
                format!("{} layer species percents sum to {total}, not 100", layer.layer_type),
            ));
        }

        let site = &layer.site;
        let (minimum_height, label) = match layer.layer_type {
            LayerType::Primary => (minima.height, "primary"),
            LayerType::Veteran => (minima.veteran_height, "veteran"),
        };
        if let Some(h) = site.height {
            if h < minimum_height {
                return Err(invalid(
                    polygon,
                    format!("{label} height {h} below minimum {minimum_height}"),
                ));
            }
        }
        if layer.layer_type == LayerType::Primary {
            if let Some(ytbh) = site.years_to_breast_height {
                if ytbh < 0.5 {
                    return Err(invalid(
                        polygon,
                        format!("years to breast height {ytbh} below 0.5"),
                    ));
                }
            }
        }
        if let (Some(age), Some(ytbh)) = (site.age_total, site.years_to_breast_height) {
            if age < ytbh {
                return Err(invalid(
                    polygon,
                    format!("{label} total age {age} less than years to breast height {ytbh}"),
                ));
            }
        }
        if let Some(si) = site.site_index {
            if si < 0.5 {
                return Err(invalid(polygon, format!("{label} site index {si} below 0.5")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::SiteCurve;
    use crate::models::{Genus, Species};

    fn polygon() -> Polygon {
        let mut layer = Layer::new(LayerType::Primary);
        layer.site = Site {
            age_total: Some(60.0),
            years_to_breast_height: Some(7.0),
            height: Some(24.0),
            site_index: Some(22.0),
            site_curve: None,
        };
        layer.base_area = Some(40.0);
        layer.trees_per_hectare = Some(800.0);
        layer.species = vec![Species::new(Genus::H, 70.0), Species::new(Genus::S, 30.0)];
        let mut polygon = Polygon::new("01002 S000001 00", "CWH");
        polygon.layers.insert(LayerType::Primary, layer);
        polygon
    }

    fn primary_mut(polygon: &mut Polygon) -> &mut Layer {
        polygon.layers.get_mut(&LayerType::Primary).unwrap()
    }

    #[test]
    fn test_valid_polygon() {
        let poly = polygon();
        validate_layers(&poly, &Minima::default()).unwrap();
        check_mode_minima(&poly, PolygonMode::Start).unwrap();
    }

    #[test]
    fn test_percent_total() {
        let mut poly = polygon();
        primary_mut(&mut poly).species[1].percent_genus = 29.0;
        let err = validate_layers(&poly, &Minima::default()).unwrap_err();
        assert!(err.to_string().contains("sum to 99"));
    }

    #[test]
    fn test_duplicate_genus_rejected() {
        let mut poly = polygon();
        let layer = primary_mut(&mut poly);
        layer.species = vec![Species::new(Genus::H, 50.0), Species::new(Genus::H, 50.0)];
        let err = validate_layers(&poly, &Minima::default()).unwrap_err();
        assert!(matches!(err, StandError::StandValidation(_)));
        assert!(err.to_string().contains("genus H more than once"));

        primary_mut(&mut poly).species[1].genus = Genus::S;
        assert!(validate_layers(&poly, &Minima::default()).is_ok());
    }

    #[test]
    fn test_height_and_age_minima() {
        let mut poly = polygon();
        primary_mut(&mut poly).site.height = Some(5.0);
        assert!(validate_layers(&poly, &Minima::default()).is_err());

        let mut poly = polygon();
        primary_mut(&mut poly).site.age_total = Some(5.0);
        assert!(matches!(
            validate_layers(&poly, &Minima::default()),
            Err(StandError::StandValidation(_))
        ));
    }

    #[test]
    fn test_start_minima() {
        let mut poly = polygon();
        primary_mut(&mut poly).site.height = Some(4.0);
        assert!(check_mode_minima(&poly, PolygonMode::Start).is_err());
        assert!(check_mode_minima(&poly, PolygonMode::Young).is_ok());

        let mut poly = polygon();
        primary_mut(&mut poly).site.site_index = None;
        let err = check_mode_minima(&poly, PolygonMode::Start).unwrap_err();
        assert!(err.to_string().contains("requires site index"));
    }

    #[test]
    fn test_batc_needs_crown_closure() {
        let poly = polygon();
        assert!(check_mode_minima(&poly, PolygonMode::Batn).is_ok());
        assert!(check_mode_minima(&poly, PolygonMode::Batc).is_err());
    }

    #[test]
    fn test_default_mode() {
        let minima = Minima::default();
        let poly = polygon();
        let mode = find_default_polygon_mode(&poly, &minima, || unreachable!()).unwrap();
        assert_eq!(mode, PolygonMode::Start);

        let mut short = polygon();
        primary_mut(&mut short).site.height = Some(5.0);
        let mode = find_default_polygon_mode(&short, &minima, || Ok(50.0)).unwrap();
        assert_eq!(mode, PolygonMode::Young);

        let mut unmeasured = polygon();
        primary_mut(&mut unmeasured).base_area = None;
        let mode = find_default_polygon_mode(&unmeasured, &minima, || Ok(1.5)).unwrap();
        assert_eq!(mode, PolygonMode::Young);
        let mode = find_default_polygon_mode(&unmeasured, &minima, || Ok(30.0)).unwrap();
        assert_eq!(mode, PolygonMode::Start);
    }

    #[test]
    fn test_complete_site_from_curve() {
        let mut control = ControlMap::new();
        control.site_curves.insert(
            11,
            SiteCurve {
                b: 0.03,
                c: 1.2,
                ytbh_intercept: 2.0,
                ytbh_slope: 100.0,
            },
        );
        control.default_site_curves.insert((Genus::H, Region::Coastal), 11);

        let mut poly = polygon();
        let layer = primary_mut(&mut poly);
        layer.site.years_to_breast_height = None;
        layer.site.height = None;
        layer.site.site_index = Some(20.0);
        layer.site.age_total = Some(57.0);
        complete_site(layer, Region::Coastal, &control).unwrap();

        assert_eq!(layer.site.site_curve, Some(11));
        assert!((layer.site.years_to_breast_height.unwrap() - 7.0).abs() < 1e-5);
        // Breast-height age 50 is the site index base age.
        assert!((layer.site.height.unwrap() - 20.0).abs() < 1e-3);
    }
}
