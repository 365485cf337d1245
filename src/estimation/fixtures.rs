//! Synthetic coefficients and polygons shared by the pipeline tests.

use crate::coefficients::{
    Coefficients, ComponentSizeLimits, ControlMap, NonprimaryHeightCoefficients, SiteCurve,
    StockingFactor, UpperBounds,
};
use crate::models::{
    EquationGroups, Genus, Layer, LayerType, Polygon, Region, Site, Species, UtilizationClass,
};

const GENERA: [Genus; 3] = [Genus::H, Genus::S, Genus::AC];

pub(crate) fn control() -> ControlMap {
    let mut c = ControlMap::new();
    let region = Region::Coastal;

    for genus in GENERA {
        c.primary_height
            .insert((genus, region), Coefficients::new([0.9, 0.0, 0.0]));
        for other in GENERA {
            c.nonprimary_height.insert(
                (genus, other, region),
                NonprimaryHeightCoefficients {
                    equation_index: 2,
                    c1: 0.95,
                    c2: 1.0,
                },
            );
        }
        c.species_dq.insert(genus, Coefficients::zero());
        c.component_size_limits.insert(
            (genus, region),
            ComponentSizeLimits {
                lorey_height_maximum: 60.0,
                quad_mean_diameter_maximum: 200.0,
                min_dq_to_lorey_height_ratio: 0.1,
                max_dq_to_lorey_height_ratio: 5.0,
            },
        );
        for uc in UtilizationClass::BANDS {
            let ba = match uc {
                UtilizationClass::U75To125 => [0.9, 0.967],
                UtilizationClass::U125To175 => [-0.265, 0.1],
                _ => [-1.595, 0.1],
            };
            let dq = match uc {
                UtilizationClass::U75To125 => [5.0, -0.3, 1.0, 0.0],
                UtilizationClass::Over225 => [20.0, 0.05, -1.0, 1.0],
                _ => [-1.5, 0.5, 1.0, 0.0],
            };
            if uc != UtilizationClass::Over225 {
                c.basal_area_by_utilization
                    .insert((uc, genus, "CWH".to_string()), Coefficients::new(ba));
            }
            c.dq_by_utilization
                .insert((uc, genus, "CWH".to_string()), Coefficients::new(dq));
        }
        c.net_decay_waste
            .insert(genus, Coefficients::new([-1.0, 2.0, -4.0, 0.1, 0.1, 0.5]));
        c.basal_area_yield.insert(
            ("CWH".to_string(), genus),
            Coefficients::new([1.0, 0.0, 5.0, 1.0, 0.0, 0.0, 0.0]),
        );
        c.dq_yield.insert(
            ("CWH".to_string(), genus),
            Coefficients::new([5.0, 3.0, 0.0, 0.5, 0.0]),
        );
        c.veteran_basal_area
            .insert((genus, region), Coefficients::new([0.1, 10.0, 1.0]));
        c.veteran_dq
            .insert((genus, region), Coefficients::new([20.0, 0.5, 1.0]));
        c.veteran_volume_adjust.insert(genus, Coefficients::zero());
        c.equation_groups.insert(
            (genus, "CWH".to_string()),
            EquationGroups {
                volume: 1,
                decay: 1,
                breakage: 1,
                basal_area: 1,
            },
        );
        c.default_site_curves.insert((genus, region), 11);
    }

    c.total_stand_whole_stem_volume.insert(
        1,
        Coefficients::new([-9.5, 1.9, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
    );
    for uc in UtilizationClass::BANDS {
        c.whole_stem_volume_by_utilization
            .insert((uc, 1), Coefficients::new([-1.0, 0.8, 0.2, 0.0]));
        c.close_utilization_volume
            .insert((uc, 1), Coefficients::new([-2.0, 0.3, 0.05]));
        c.net_decay_volume
            .insert((uc, 1), Coefficients::new([3.0, -0.1, 0.0]));
    }
    c.net_breakage
        .insert(1, Coefficients::new([-5.0, 3.5, 1.0, 10.0]));
    c.upper_bounds.insert(
        1,
        UpperBounds {
            basal_area: 100.0,
            quad_mean_diameter: 60.0,
        },
    );
    c.stocking_class_factors.insert(
        ('R', region),
        StockingFactor {
            factor: 0.5,
            percent: 60.0,
        },
    );
    c.site_curves.insert(
        11,
        SiteCurve {
            b: 0.03,
            c: 1.2,
            ytbh_intercept: 2.0,
            ytbh_slope: 100.0,
        },
    );
    c
}

pub(crate) fn primary_layer() -> Layer {
    let mut layer = Layer::new(LayerType::Primary);
    layer.site = Site {
        age_total: Some(60.0),
        years_to_breast_height: Some(7.0),
        height: Some(24.0),
        site_index: Some(22.0),
        site_curve: Some(11),
    };
    layer.base_area = Some(40.0);
    layer.trees_per_hectare = Some(800.0);
    layer.species = vec![Species::new(Genus::H, 70.0), Species::new(Genus::S, 30.0)];
    layer
}

pub(crate) fn veteran_layer() -> Layer {
    let mut layer = Layer::new(LayerType::Veteran);
    layer.site = Site {
        age_total: Some(200.0),
        years_to_breast_height: Some(4.0),
        height: Some(40.0),
        site_index: Some(30.0),
        site_curve: Some(11),
    };
    layer.crown_closure = Some(10.0);
    layer.species = vec![Species::new(Genus::H, 100.0)];
    layer
}

pub(crate) fn polygon() -> Polygon {
    let mut polygon = Polygon::new("082F081 1234", "CWH");
    polygon.percent_available = Some(100.0);
    polygon.layers.insert(LayerType::Primary, primary_layer());
    polygon
}

pub(crate) fn polygon_with_veteran() -> Polygon {
    let mut polygon = polygon();
    polygon.layers.insert(LayerType::Veteran, veteran_layer());
    polygon
}
