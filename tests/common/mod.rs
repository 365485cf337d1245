#![allow(dead_code)]

use std::path::{Path, PathBuf};

use stand_yield_estimator::coefficients::{
    Coefficients, ComponentSizeLimits, ControlMap, NonprimaryHeightCoefficients, SiteCurve,
    StockingFactor, UpperBounds,
};
use stand_yield_estimator::models::{
    EquationGroups, Genus, Layer, LayerType, Polygon, Region, Site, Species, UtilizationClass,
};

const GENERA: [Genus; 3] = [Genus::H, Genus::S, Genus::AC];

/// A small coastal control map covering hemlock, spruce and cottonwood in the
/// CWH zone, with one equation group for everything.
pub fn control() -> ControlMap {
    let mut c = ControlMap::new();
    let region = Region::Coastal;
    let bec = || "CWH".to_string();

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
            match uc {
                UtilizationClass::U75To125 => {
                    c.basal_area_by_utilization
                        .insert((uc, genus, bec()), Coefficients::new([0.9, 0.967]));
                    c.dq_by_utilization
                        .insert((uc, genus, bec()), Coefficients::new([5.0, -0.3, 1.0, 0.0]));
                }
                UtilizationClass::Over225 => {
                    c.dq_by_utilization
                        .insert((uc, genus, bec()), Coefficients::new([20.0, 0.05, -1.0, 1.0]));
                }
                _ => {
                    let a0 = if uc == UtilizationClass::U125To175 { -0.265 } else { -1.595 };
                    c.basal_area_by_utilization
                        .insert((uc, genus, bec()), Coefficients::new([a0, 0.1]));
                    c.dq_by_utilization
                        .insert((uc, genus, bec()), Coefficients::new([-1.5, 0.5, 1.0, 0.0]));
                }
            }
        }
        c.net_decay_waste
            .insert(genus, Coefficients::new([-1.0, 2.0, -4.0, 0.1, 0.1, 0.5]));
        c.basal_area_yield.insert(
            (bec(), genus),
            Coefficients::new([1.0, 0.0, 5.0, 1.0, 0.0, 0.0, 0.0]),
        );
        c.dq_yield
            .insert((bec(), genus), Coefficients::new([5.0, 3.0, 0.0, 0.5, 0.0]));
        c.veteran_basal_area
            .insert((genus, region), Coefficients::new([0.1, 10.0, 1.0]));
        c.veteran_dq
            .insert((genus, region), Coefficients::new([20.0, 0.5, 1.0]));
        c.veteran_volume_adjust.insert(genus, Coefficients::zero());
        c.equation_groups.insert(
            (genus, bec()),
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

pub fn primary_layer() -> Layer {
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

pub fn veteran_layer() -> Layer {
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

pub fn polygon(id: &str) -> Polygon {
    let mut polygon = Polygon::new(id, "CWH");
    polygon.percent_available = Some(100.0);
    polygon.layers.insert(LayerType::Primary, primary_layer());
    polygon
}

pub fn polygon_with_veteran(id: &str) -> Polygon {
    let mut polygon = polygon(id);
    polygon.layers.insert(LayerType::Veteran, veteran_layer());
    polygon
}

/// Write the control map as JSON into `dir`.
pub fn write_control(dir: &Path) -> PathBuf {
    let path = dir.join("control.json");
    std::fs::write(&path, serde_json::to_string(&control()).unwrap()).unwrap();
    path
}

/// Polygon input in the flat CSV layout: P1 with a veteran layer, P2 with
/// density left to the yield estimators, P3 too short to process.
pub const POLYGONS_CSV: &str = "\
polygon_id,bec_zone,layer,genus,percent,age_total,years_to_breast_height,height,site_index,site_curve,crown_closure,base_area,trees_per_hectare,percent_available,mode,yield_factor,stocking_class
P1,CWH,P,H,70,60,7,24,22,11,,40,800,100,,,
P1,CWH,P,S,30,,,,,,,,,,,,
P1,CWH,V,H,100,200,4,40,30,11,10,,,,,,
P2,CWH,P,H,100,60,7,24,22,11,,,,100,start,0.5,
P3,CWH,P,H,100,60,7,3,22,11,,40,800,100,,,
";

pub fn write_polygons_csv(dir: &Path) -> PathBuf {
    let path = dir.join("polygons.csv");
    std::fs::write(&path, POLYGONS_CSV).unwrap();
    path
}
