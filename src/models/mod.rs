mod genus;
mod layer;
mod polygon;
mod species;
mod utilization;

pub use genus::{Genus, GenusDictionary, SpeciesDictionary};
pub use layer::{HasSite, Layer, LayerType, Site};
pub use polygon::{Polygon, PolygonMode, Region, DEFAULT_PERCENT_AVAILABLE};
pub use species::{EquationGroups, Species, SpeciesRank};
pub use utilization::{
    basal_area, quad_mean_diameter, trees_per_hectare, HasUtilization, UtilizationClass,
    UtilizationSet, UtilizationVector, PI_40K,
};
