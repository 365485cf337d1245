//! Primary species selection and inventory type group classification.

use std::cmp::Ordering;

use crate::coefficients::ControlMap;
use crate::error::StandError;
use crate::models::{Genus, Species};

/// Genus pairs reported as a single species, the larger share absorbing the smaller.
const COMBINED_GENERA: [[Genus; 2]; 2] = [[Genus::PA, Genus::PL], [Genus::C, Genus::Y]];

/// Percent above which a primary species makes the stand pure.
const PURE_STAND_PERCENT: f32 = 79.999;

/// The primary and (if any) secondary species of a layer, largest share first.
///
/// Pine (PA/PL) and cedar (C/Y) pairs are combined before ranking; the member
/// with the larger share carries the combined percent.
pub fn find_primary_species(species: &[Species]) -> Result<Vec<Species>, StandError> {
    if species.is_empty() {
        return Err(StandError::IllegalArgument(
            "cannot find primary species of an empty layer".to_string(),
        ));
    }
    let mut combined: Vec<Species> = species.to_vec();

    for [first, second] in COMBINED_GENERA {
        let a = combined.iter().position(|s| s.genus == first);
        let b = combined.iter().position(|s| s.genus == second);
        if let (Some(a), Some(b)) = (a, b) {
            let total = combined[a].percent_genus + combined[b].percent_genus;
            let (keep, drop) = if combined[a].percent_genus >= combined[b].percent_genus {
                (a, b)
            } else {
                (b, a)
            };
            combined[keep] = combined[keep].with_percent(total);
            combined.remove(drop);
        }
    }

    combined.sort_by(|x, y| {
        y.percent_genus
            .partial_cmp(&x.percent_genus)
            .unwrap_or(Ordering::Equal)
            .then(x.genus.cmp(&y.genus))
    });
    combined.truncate(2);
    Ok(combined)
}

/// Inventory type group of a single-genus stand.
fn pure_stand_itg(genus: Genus) -> u32 {
    match genus {
        Genus::F => 1,
        Genus::C | Genus::Y => 9,
        Genus::H => 12,
        Genus::B => 18,
        Genus::S => 21,
        Genus::PW => 27,
        Genus::PL | Genus::PA => 28,
        Genus::PY => 32,
        Genus::L => 34,
        Genus::AC => 36,
        Genus::D => 38,
        Genus::MB => 39,
        Genus::E => 40,
        Genus::AT => 42,
    }
}

/// Inventory type group (1-42) from the primary and secondary species.
pub fn find_itg(primary: &Species, secondary: Option<&Species>) -> Result<u32, StandError> {
    if primary.percent_genus > PURE_STAND_PERCENT {
        return Ok(pure_stand_itg(primary.genus));
    }
    let Some(secondary) = secondary else {
        return Err(StandError::IllegalArgument(format!(
            "single species {} at {}% cannot be classified",
            primary.genus, primary.percent_genus
        )));
    };

    use Genus::*;
    let s = secondary.genus;
    let hardwood = s.is_hardwood();
    let itg = match primary.genus {
        F => match s {
            C | Y => 2,
            B | H => 3,
            S => 4,
            PL | PA => 5,
            PY => 6,
            L | PW => 7,
            _ => 8,
        },
        C | Y => match s {
            H | B | S => 11,
            _ => 10,
        },
        H => match s {
            C | Y => 14,
            B => 15,
            S => 16,
            _ if hardwood => 17,
            _ => 13,
        },
        B => match s {
            C | Y | H => 19,
            _ => 20,
        },
        S => match s {
            C | Y | H => 23,
            B => 24,
            PL => 25,
            _ if hardwood => 26,
            _ => 22,
        },
        PW => 27,
        PL | PA => match s {
            PL | PA => 28,
            F | PW | L | PY => 29,
            _ if hardwood => 31,
            _ => 30,
        },
        PY => 32,
        L => match s {
            F => 33,
            _ => 34,
        },
        AC => {
            if hardwood {
                36
            } else {
                35
            }
        }
        D => {
            if hardwood {
                38
            } else {
                37
            }
        }
        MB => 39,
        E => 40,
        AT => {
            if hardwood {
                42
            } else {
                41
            }
        }
    };
    Ok(itg)
}

/// Basal-area equation group of the primary species, after inventory type
/// group replacement.
pub fn find_base_area_group(
    control: &ControlMap,
    genus: Genus,
    bec: &str,
    itg: u32,
) -> Result<u32, StandError> {
    let default_group = control.equation_groups(genus, bec)?.basal_area;
    Ok(control.modified_basal_area_group(default_group, itg))
}
