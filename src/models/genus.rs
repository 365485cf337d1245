use serde::{Deserialize, Serialize};

use crate::error::StandError;

/// Genus (species group) codes, in canonical dictionary order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Genus {
    AC,
    AT,
    B,
    C,
    D,
    E,
    F,
    H,
    L,
    MB,
    PA,
    PL,
    PW,
    PY,
    S,
    Y,
}

impl Genus {
    pub const ALL: [Genus; 16] = [
        Genus::AC,
        Genus::AT,
        Genus::B,
        Genus::C,
        Genus::D,
        Genus::E,
        Genus::F,
        Genus::H,
        Genus::L,
        Genus::MB,
        Genus::PA,
        Genus::PL,
        Genus::PW,
        Genus::PY,
        Genus::S,
        Genus::Y,
    ];

    pub fn alias(self) -> &'static str {
        match self {
            Genus::AC => "AC",
            Genus::AT => "AT",
            Genus::B => "B",
            Genus::C => "C",
            Genus::D => "D",
            Genus::E => "E",
            Genus::F => "F",
            Genus::H => "H",
            Genus::L => "L",
            Genus::MB => "MB",
            Genus::PA => "PA",
            Genus::PL => "PL",
            Genus::PW => "PW",
            Genus::PY => "PY",
            Genus::S => "S",
            Genus::Y => "Y",
        }
    }

    pub fn is_hardwood(self) -> bool {
        matches!(self, Genus::AC | Genus::AT | Genus::D | Genus::E | Genus::MB)
    }
}

impl std::fmt::Display for Genus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.alias())
    }
}

impl std::str::FromStr for Genus {
    type Err = StandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Genus::ALL
            .iter()
            .copied()
            .find(|g| g.alias() == upper)
            .ok_or_else(|| StandError::Parse(format!("Unknown genus: '{s}'")))
    }
}

impl TryFrom<String> for Genus {
    type Error = StandError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Genus> for String {
    fn from(g: Genus) -> Self {
        g.alias().to_string()
    }
}

/// Maps genus aliases to canonical 1-based index numbers and back.
pub trait SpeciesDictionary {
    fn aliases(&self) -> &[Genus];

    fn index_of(&self, genus: Genus) -> Option<usize> {
        self.aliases().iter().position(|g| *g == genus).map(|i| i + 1)
    }

    fn genus_at(&self, index: usize) -> Option<Genus> {
        index
            .checked_sub(1)
            .and_then(|i| self.aliases().get(i).copied())
    }
}

/// The standard sixteen-genus dictionary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenusDictionary;

impl SpeciesDictionary for GenusDictionary {
    fn aliases(&self) -> &[Genus] {
        &Genus::ALL
    }
}
