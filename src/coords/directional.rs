// src/coords/directional.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TabpipeError;

/// Compass hemisphere indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directional {
    #[serde(alias = "n", alias = "North", alias = "NORTH", alias = "north")]
    N,
    #[serde(alias = "s", alias = "South", alias = "SOUTH", alias = "south")]
    S,
    #[serde(alias = "e", alias = "East", alias = "EAST", alias = "east")]
    E,
    #[serde(alias = "w", alias = "West", alias = "WEST", alias = "west")]
    W,
}

impl Directional {
    /// West and south point at the negative half of the axis.
    pub fn is_negative(self) -> bool {
        matches!(self, Directional::W | Directional::S)
    }
}

impl FromStr for Directional {
    type Err = TabpipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "N" | "n" | "North" | "NORTH" | "north" => Ok(Directional::N),
            "S" | "s" | "South" | "SOUTH" | "south" => Ok(Directional::S),
            "E" | "e" | "East" | "EAST" | "east" => Ok(Directional::E),
            "W" | "w" | "West" | "WEST" | "west" => Ok(Directional::W),
            other => Err(TabpipeError::Parse(format!(
                "{other:?} is not a valid directional (expected one of N, S, E, W)"
            ))),
        }
    }
}

impl fmt::Display for Directional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Directional::N => "N",
            Directional::S => "S",
            Directional::E => "E",
            Directional::W => "W",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        for (text, expected) in [
            ("N", Directional::N),
            ("north", Directional::N),
            ("SOUTH", Directional::S),
            ("e", Directional::E),
            (" West ", Directional::W),
        ] {
            assert_eq!(text.parse::<Directional>().unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn rejects_unknown_text() {
        let err = "Q".parse::<Directional>().unwrap_err();
        assert!(matches!(err, TabpipeError::Parse(_)));
        assert!("Nord".parse::<Directional>().is_err());
    }
}
