//! Rounding accuracy requested from an arithmetic operator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How close an operator's result must be to the exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyMode {
    /// Round to nearest, ties to even: error at most half an ulp, one legal answer.
    #[default]
    CorrectlyRounded,
    /// Either neighbour of the exact value: error below one ulp, up to two legal answers.
    Faithful,
}

impl AccuracyMode {
    /// Returns `true` for [`AccuracyMode::CorrectlyRounded`].
    pub fn is_correct(self) -> bool {
        self == AccuracyMode::CorrectlyRounded
    }
}

impl fmt::Display for AccuracyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccuracyMode::CorrectlyRounded => write!(f, "correctly_rounded"),
            AccuracyMode::Faithful => write!(f, "faithful"),
        }
    }
}

impl FromStr for AccuracyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "correctly_rounded" | "correct" | "cr" => Ok(AccuracyMode::CorrectlyRounded),
            "faithful" | "faithful_rounding" | "fr" => Ok(AccuracyMode::Faithful),
            other => Err(format!("unknown accuracy mode '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!("cr".parse(), Ok(AccuracyMode::CorrectlyRounded));
        assert_eq!("Faithful".parse(), Ok(AccuracyMode::Faithful));
        assert!("exact".parse::<AccuracyMode>().is_err());
    }

    #[test]
    fn display_matches_serde_name() {
        let json = serde_json::to_string(&AccuracyMode::Faithful).unwrap();
        assert_eq!(json, format!("\"{}\"", AccuracyMode::Faithful));
    }

    #[test]
    fn default_is_correct() {
        assert!(AccuracyMode::default().is_correct());
    }
}
