//! Clock frequencies with unit parsing, display, and period conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A clock frequency stored in Hertz.
///
/// Parses strings like "400MHz", "250 mhz", "1GHz", and bare numbers (Hz).
/// The scheduler only ever consumes the clock period, see [`Frequency::period_ns`].
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Creates a frequency from a value in megahertz.
    pub fn from_mhz(mhz: f64) -> Self {
        Self(mhz * 1_000_000.0)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }

    /// Returns the clock period in nanoseconds.
    pub fn period_ns(&self) -> f64 {
        1e9 / self.0
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000_000_000.0 {
            write!(f, "{}GHz", hz / 1_000_000_000.0)
        } else if hz >= 1_000_000.0 {
            write!(f, "{}MHz", hz / 1_000_000.0)
        } else if hz >= 1_000.0 {
            write!(f, "{}KHz", hz / 1_000.0)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();
        let (number, scale) = if let Some(n) = lower.strip_suffix("ghz") {
            (n, 1e9)
        } else if let Some(n) = lower.strip_suffix("mhz") {
            (n, 1e6)
        } else if let Some(n) = lower.strip_suffix("khz") {
            (n, 1e3)
        } else if let Some(n) = lower.strip_suffix("hz") {
            (n, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };
        let value: f64 = number.trim().parse().map_err(|_| err())?;
        if !value.is_finite() || value <= 0.0 {
            return Err(err());
        }
        Ok(Frequency(value * scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mhz() {
        let f: Frequency = "400MHz".parse().unwrap();
        assert_eq!(f.hz(), 400_000_000.0);
        assert_eq!(f.mhz(), 400.0);
    }

    #[test]
    fn parse_with_space_and_case() {
        let f: Frequency = "250 mhz".parse().unwrap();
        assert_eq!(f.mhz(), 250.0);
    }

    #[test]
    fn parse_bare_number_is_hz() {
        let f: Frequency = "100000000".parse().unwrap();
        assert_eq!(f.mhz(), 100.0);
    }

    #[test]
    fn reject_zero_and_garbage() {
        assert!("0MHz".parse::<Frequency>().is_err());
        assert!("fast".parse::<Frequency>().is_err());
        assert!("-3MHz".parse::<Frequency>().is_err());
    }

    #[test]
    fn period_of_400mhz_is_2_5ns() {
        let f = Frequency::from_mhz(400.0);
        assert!((f.period_ns() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn display_selects_unit() {
        assert_eq!(Frequency::from_mhz(400.0).to_string(), "400MHz");
        assert_eq!(Frequency::new(1.5e9).to_string(), "1.5GHz");
        assert_eq!(Frequency::new(500.0).to_string(), "500Hz");
    }
}
