//! Fixed-width bit-vector literals backed by arbitrary-precision naturals.
//!
//! Hardware values in the generator (constants in the IR, stimulus and
//! expected outputs in test cases, simulated register contents) are unsigned
//! bit patterns of a known width. [`Bits`] pairs a [`Natural`] with its width
//! and keeps the value masked to that width at all times.

use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::base::num::basic::traits::{One, Zero};
use malachite::base::num::logic::traits::BitAccess;
use malachite::Natural;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// An unsigned bit pattern of a fixed width.
///
/// Bit 0 is the least significant bit. The binary rendering used by
/// [`Display`](fmt::Display) puts the most significant bit first, matching
/// VHDL string literals.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bits {
    width: u32,
    value: Natural,
}

/// Returns `value mod 2^width`.
pub fn mask(value: &Natural, width: u32) -> Natural {
    let modulus = Natural::power_of_2(u64::from(width));
    value % modulus
}

/// Returns `2^width - 1`.
pub fn all_ones(width: u32) -> Natural {
    Natural::power_of_2(u64::from(width)) - Natural::ONE
}

impl Bits {
    /// Creates a bit pattern, truncating `value` to `width` bits.
    pub fn new(value: Natural, width: u32) -> Self {
        let value = mask(&value, width);
        Self { width, value }
    }

    /// Creates an all-zero pattern.
    pub fn zero(width: u32) -> Self {
        Self {
            width,
            value: Natural::ZERO,
        }
    }

    /// Creates an all-one pattern.
    pub fn ones(width: u32) -> Self {
        Self {
            width,
            value: all_ones(width),
        }
    }

    /// Creates a pattern from a `u64`, truncated to `width` bits.
    pub fn from_u64(value: u64, width: u32) -> Self {
        Self::new(Natural::from(value), width)
    }

    /// Creates a single-bit pattern.
    pub fn from_bool(bit: bool) -> Self {
        Self::from_u64(u64::from(bit), 1)
    }

    /// Returns the width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the value as a natural number.
    pub fn value(&self) -> &Natural {
        &self.value
    }

    /// Consumes the pattern and returns its value.
    pub fn into_value(self) -> Natural {
        self.value
    }

    /// Returns bit `index` (false beyond the width).
    pub fn bit(&self, index: u32) -> bool {
        index < self.width && self.value.get_bit(u64::from(index))
    }

    /// Returns the value as a `u64` if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        u64::try_from(&self.value).ok()
    }

    /// Returns `true` if every bit is zero.
    pub fn is_zero(&self) -> bool {
        self.value == Natural::ZERO
    }

    /// Extracts bits `high` down to `low` (inclusive) as a new pattern.
    ///
    /// # Panics
    ///
    /// Panics if `high < low` or `high >= self.width()`.
    pub fn slice(&self, high: u32, low: u32) -> Bits {
        assert!(
            high >= low && high < self.width,
            "slice ({high} downto {low}) out of range for width {}",
            self.width
        );
        Bits::new(&self.value >> u64::from(low), high - low + 1)
    }

    /// Concatenates patterns, the first element landing in the most
    /// significant position.
    pub fn concat(parts: &[Bits]) -> Bits {
        let mut value = Natural::ZERO;
        let mut width = 0u32;
        for part in parts {
            value = (value << u64::from(part.width)) + &part.value;
            width += part.width;
        }
        Bits { width, value }
    }

    /// Parses a binary string such as `"0110"` (most significant bit first).
    ///
    /// Returns `None` on any character other than `0` or `1`.
    pub fn from_binary_str(s: &str) -> Option<Bits> {
        let mut value = Natural::ZERO;
        for c in s.chars() {
            let bit = match c {
                '0' => 0u32,
                '1' => 1u32,
                _ => return None,
            };
            value = (value << 1u64) + Natural::from(bit);
        }
        Some(Bits {
            width: s.len() as u32,
            value,
        })
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            f.write_str(if self.bit(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({}'b{self})", self.width)
    }
}

impl Serialize for Bits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Bits::from_binary_str(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid bit string '{text}'")))
    }
}
