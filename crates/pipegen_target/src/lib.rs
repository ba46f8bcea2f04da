//! FPGA cost models consumed by the pipeline scheduler.
//!
//! This crate provides the [`Target`] trait, the only view the generator has
//! of the hardware it generates for: clock frequency, pipelining flags, and
//! pure functions from sizes to delays in nanoseconds (LUT, adder, comparator,
//! wires, DSP blocks, block RAM), plus sizing hints such as how many adder
//! bits fit in one pipeline stage.
//!
//! # Usage
//!
//! ```
//! use pipegen_target::{load_target, TargetOptions};
//!
//! let target = load_target("xilinx", Some("virtex5"), 400.0, TargetOptions::default()).unwrap();
//! assert_eq!(target.lut_inputs(), 6);
//! assert!(target.suggest_subadd_size(64) < 64);
//! ```
//!
//! Concrete families are described by constant [`FamilyTiming`] tables and
//! served by a single [`DeviceTarget`] implementation.

#![warn(missing_docs)]

pub mod device;
pub mod error;
pub mod intel;
pub mod xilinx;

pub use device::{DeviceTarget, FamilyTiming};
pub use error::TargetError;

use pipegen_common::Frequency;
use serde::{Deserialize, Serialize};
use std::fmt;

/// FPGA vendors with known families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    /// AMD/Xilinx devices.
    Xilinx,
    /// Intel/Altera devices.
    Intel,
}

impl Vendor {
    /// Parses a vendor name, accepting the historical aliases.
    pub fn parse(name: &str) -> Option<Vendor> {
        match name.trim().to_ascii_lowercase().as_str() {
            "xilinx" | "amd" => Some(Vendor::Xilinx),
            "intel" | "altera" => Some(Vendor::Intel),
            _ => None,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Xilinx => write!(f, "Xilinx"),
            Vendor::Intel => write!(f, "Altera"),
        }
    }
}

/// Generation flags that travel with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOptions {
    /// Insert pipeline registers; when false every operator is combinatorial.
    pub pipeline: bool,
    /// Guard every register with a `ce` clock-enable input.
    pub clock_enable: bool,
    /// Guard every register with an internal `stall_s` signal.
    pub recirculation: bool,
    /// Allow DSP blocks for multiplications.
    pub use_hard_multipliers: bool,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            pipeline: true,
            clock_enable: false,
            recirculation: false,
            use_hard_multipliers: true,
        }
    }
}

/// The cost model of an FPGA family at a given frequency.
///
/// All delays are in nanoseconds and depend only on their arguments and the
/// chosen family; implementations hold no mutable state.
pub trait Target: fmt::Debug + Send + Sync {
    /// Returns the vendor.
    fn vendor(&self) -> Vendor;

    /// Returns the canonical family name (e.g., "virtex5").
    fn family(&self) -> &str;

    /// Returns the target clock frequency.
    fn frequency(&self) -> Frequency;

    /// Returns the target clock frequency in MHz.
    fn frequency_mhz(&self) -> f64 {
        self.frequency().mhz()
    }

    /// Returns the clock period in nanoseconds.
    fn period(&self) -> f64 {
        self.frequency().period_ns()
    }

    /// Returns the target frequency relative to the family's practical maximum.
    fn normalized_frequency(&self) -> f64;

    /// Returns whether operators are pipelined.
    fn is_pipelined(&self) -> bool;

    /// Returns whether registers carry a clock enable.
    fn use_clock_enable(&self) -> bool;

    /// Returns whether registers are guarded by a stall signal.
    fn has_recirculation(&self) -> bool;

    /// Returns whether DSP blocks may be used for multiplication.
    fn use_hard_multipliers(&self) -> bool;

    /// Returns the number of LUT inputs.
    fn lut_inputs(&self) -> u32;

    /// Returns the delay of one LUT.
    fn lut_delay(&self) -> f64;

    /// Returns the register overhead (clock-to-output plus setup).
    fn ff_delay(&self) -> f64;

    /// Returns the per-bit delay of the carry chain.
    fn carry_propagate_delay(&self) -> f64;

    /// Returns the delay of an `n`-bit carry-propagate addition.
    fn adder_delay(&self, n: u32) -> f64;

    /// Returns the delay of an `n`-bit equality comparison.
    fn eq_comparator_delay(&self, n: u32) -> f64;

    /// Returns the delay of a local net driving `fanout` loads.
    fn local_wire_delay(&self, fanout: u32) -> f64;

    /// Returns the delay of a net spanning `n` logic blocks.
    fn distant_wire_delay(&self, n: u32) -> f64;

    /// Returns the access delay of a block RAM.
    fn ram_delay(&self) -> f64;

    /// Returns the number of bits in one block RAM.
    fn size_of_memory_block(&self) -> u64;

    /// Returns the delay of a DSP multiplier.
    fn dsp_multiplier_delay(&self) -> f64;

    /// Returns the unsigned operand widths of one DSP multiplier, largest first.
    fn dsp_widths(&self) -> (u32, u32);

    /// Returns the largest chunk of an addition that fits in one clock period.
    ///
    /// The result is in `1..=w` (`w` itself when the whole addition fits or
    /// when the target is not pipelined).
    fn suggest_subadd_size(&self, w: u32) -> u32 {
        self.suggest_slack_subadd_size(w, 0.0)
    }

    /// Like [`suggest_subadd_size`](Target::suggest_subadd_size), for a stage
    /// whose first `slack` nanoseconds are already consumed.
    fn suggest_slack_subadd_size(&self, w: u32, slack: f64) -> u32;

    /// Returns the tile sizes used to split an `wx` by `wy` multiplication.
    fn suggest_submult_size(&self, wx: u32, wy: u32) -> (u32, u32) {
        let (dx, dy) = self.dsp_widths();
        if self.use_hard_multipliers() {
            if wx >= wy {
                (dx.min(wx), dy.min(wy))
            } else {
                (dy.min(wx), dx.min(wy))
            }
        } else {
            let lut = self.lut_inputs() / 2;
            (lut.min(wx).max(1), lut.min(wy).max(1))
        }
    }
}

/// Creates the cost model of a family at `frequency_mhz`.
///
/// `family` may be omitted to get the vendor's default family (Virtex-5 for
/// Xilinx, Stratix IV for Intel).
///
/// # Errors
///
/// Returns [`TargetError`] for an unknown vendor or family, or a
/// non-positive frequency.
pub fn load_target(
    vendor: &str,
    family: Option<&str>,
    frequency_mhz: f64,
    options: TargetOptions,
) -> Result<Box<dyn Target>, TargetError> {
    let vendor_id = Vendor::parse(vendor).ok_or_else(|| TargetError::UnknownVendor(vendor.to_string()))?;
    if !frequency_mhz.is_finite() || frequency_mhz <= 0.0 {
        return Err(TargetError::InvalidFrequency(frequency_mhz));
    }
    let timing = match vendor_id {
        Vendor::Xilinx => xilinx::lookup(family.unwrap_or(xilinx::DEFAULT_FAMILY)),
        Vendor::Intel => intel::lookup(family.unwrap_or(intel::DEFAULT_FAMILY)),
    }
    .ok_or_else(|| TargetError::UnknownFamily {
        vendor: vendor_id,
        family: family.unwrap_or_default().to_string(),
    })?;
    Ok(Box::new(DeviceTarget::new(
        timing,
        Frequency::from_mhz(frequency_mhz),
        options,
    )))
}

/// Lists `(vendor, family)` pairs of every known family.
pub fn known_families() -> Vec<(Vendor, &'static str)> {
    let mut all: Vec<(Vendor, &'static str)> = xilinx::FAMILIES
        .iter()
        .map(|t| (Vendor::Xilinx, t.name))
        .collect();
    all.extend(intel::FAMILIES.iter().map(|t| (Vendor::Intel, t.name)));
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_default_families() {
        let x = load_target("Xilinx", None, 400.0, TargetOptions::default()).unwrap();
        assert_eq!(x.family(), "virtex5");
        let i = load_target("altera", None, 300.0, TargetOptions::default()).unwrap();
        assert_eq!(i.family(), "stratix4");
        assert_eq!(i.vendor(), Vendor::Intel);
    }

    #[test]
    fn load_rejects_unknown() {
        assert!(matches!(
            load_target("lattice", None, 100.0, TargetOptions::default()),
            Err(TargetError::UnknownVendor(_))
        ));
        assert!(matches!(
            load_target("xilinx", Some("spartan3"), 100.0, TargetOptions::default()),
            Err(TargetError::UnknownFamily { .. })
        ));
        assert!(matches!(
            load_target("xilinx", None, 0.0, TargetOptions::default()),
            Err(TargetError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn period_follows_frequency() {
        let t = load_target("xilinx", Some("kintex7"), 250.0, TargetOptions::default()).unwrap();
        assert!((t.period() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn options_are_reported() {
        let opts = TargetOptions {
            pipeline: false,
            clock_enable: true,
            recirculation: true,
            use_hard_multipliers: false,
        };
        let t = load_target("intel", Some("cyclone5"), 100.0, opts).unwrap();
        assert!(!t.is_pipelined());
        assert!(t.use_clock_enable());
        assert!(t.has_recirculation());
        assert!(!t.use_hard_multipliers());
    }

    #[test]
    fn submult_follows_dsp_or_luts() {
        let t = load_target("xilinx", Some("virtex5"), 400.0, TargetOptions::default()).unwrap();
        assert_eq!(t.suggest_submult_size(53, 53), (24, 17));
        assert_eq!(t.suggest_submult_size(10, 30), (10, 24));
        let soft = TargetOptions {
            use_hard_multipliers: false,
            ..TargetOptions::default()
        };
        let t = load_target("xilinx", Some("virtex5"), 400.0, soft).unwrap();
        assert_eq!(t.suggest_submult_size(53, 53), (3, 3));
    }

    #[test]
    fn every_family_is_listed_once() {
        let all = known_families();
        assert_eq!(all.len(), xilinx::FAMILIES.len() + intel::FAMILIES.len());
        assert!(all.contains(&(Vendor::Intel, "stratix2")));
    }
}
