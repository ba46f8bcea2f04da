//! Table-driven implementation of [`Target`].

use crate::{Target, TargetOptions, Vendor};
use pipegen_common::Frequency;

/// Timing characteristics of one FPGA family, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FamilyTiming {
    /// Canonical family name.
    pub name: &'static str,
    /// Alternative spellings accepted on input.
    pub aliases: &'static [&'static str],
    /// Vendor of the family.
    pub vendor: Vendor,
    /// Practical maximum frequency in MHz.
    pub max_frequency_mhz: f64,
    /// Number of LUT inputs.
    pub lut_inputs: u32,
    /// Delay through one LUT.
    pub lut_delay: f64,
    /// Register clock-to-output plus setup.
    pub ff_delay: f64,
    /// Delay to enter the carry chain from a LUT.
    pub carry_setup: f64,
    /// Carry delay per bit.
    pub carry_per_bit: f64,
    /// Local routing delay for a single load.
    pub local_wire: f64,
    /// Extra local routing delay per additional load.
    pub fanout_penalty: f64,
    /// Routing delay per logic block crossed.
    pub distant_wire: f64,
    /// Block RAM access delay.
    pub ram_delay: f64,
    /// Bits per block RAM.
    pub ram_bits: u64,
    /// DSP multiplier delay.
    pub dsp_delay: f64,
    /// Unsigned DSP operand widths, largest first.
    pub dsp_widths: (u32, u32),
}

impl FamilyTiming {
    /// Returns `true` if `name` designates this family.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// A family's timing table at a chosen frequency.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    timing: &'static FamilyTiming,
    frequency: Frequency,
    options: TargetOptions,
}

impl DeviceTarget {
    /// Creates a target from a timing table.
    pub fn new(timing: &'static FamilyTiming, frequency: Frequency, options: TargetOptions) -> Self {
        Self {
            timing,
            frequency,
            options,
        }
    }

    /// Returns the underlying timing table.
    pub fn timing(&self) -> &FamilyTiming {
        self.timing
    }
}

impl Target for DeviceTarget {
    fn vendor(&self) -> Vendor {
        self.timing.vendor
    }

    fn family(&self) -> &str {
        self.timing.name
    }

    fn frequency(&self) -> Frequency {
        self.frequency
    }

    fn normalized_frequency(&self) -> f64 {
        self.frequency.mhz() / self.timing.max_frequency_mhz
    }

    fn is_pipelined(&self) -> bool {
        self.options.pipeline
    }

    fn use_clock_enable(&self) -> bool {
        self.options.clock_enable
    }

    fn has_recirculation(&self) -> bool {
        self.options.recirculation
    }

    fn use_hard_multipliers(&self) -> bool {
        self.options.use_hard_multipliers
    }

    fn lut_inputs(&self) -> u32 {
        self.timing.lut_inputs
    }

    fn lut_delay(&self) -> f64 {
        self.timing.lut_delay
    }

    fn ff_delay(&self) -> f64 {
        self.timing.ff_delay
    }

    fn carry_propagate_delay(&self) -> f64 {
        self.timing.carry_per_bit
    }

    fn adder_delay(&self, n: u32) -> f64 {
        let t = self.timing;
        t.lut_delay + t.carry_setup + f64::from(n) * t.carry_per_bit
    }

    fn eq_comparator_delay(&self, n: u32) -> f64 {
        // First level compares k/2 bit pairs per LUT, then a k-ary AND tree.
        let k = self.timing.lut_inputs.max(2);
        let mut remaining = n.max(1).div_ceil(k / 2);
        let mut levels = 1;
        while remaining > 1 {
            remaining = remaining.div_ceil(k);
            levels += 1;
        }
        f64::from(levels) * (self.timing.lut_delay + self.timing.local_wire)
    }

    fn local_wire_delay(&self, fanout: u32) -> f64 {
        self.timing.local_wire + f64::from(fanout.saturating_sub(1)) * self.timing.fanout_penalty
    }

    fn distant_wire_delay(&self, n: u32) -> f64 {
        f64::from(n) * self.timing.distant_wire
    }

    fn ram_delay(&self) -> f64 {
        self.timing.ram_delay
    }

    fn size_of_memory_block(&self) -> u64 {
        self.timing.ram_bits
    }

    fn dsp_multiplier_delay(&self) -> f64 {
        self.timing.dsp_delay
    }

    fn dsp_widths(&self) -> (u32, u32) {
        self.timing.dsp_widths
    }

    fn suggest_slack_subadd_size(&self, w: u32, slack: f64) -> u32 {
        if !self.is_pipelined() || w == 0 {
            return w.max(1);
        }
        let t = self.timing;
        let budget = self.period() - slack - t.ff_delay - t.lut_delay - t.carry_setup;
        if budget <= 0.0 {
            return 1;
        }
        let bits = (budget / t.carry_per_bit).floor();
        if bits >= f64::from(w) {
            w
        } else {
            (bits as u32).max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xilinx;

    fn virtex5(mhz: f64) -> DeviceTarget {
        let timing = xilinx::lookup("virtex5").unwrap();
        DeviceTarget::new(timing, Frequency::from_mhz(mhz), TargetOptions::default())
    }

    #[test]
    fn adder_delay_grows_with_width() {
        let t = virtex5(400.0);
        assert!(t.adder_delay(64) > t.adder_delay(32));
        let per_bit = t.adder_delay(33) - t.adder_delay(32);
        assert!((per_bit - t.carry_propagate_delay()).abs() < 1e-12);
    }

    #[test]
    fn subadd_chunk_fits_period() {
        let t = virtex5(400.0);
        let chunk = t.suggest_subadd_size(256);
        assert!(chunk >= 1 && chunk < 256);
        assert!(t.ff_delay() + t.adder_delay(chunk) <= t.period());
        assert!(t.ff_delay() + t.adder_delay(chunk + 1) > t.period());
    }

    #[test]
    fn slack_shrinks_chunk() {
        let t = virtex5(400.0);
        assert!(t.suggest_slack_subadd_size(256, 1.0) < t.suggest_subadd_size(256));
        assert_eq!(t.suggest_slack_subadd_size(256, 100.0), 1);
    }

    #[test]
    fn low_frequency_fits_whole_adder() {
        let t = virtex5(50.0);
        assert_eq!(t.suggest_subadd_size(64), 64);
    }

    #[test]
    fn combinatorial_target_never_splits() {
        let timing = xilinx::lookup("virtex5").unwrap();
        let opts = TargetOptions {
            pipeline: false,
            ..TargetOptions::default()
        };
        let t = DeviceTarget::new(timing, Frequency::from_mhz(900.0), opts);
        assert_eq!(t.suggest_subadd_size(512), 512);
    }

    #[test]
    fn comparator_levels() {
        let t = virtex5(400.0);
        let one_level = t.lut_delay() + t.local_wire_delay(1);
        assert!((t.eq_comparator_delay(3) - one_level).abs() < 1e-12);
        assert!((t.eq_comparator_delay(18) - 2.0 * one_level).abs() < 1e-12);
    }

    #[test]
    fn fanout_penalty_applies() {
        let t = virtex5(400.0);
        assert!(t.local_wire_delay(10) > t.local_wire_delay(1));
    }

    #[test]
    fn normalized_frequency_relative_to_max() {
        let t = virtex5(250.0);
        assert!((t.normalized_frequency() - 0.5).abs() < 1e-12);
    }
}
