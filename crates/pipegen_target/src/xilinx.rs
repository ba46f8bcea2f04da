//! Xilinx (AMD) family timing tables.

use crate::device::FamilyTiming;
use crate::Vendor;

/// Family used when the configuration names only the vendor.
pub const DEFAULT_FAMILY: &str = "virtex5";

/// Known Xilinx families.
pub const FAMILIES: &[FamilyTiming] = &[
    FamilyTiming {
        name: "virtex4",
        aliases: &["virtex-4", "virtexiv"],
        vendor: Vendor::Xilinx,
        max_frequency_mhz: 400.0,
        lut_inputs: 4,
        lut_delay: 0.2,
        ff_delay: 0.5,
        carry_setup: 0.4,
        carry_per_bit: 0.035,
        local_wire: 0.45,
        fanout_penalty: 0.03,
        distant_wire: 0.6,
        ram_delay: 2.0,
        ram_bits: 18 * 1024,
        dsp_delay: 2.9,
        dsp_widths: (17, 17),
    },
    FamilyTiming {
        name: "virtex5",
        aliases: &["virtex-5", "virtexv"],
        vendor: Vendor::Xilinx,
        max_frequency_mhz: 500.0,
        lut_inputs: 6,
        lut_delay: 0.09,
        ff_delay: 0.5,
        carry_setup: 0.3,
        carry_per_bit: 0.024,
        local_wire: 0.36,
        fanout_penalty: 0.02,
        distant_wire: 0.5,
        ram_delay: 1.6,
        ram_bits: 36 * 1024,
        dsp_delay: 2.4,
        dsp_widths: (24, 17),
    },
    FamilyTiming {
        name: "virtex6",
        aliases: &["virtex-6", "virtexvi"],
        vendor: Vendor::Xilinx,
        max_frequency_mhz: 550.0,
        lut_inputs: 6,
        lut_delay: 0.06,
        ff_delay: 0.45,
        carry_setup: 0.28,
        carry_per_bit: 0.015,
        local_wire: 0.32,
        fanout_penalty: 0.02,
        distant_wire: 0.45,
        ram_delay: 1.4,
        ram_bits: 36 * 1024,
        dsp_delay: 2.1,
        dsp_widths: (24, 17),
    },
    FamilyTiming {
        name: "kintex7",
        aliases: &["kintex-7"],
        vendor: Vendor::Xilinx,
        max_frequency_mhz: 600.0,
        lut_inputs: 6,
        lut_delay: 0.043,
        ff_delay: 0.4,
        carry_setup: 0.25,
        carry_per_bit: 0.013,
        local_wire: 0.3,
        fanout_penalty: 0.015,
        distant_wire: 0.4,
        ram_delay: 1.3,
        ram_bits: 36 * 1024,
        dsp_delay: 1.9,
        dsp_widths: (24, 17),
    },
    FamilyTiming {
        name: "artix7",
        aliases: &["artix-7"],
        vendor: Vendor::Xilinx,
        max_frequency_mhz: 450.0,
        lut_inputs: 6,
        lut_delay: 0.05,
        ff_delay: 0.45,
        carry_setup: 0.3,
        carry_per_bit: 0.016,
        local_wire: 0.35,
        fanout_penalty: 0.02,
        distant_wire: 0.5,
        ram_delay: 1.6,
        ram_bits: 36 * 1024,
        dsp_delay: 2.3,
        dsp_widths: (24, 17),
    },
];

/// Finds a Xilinx family by name or alias.
pub fn lookup(name: &str) -> Option<&'static FamilyTiming> {
    FAMILIES.iter().find(|t| t.matches(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_alias() {
        assert_eq!(lookup("Virtex-5").map(|t| t.name), Some("virtex5"));
        assert!(lookup("stratix4").is_none());
    }

    #[test]
    fn tables_are_consistent() {
        for t in FAMILIES {
            assert_eq!(t.vendor, Vendor::Xilinx);
            assert!(t.dsp_widths.0 >= t.dsp_widths.1, "{}", t.name);
            assert!(t.ff_delay + t.lut_delay < 1000.0 / t.max_frequency_mhz, "{}", t.name);
        }
    }
}
