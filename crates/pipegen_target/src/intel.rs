//! Intel (Altera) family timing tables.

use crate::device::FamilyTiming;
use crate::Vendor;

/// Family used when the configuration names only the vendor.
pub const DEFAULT_FAMILY: &str = "stratix4";

/// Known Intel families.
pub const FAMILIES: &[FamilyTiming] = &[
    FamilyTiming {
        name: "stratix2",
        aliases: &["stratixii", "stratix-ii"],
        vendor: Vendor::Intel,
        max_frequency_mhz: 400.0,
        lut_inputs: 6,
        lut_delay: 0.35,
        ff_delay: 0.6,
        carry_setup: 0.4,
        carry_per_bit: 0.05,
        local_wire: 0.4,
        fanout_penalty: 0.03,
        distant_wire: 0.6,
        ram_delay: 2.5,
        ram_bits: 4 * 1024,
        dsp_delay: 2.5,
        dsp_widths: (18, 18),
    },
    FamilyTiming {
        name: "stratix4",
        aliases: &["stratixiv", "stratix-iv"],
        vendor: Vendor::Intel,
        max_frequency_mhz: 600.0,
        lut_inputs: 6,
        lut_delay: 0.3,
        ff_delay: 0.45,
        carry_setup: 0.3,
        carry_per_bit: 0.03,
        local_wire: 0.35,
        fanout_penalty: 0.02,
        distant_wire: 0.5,
        ram_delay: 1.9,
        ram_bits: 9 * 1024,
        dsp_delay: 2.2,
        dsp_widths: (18, 18),
    },
    FamilyTiming {
        name: "cyclone5",
        aliases: &["cyclonev", "cyclone-v", "cyclone_v"],
        vendor: Vendor::Intel,
        max_frequency_mhz: 350.0,
        lut_inputs: 6,
        lut_delay: 0.4,
        ff_delay: 0.6,
        carry_setup: 0.4,
        carry_per_bit: 0.05,
        local_wire: 0.5,
        fanout_penalty: 0.03,
        distant_wire: 0.7,
        ram_delay: 2.8,
        ram_bits: 10 * 1024,
        dsp_delay: 3.0,
        dsp_widths: (27, 27),
    },
];

/// Finds an Intel family by name or alias.
pub fn lookup(name: &str) -> Option<&'static FamilyTiming> {
    FAMILIES.iter().find(|t| t.matches(name))
}
