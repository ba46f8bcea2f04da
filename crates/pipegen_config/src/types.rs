//! Configuration types deserialized from `pipegen.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level generator configuration parsed from `pipegen.toml`.
///
/// ```toml
/// [operator]
/// name = "FPAdd"
/// we = 8
/// wf = 23
///
/// [target]
/// vendor = "xilinx"
/// family = "virtex5"
/// frequency = "400MHz"
///
/// [test]
/// seed = 42
/// random_tests = 1000
/// bench = "file"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratorConfig {
    /// The operator to generate and its numeric parameters.
    #[serde(default)]
    pub operator: OperatorConfig,
    /// The FPGA target and clock settings.
    #[serde(default)]
    pub target: TargetSection,
    /// Test generation settings.
    #[serde(default)]
    pub test: TestSection,
    /// Output file locations.
    #[serde(default)]
    pub output: OutputSection,
}

/// The operator to generate, by registry name, with its parameters.
///
/// Each operator reads only the parameters it needs. Widths accept the short
/// aliases used on the command line (`we`, `wf`, `win`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Registry name of the operator (e.g., "FPAdd", "IntAdder").
    #[serde(default)]
    pub name: String,
    /// Exponent width of the floating-point input format.
    #[serde(default, alias = "we")]
    pub exponent_width: Option<u32>,
    /// Fraction width of the floating-point input format.
    #[serde(default, alias = "wf")]
    pub mantissa_width: Option<u32>,
    /// Exponent width of the output format, when it differs from the input.
    #[serde(default, alias = "weout")]
    pub output_exponent_width: Option<u32>,
    /// Fraction width of the output format, when it differs from the input.
    #[serde(default, alias = "wfout")]
    pub output_mantissa_width: Option<u32>,
    /// Width of an integer input.
    #[serde(default, alias = "win")]
    pub input_width: Option<u32>,
    /// Width of a second integer input (multipliers).
    #[serde(default, alias = "winy")]
    pub input_width_y: Option<u32>,
    /// Width of an integer output (tables).
    #[serde(default, alias = "wout")]
    pub output_width: Option<u32>,
    /// Largest shift amount a shifter must support.
    #[serde(default, alias = "maxshift")]
    pub max_shift: Option<u32>,
    /// Shift direction: "left" or "right".
    #[serde(default, alias = "dir")]
    pub direction: Option<String>,
    /// Leading-digit kind counted by LZOC operators: "zero", "one", or "dynamic".
    #[serde(default)]
    pub count: Option<String>,
    /// Weight of the most significant accumulator bit.
    #[serde(default, alias = "msba")]
    pub msb_acc: Option<i32>,
    /// Weight of the least significant accumulator bit.
    #[serde(default, alias = "lsba")]
    pub lsb_acc: Option<i32>,
    /// Weight of the most significant bit of the largest expected input.
    #[serde(default, alias = "maxmsbx")]
    pub max_msb_in: Option<i32>,
    /// Rounding accuracy: "correctly_rounded" or "faithful".
    #[serde(default)]
    pub accuracy: Option<String>,
    /// Degree of an evaluated polynomial.
    #[serde(default)]
    pub degree: Option<u32>,
    /// Width of each polynomial coefficient, sign included.
    #[serde(default, alias = "wcoeff")]
    pub coefficient_width: Option<u32>,
    /// Weight of the least significant coefficient bit.
    #[serde(default, alias = "lsbcoeff")]
    pub coefficient_lsb: Option<i32>,
    /// Weight of the least significant output bit.
    #[serde(default, alias = "lsbout")]
    pub output_lsb: Option<i32>,
    /// Arrival delay of each input port in nanoseconds.
    #[serde(default)]
    pub input_delays: BTreeMap<String, f64>,
}

/// The FPGA target section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetSection {
    /// Vendor name ("xilinx" or "intel").
    pub vendor: String,
    /// Device family; the vendor's default family when absent.
    pub family: Option<String>,
    /// Target clock frequency (e.g., "400MHz").
    pub frequency: String,
    /// Whether to pipeline the generated operators.
    pub pipeline: bool,
    /// Whether every register is guarded by a clock-enable input.
    pub clock_enable: bool,
    /// Whether every register is guarded by an internal stall signal.
    pub recirculation: bool,
}

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            vendor: "xilinx".to_string(),
            family: None,
            frequency: "400MHz".to_string(),
            pipeline: true,
            clock_enable: false,
            recirculation: false,
        }
    }
}

/// Test generation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestSection {
    /// Seed of the random test generator.
    pub seed: u64,
    /// Number of random test cases.
    pub random_tests: u32,
    /// How the VHDL testbench delivers stimuli.
    pub bench: BenchMode,
    /// Enumerate every input combination instead of random tests.
    pub exhaustive: bool,
    /// Refuse exhaustive testing above this many total input bits.
    pub exhaustive_limit: u32,
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            seed: 0,
            random_tests: 100,
            bench: BenchMode::Inline,
            exhaustive: false,
            exhaustive_limit: 20,
        }
    }
}

/// Stimulus delivery strategy of the generated VHDL testbench.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BenchMode {
    /// Stimuli and checks written inline in the testbench body.
    #[default]
    Inline,
    /// Stimuli and expected values read from a companion `test.input` file.
    File,
}

/// Output file locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Path of the generated VHDL design.
    pub vhdl: String,
    /// Path of the generated VHDL testbench.
    pub testbench: String,
    /// Path of the stimulus file for file-based testbenches.
    pub test_input: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            vhdl: "pipegen.vhdl".to_string(),
            testbench: "pipegen_tb.vhdl".to_string(),
            test_input: "test.input".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn aliases_fill_widths() {
        let config = load_config_from_str(
            r#"
[operator]
name = "FPAdd"
we = 5
wf = 10
"#,
        )
        .unwrap();
        assert_eq!(config.operator.exponent_width, Some(5));
        assert_eq!(config.operator.mantissa_width, Some(10));
    }

    #[test]
    fn bench_mode_variants() {
        for (input, expected) in [("inline", BenchMode::Inline), ("file", BenchMode::File)] {
            let toml = format!(
                r#"
[operator]
name = "IntAdder"
win = 16

[test]
bench = "{input}"
"#
            );
            let config = load_config_from_str(&toml).unwrap();
            assert_eq!(config.test.bench, expected);
        }
    }

    #[test]
    fn input_delays_table() {
        let config = load_config_from_str(
            r#"
[operator]
name = "IntAdder"
win = 32

[operator.input_delays]
X = 0.5
Y = 1.25
"#,
        )
        .unwrap();
        assert_eq!(config.operator.input_delays["Y"], 1.25);
    }

    #[test]
    fn section_defaults() {
        let config = load_config_from_str("[operator]\nname = \"Shifter\"\n").unwrap();
        assert_eq!(config.target.vendor, "xilinx");
        assert!(config.target.pipeline);
        assert_eq!(config.test.random_tests, 100);
        assert_eq!(config.output.test_input, "test.input");
    }

    #[test]
    fn unknown_operator_field_rejected() {
        let toml = "[operator]\nname = \"FPAdd\"\nwidht = 3\n";
        assert!(load_config_from_str(toml).is_err());
    }
}
