//! Resolution of a parsed configuration into the flat generator settings.

use crate::error::ConfigError;
use crate::types::{BenchMode, GeneratorConfig, OperatorConfig, OutputSection};
use pipegen_common::{AccuracyMode, Frequency};

/// Fully resolved generator settings.
///
/// Strings from the file are parsed into typed values (frequency, accuracy)
/// and cross-field constraints are checked. Operator parameters stay optional
/// here; each operator validates the ones it needs when it is built.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The operator name and its raw parameters.
    pub operator: OperatorConfig,
    /// Exponent width, if given.
    pub exponent_width: Option<u32>,
    /// Fraction width, if given.
    pub mantissa_width: Option<u32>,
    /// Target clock frequency in MHz.
    pub target_frequency_mhz: f64,
    /// FPGA vendor name, lower-cased.
    pub vendor: String,
    /// Device family, lower-cased, if given.
    pub family: Option<String>,
    /// Whether operators are pipelined.
    pub pipeline: bool,
    /// Whether registers are guarded by a clock enable.
    pub clock_enable: bool,
    /// Whether registers are guarded by a stall signal.
    pub recirculation: bool,
    /// Requested accuracy of rounding operators.
    pub accuracy_mode: AccuracyMode,
    /// Seed of the random test generator.
    pub random_seed: u64,
    /// Number of random test cases.
    pub number_of_random_tests: u32,
    /// Testbench stimulus strategy.
    pub bench: BenchMode,
    /// Whether to enumerate all inputs.
    pub exhaustive: bool,
    /// Input-bit limit for exhaustive testing.
    pub exhaustive_limit: u32,
    /// Output file locations.
    pub output: OutputSection,
}

/// Resolves a parsed configuration.
pub fn resolve_config(config: &GeneratorConfig) -> Result<ResolvedConfig, ConfigError> {
    let frequency: Frequency = config
        .target
        .frequency
        .parse()
        .map_err(|e: pipegen_common::ParseFrequencyError| {
            ConfigError::invalid("target.frequency", e.to_string())
        })?;

    let accuracy_mode = match &config.operator.accuracy {
        Some(text) => text
            .parse::<AccuracyMode>()
            .map_err(|e| ConfigError::invalid("operator.accuracy", e))?,
        None => AccuracyMode::default(),
    };

    for (port, delay) in &config.operator.input_delays {
        if !delay.is_finite() || *delay < 0.0 {
            return Err(ConfigError::invalid(
                &format!("operator.input_delays.{port}"),
                "delay must be a non-negative number of nanoseconds",
            ));
        }
    }

    if config.test.exhaustive && config.test.exhaustive_limit > 32 {
        return Err(ConfigError::invalid(
            "test.exhaustive_limit",
            "at most 32 input bits can be enumerated",
        ));
    }

    Ok(ResolvedConfig {
        operator: config.operator.clone(),
        exponent_width: config.operator.exponent_width,
        mantissa_width: config.operator.mantissa_width,
        target_frequency_mhz: frequency.mhz(),
        vendor: config.target.vendor.trim().to_ascii_lowercase(),
        family: config
            .target
            .family
            .as_ref()
            .map(|f| f.trim().to_ascii_lowercase()),
        pipeline: config.target.pipeline,
        clock_enable: config.target.clock_enable,
        recirculation: config.target.recirculation,
        accuracy_mode,
        random_seed: config.test.seed,
        number_of_random_tests: config.test.random_tests,
        bench: config.test.bench,
        exhaustive: config.test.exhaustive,
        exhaustive_limit: config.test.exhaustive_limit,
        output: config.output.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn resolve_defaults() {
        let config = load_config_from_str("[operator]\nname = \"FPAdd\"\nwe = 8\nwf = 23\n").unwrap();
        let resolved = resolve_config(&config).unwrap();
        assert_eq!(resolved.exponent_width, Some(8));
        assert_eq!(resolved.mantissa_width, Some(23));
        assert_eq!(resolved.target_frequency_mhz, 400.0);
        assert_eq!(resolved.vendor, "xilinx");
        assert_eq!(resolved.accuracy_mode, AccuracyMode::CorrectlyRounded);
        assert_eq!(resolved.number_of_random_tests, 100);
    }

    #[test]
    fn resolve_normalizes_target() {
        let config = load_config_from_str(
            r#"
[operator]
name = "FPMult"
accuracy = "faithful"

[target]
vendor = "Intel"
family = "StratixIV"
frequency = "0.3GHz"
"#,
        )
        .unwrap();
        let resolved = resolve_config(&config).unwrap();
        assert_eq!(resolved.vendor, "intel");
        assert_eq!(resolved.family.as_deref(), Some("stratixiv"));
        assert!((resolved.target_frequency_mhz - 300.0).abs() < 1e-9);
        assert_eq!(resolved.accuracy_mode, AccuracyMode::Faithful);
    }

    #[test]
    fn bad_frequency_rejected() {
        let config =
            load_config_from_str("[operator]\nname = \"X\"\n[target]\nfrequency = \"fast\"\n")
                .unwrap();
        let err = resolve_config(&config).unwrap_err();
        assert!(err.to_string().contains("target.frequency"));
    }

    #[test]
    fn bad_accuracy_rejected() {
        let config =
            load_config_from_str("[operator]\nname = \"X\"\naccuracy = \"exact\"\n").unwrap();
        assert!(matches!(
            resolve_config(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn negative_delay_rejected() {
        let config = load_config_from_str(
            "[operator]\nname = \"X\"\n[operator.input_delays]\nX = -1.0\n",
        )
        .unwrap();
        assert!(resolve_config(&config).is_err());
    }
}
