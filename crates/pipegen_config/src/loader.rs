//! Configuration file loading, command-line overrides, and validation.

use crate::error::ConfigError;
use crate::types::{BenchMode, GeneratorConfig};
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "pipegen.toml";

/// Loads and validates `pipegen.toml` from a directory.
pub fn load_config(dir: &Path) -> Result<GeneratorConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<GeneratorConfig, ConfigError> {
    let config: GeneratorConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present.
fn validate_config(config: &GeneratorConfig) -> Result<(), ConfigError> {
    if config.operator.name.is_empty() {
        return Err(ConfigError::MissingField("operator.name".to_string()));
    }
    Ok(())
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a number")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("'{value}' is not a boolean"))),
    }
}

impl GeneratorConfig {
    /// Applies a single `key=value` override, as given on the command line.
    ///
    /// Keys are case-insensitive and accept the same aliases as the file
    /// (`we`, `wf`, `win`, ...). Target and test settings are reachable as
    /// `frequency`, `vendor`, `seed`, and so on.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let op = &mut self.operator;
        let lower = key.trim().to_ascii_lowercase();
        match lower.as_str() {
            "name" | "operator" => op.name = value.to_string(),
            "we" | "exponent_width" => op.exponent_width = Some(parse_num(key, value)?),
            "wf" | "mantissa_width" => op.mantissa_width = Some(parse_num(key, value)?),
            "weout" | "output_exponent_width" => {
                op.output_exponent_width = Some(parse_num(key, value)?)
            }
            "wfout" | "output_mantissa_width" => {
                op.output_mantissa_width = Some(parse_num(key, value)?)
            }
            "win" | "input_width" => op.input_width = Some(parse_num(key, value)?),
            "winy" | "input_width_y" => op.input_width_y = Some(parse_num(key, value)?),
            "wout" | "output_width" => op.output_width = Some(parse_num(key, value)?),
            "maxshift" | "max_shift" => op.max_shift = Some(parse_num(key, value)?),
            "dir" | "direction" => op.direction = Some(value.to_string()),
            "count" => op.count = Some(value.to_string()),
            "msba" | "msb_acc" => op.msb_acc = Some(parse_num(key, value)?),
            "lsba" | "lsb_acc" => op.lsb_acc = Some(parse_num(key, value)?),
            "maxmsbx" | "max_msb_in" => op.max_msb_in = Some(parse_num(key, value)?),
            "accuracy" => op.accuracy = Some(value.to_string()),
            "degree" => op.degree = Some(parse_num(key, value)?),
            "wcoeff" | "coefficient_width" => op.coefficient_width = Some(parse_num(key, value)?),
            "lsbcoeff" | "coefficient_lsb" => op.coefficient_lsb = Some(parse_num(key, value)?),
            "lsbout" | "output_lsb" => op.output_lsb = Some(parse_num(key, value)?),
            "vendor" => self.target.vendor = value.to_string(),
            "family" | "target" => self.target.family = Some(value.to_string()),
            "frequency" => self.target.frequency = value.to_string(),
            "pipeline" => self.target.pipeline = parse_bool(key, value)?,
            "clock_enable" | "ce" => self.target.clock_enable = parse_bool(key, value)?,
            "recirculation" => self.target.recirculation = parse_bool(key, value)?,
            "seed" => self.test.seed = parse_num(key, value)?,
            "random_tests" | "tests" => self.test.random_tests = parse_num(key, value)?,
            "exhaustive" => self.test.exhaustive = parse_bool(key, value)?,
            "bench" => {
                self.test.bench = match value.trim().to_ascii_lowercase().as_str() {
                    "inline" => BenchMode::Inline,
                    "file" => BenchMode::File,
                    _ => return Err(ConfigError::invalid(key, "expected 'inline' or 'file'")),
                }
            }
            "outputfile" | "vhdl" => self.output.vhdl = value.to_string(),
            _ => {
                if lower.starts_with("delay.") {
                    let port = key.trim()["delay.".len()..].to_string();
                    op.input_delays.insert(port, parse_num(key, value)?);
                } else {
                    return Err(ConfigError::UnknownParameter(key.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Applies a list of `key=value` arguments in order.
    pub fn apply_overrides<'a>(
        &mut self,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                ConfigError::invalid(arg, "expected a parameter of the form key=value")
            })?;
            self.apply_override(key, value)?;
        }
        validate_config(self)
    }
}
