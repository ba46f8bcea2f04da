//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `pipegen.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A command-line override names a parameter the generator does not know.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// A configuration value failed validation.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("operator.name".to_string());
        assert_eq!(err.to_string(), "missing required field: operator.name");
    }

    #[test]
    fn display_invalid_value() {
        let err = ConfigError::invalid("target.frequency", "invalid frequency: 'fast'");
        assert_eq!(
            err.to_string(),
            "invalid value for 'target.frequency': invalid frequency: 'fast'"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(err.to_string().starts_with("failed to read configuration:"));
    }
}
