//! Common result and error types for the pipegen generator.

/// The result type for fallible internal operations.
///
/// `Err` indicates a bug in the generator itself, not a problem with the
/// requested operator parameters. Parameter problems are reported as
/// configuration errors by the crate that validates them.
pub type GenResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in pipegen, not a user input problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal generator error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("register chain out of sync");
        assert_eq!(
            err.to_string(),
            "internal generator error: register chain out of sync"
        );
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
        let r: GenResult<()> = Err(err);
        assert!(r.is_err());
    }
}
