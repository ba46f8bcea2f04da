//! Errors raised while building and resolving operators.

use pipegen_common::InternalError;
use thiserror::Error;

/// Errors raised while an operator is built or resolved.
///
/// [`GenError::Configuration`] is a user problem: a parameter outside the
/// range an operator supports. Every other variant means the operator's
/// construction code broke a scheduling or typing rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    /// A signal name was declared twice in one operator.
    #[error("signal '{0}' is already declared")]
    DuplicateSignal(String),

    /// A signal name was referenced but never declared.
    #[error("signal '{0}' is not declared")]
    UndeclaredSignal(String),

    /// A signal was read before the cycle of its definition.
    #[error("signal '{signal}' used at cycle {use_cycle} but defined at cycle {decl_cycle}")]
    BackwardsTime {
        /// The signal name.
        signal: String,
        /// Cycle of the read.
        use_cycle: u32,
        /// Cycle of the definition.
        decl_cycle: u32,
    },

    /// Resolution found a read that precedes the definition.
    #[error(
        "pipeline ordering violated: '{signal}' read at cycle {use_cycle}, defined at cycle {decl_cycle}"
    )]
    PipelineOrdering {
        /// The signal name.
        signal: String,
        /// Cycle of the read.
        use_cycle: u32,
        /// Cycle of the definition.
        decl_cycle: u32,
    },

    /// A feedback signal was read more than one cycle before its definition.
    #[error(
        "feedback signal '{signal}' read at cycle {use_cycle} must be defined exactly one cycle later, not at {decl_cycle}"
    )]
    FeedbackDistance {
        /// The signal name.
        signal: String,
        /// Cycle of the read.
        use_cycle: u32,
        /// Cycle of the definition.
        decl_cycle: u32,
    },

    /// A forward-declared signal was never defined.
    #[error("signal '{0}' is never defined")]
    UnresolvedSignal(String),

    /// Combinational assignments form a loop.
    #[error("combinational loop through signal '{0}'")]
    AssignmentCycle(String),

    /// A signal is driven by more than one statement.
    #[error("signal '{0}' has more than one driver")]
    MultipleDrivers(String),

    /// Operand or target widths do not agree.
    #[error("width mismatch in {context}: expected {expected} bits, found {found}")]
    WidthMismatch {
        /// Where the mismatch occurred.
        context: String,
        /// Width required.
        expected: u32,
        /// Width provided.
        found: u32,
    },

    /// A slice selects bits outside its signal.
    #[error("slice ({high} downto {low}) is out of range for '{signal}' of width {width}")]
    SliceOutOfRange {
        /// The sliced signal.
        signal: String,
        /// High index.
        high: u32,
        /// Low index.
        low: u32,
        /// Signal width.
        width: u32,
    },

    /// A port map names a port the child does not have.
    #[error("operator '{operator}' has no port '{port}'")]
    UnknownPort {
        /// The child operator.
        operator: String,
        /// The missing port.
        port: String,
    },

    /// A port of a child operator was left unconnected.
    #[error("port '{port}' of instance '{instance}' is not mapped")]
    UnmappedPort {
        /// The instance label.
        instance: String,
        /// The unmapped port.
        port: String,
    },

    /// An operator parameter is outside its supported range.
    #[error("invalid parameter '{parameter}': {constraint}")]
    Configuration {
        /// The offending parameter.
        parameter: String,
        /// The violated constraint.
        constraint: String,
    },

    /// A generator bug that fits no other variant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl GenError {
    /// Builds a [`GenError::Configuration`].
    pub fn config(parameter: impl Into<String>, constraint: impl Into<String>) -> Self {
        GenError::Configuration {
            parameter: parameter.into(),
            constraint: constraint.into(),
        }
    }

    /// Builds a [`GenError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        GenError::Internal(InternalError::new(message))
    }

    /// Returns `true` for errors caused by user parameters rather than by
    /// operator construction code.
    pub fn is_configuration(&self) -> bool {
        matches!(self, GenError::Configuration { .. })
    }
}

/// Result alias for operator construction.
pub type GenOutcome<T> = Result<T, GenError>;
