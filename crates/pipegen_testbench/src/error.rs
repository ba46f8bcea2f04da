//! Testbench error types.

use pipegen_common::InternalError;
use pipegen_sim::SimError;

/// Errors that can occur while building or running a test campaign.
///
/// Output mismatches are not errors: they are counted in a
/// [`DifferentialReport`](crate::DifferentialReport) and reported as
/// diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum TestbenchError {
    /// The simulator could not run the operator.
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimError),

    /// A test case was left incomplete by the operator's model.
    #[error("test case {index} of '{operator}' has no expected value for '{port}'")]
    IncompleteTestCase {
        /// Position of the test case in its list.
        index: usize,
        /// The tested operator.
        operator: String,
        /// The output (or input) lacking a value.
        port: String,
    },

    /// Writing a testbench file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generator bug, raised by an operator's model.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_display() {
        let e = TestbenchError::IncompleteTestCase {
            index: 4,
            operator: "FPMult_8_23_uid2".into(),
            port: "R".into(),
        };
        assert_eq!(
            e.to_string(),
            "test case 4 of 'FPMult_8_23_uid2' has no expected value for 'R'"
        );
    }

    #[test]
    fn internal_is_transparent() {
        let e: TestbenchError = InternalError::new("bad model").into();
        assert_eq!(e.to_string(), "internal generator error: bad model");
    }
}
