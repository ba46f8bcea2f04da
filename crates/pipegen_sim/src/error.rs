//! Simulation error types.

use pipegen_common::InternalError;

/// Errors that can occur while building or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A port name that the operator does not have.
    #[error("operator '{operator}' has no port '{port}'")]
    UnknownPort {
        /// The simulated operator.
        operator: String,
        /// The requested port.
        port: String,
    },

    /// A stimulus value wider than its input port.
    #[error("value {value} does not fit the {width} bits of input '{port}'")]
    ValueTooWide {
        /// The input port.
        port: String,
        /// Port width in bits.
        width: u32,
        /// The rejected value, in decimal.
        value: String,
    },

    /// Undelayed reads form a cycle, so the statements cannot be ordered.
    #[error("combinational loop in '{operator}' through '{signal}'")]
    CombinationalLoop {
        /// The simulated operator.
        operator: String,
        /// A signal on the loop.
        signal: String,
    },

    /// A read through more registers than the signal's chain holds.
    #[error("tap {delay} of '{signal}' is beyond its {lifespan}-register chain")]
    TapOutOfRange {
        /// The read signal.
        signal: String,
        /// Requested register index.
        delay: u32,
        /// Chain length.
        lifespan: u32,
    },

    /// A generator bug surfaced during simulation.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_port_display() {
        let e = SimError::UnknownPort {
            operator: "FPAdd_8_23_uid2".into(),
            port: "Z".into(),
        };
        assert_eq!(e.to_string(), "operator 'FPAdd_8_23_uid2' has no port 'Z'");
    }

    #[test]
    fn loop_display() {
        let e = SimError::CombinationalLoop {
            operator: "Acc".into(),
            signal: "s".into(),
        };
        assert_eq!(e.to_string(), "combinational loop in 'Acc' through 's'");
    }

    #[test]
    fn tap_display() {
        let e = SimError::TapOutOfRange {
            signal: "x".into(),
            delay: 3,
            lifespan: 2,
        };
        assert_eq!(e.to_string(), "tap 3 of 'x' is beyond its 2-register chain");
    }
}
