//! Errors raised when selecting a target.

use crate::Vendor;

/// Errors that can occur when creating a target cost model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TargetError {
    /// The vendor name is not recognized.
    #[error("unknown vendor '{0}' (expected xilinx or intel)")]
    UnknownVendor(String),

    /// The family name is not known for this vendor.
    #[error("unknown {vendor} family '{family}'")]
    UnknownFamily {
        /// The vendor that was searched.
        vendor: Vendor,
        /// The rejected family name.
        family: String,
    },

    /// The frequency is not a positive number.
    #[error("target frequency must be positive, got {0} MHz")]
    InvalidFrequency(f64),
}
