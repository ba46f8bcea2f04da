//! Shared foundational types used across the pipegen operator generator.
//!
//! This crate provides frequencies, fixed-width bit-vector literals backed by
//! arbitrary-precision naturals, content hashing for generated artifacts,
//! the accuracy mode of arithmetic operators, integer logarithm helpers, and
//! common result types.

#![warn(missing_docs)]

pub mod accuracy;
pub mod bits;
pub mod frequency;
pub mod hash;
pub mod intlog;
pub mod result;

pub use accuracy::AccuracyMode;
pub use bits::Bits;
pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::ContentHash;
pub use intlog::{ceil_log2, intlog2};
pub use result::{GenResult, InternalError};

/// Re-export of the arbitrary-precision natural used for bit patterns.
pub use malachite::Natural;
