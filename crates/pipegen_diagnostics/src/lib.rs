//! Diagnostic creation, severity management, and multi-format rendering.
//!
//! This crate is the generator's reporting channel. Operators and test runs
//! emit structured [`Diagnostic`] messages (warnings about missing test
//! coverage, scheduling notes, verification mismatches) into a thread-safe
//! [`DiagnosticSink`], and [`DiagnosticRenderer`] implementations format them
//! for the terminal or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
