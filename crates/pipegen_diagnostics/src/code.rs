//! Diagnostic codes with category prefixes for structured identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Error diagnostics, prefixed with `E`.
    Error,
    /// Warning diagnostics, prefixed with `W`.
    Warning,
    /// Pipeline scheduling and timing diagnostics, prefixed with `T`.
    Timing,
    /// Test-run verification diagnostics, prefixed with `V`.
    Verification,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Timing => 'T',
            Category::Verification => 'V',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g., `E001`, `W001`, `V001`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// An operator could not be generated (bad parameters or a generator bug).
    pub const GENERATION_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 1);
    /// The configuration file could not be loaded or validated.
    pub const INVALID_CONFIG: DiagnosticCode = DiagnosticCode::new(Category::Error, 2);
    /// An operator provides no standard test cases.
    pub const NO_STANDARD_TESTS: DiagnosticCode = DiagnosticCode::new(Category::Warning, 1);
    /// An exhaustive test was requested for an operator with too many input bits.
    pub const EXHAUSTIVE_TOO_LARGE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 2);
    /// A single delay exceeded the clock period and was admitted whole.
    pub const PERIOD_OVERRUN: DiagnosticCode = DiagnosticCode::new(Category::Timing, 1);
    /// Pipeline summary of a finished operator.
    pub const PIPELINE_REPORT: DiagnosticCode = DiagnosticCode::new(Category::Timing, 2);
    /// Simulated hardware output disagrees with the emulated reference.
    pub const TEST_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Verification, 1);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Error.prefix(), 'E');
        assert_eq!(Category::Warning.prefix(), 'W');
        assert_eq!(Category::Timing.prefix(), 'T');
        assert_eq!(Category::Verification.prefix(), 'V');
    }

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::GENERATION_FAILED.to_string(), "E001");
        assert_eq!(DiagnosticCode::NO_STANDARD_TESTS.to_string(), "W001");
        assert_eq!(DiagnosticCode::PIPELINE_REPORT.to_string(), "T002");
        assert_eq!(DiagnosticCode::TEST_MISMATCH.to_string(), "V001");
        assert_eq!(DiagnosticCode::new(Category::Timing, 42).to_string(), "T042");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::TEST_MISMATCH;
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
