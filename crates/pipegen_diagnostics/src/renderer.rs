//! Diagnostic rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[V001]: test 12: output R mismatch
///   --> FPAdd_8_23_uid2
///    = note: expected 0100111111...
///    = help: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let code = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Note => "36",
            Severity::Help => "32",
        };
        format!("\x1b[1;{code}m{text}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();

        let header = format!("{}[{}]", diag.severity, diag.code);
        out.push_str(&format!(
            "{}: {}\n",
            self.paint(diag.severity, &header),
            diag.message
        ));

        if let Some(operator) = &diag.operator {
            out.push_str(&format!("  --> {operator}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as one line of JSON.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        match serde_json::to_string(diag) {
            Ok(json) => json + "\n",
            Err(e) => format!("{{\"error\":\"unserializable diagnostic: {e}\"}}\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;

    #[test]
    fn render_error_with_operator() {
        let diag = Diagnostic::error(DiagnosticCode::TEST_MISMATCH, "test 3: output R mismatch")
            .for_operator("FPAdd_8_23_uid2")
            .with_note("expected 0101, got 0100");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("error[V001]: test 3: output R mismatch"));
        assert!(output.contains("--> FPAdd_8_23_uid2"));
        assert!(output.contains("= note: expected 0101, got 0100"));
    }

    #[test]
    fn render_without_operator_has_no_arrow() {
        let diag = Diagnostic::warning(DiagnosticCode::NO_STANDARD_TESTS, "no standard tests")
            .with_help("add corner cases");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.starts_with("warning[W001]: no standard tests"));
        assert!(!output.contains("-->"));
        assert!(output.contains("= help: add corner cases"));
    }

    #[test]
    fn color_wraps_header_only() {
        let diag = Diagnostic::error(DiagnosticCode::GENERATION_FAILED, "bad");
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;31merror[E001]\x1b[0m: bad"));
    }

    #[test]
    fn json_is_one_parseable_line() {
        let diag = Diagnostic::note(DiagnosticCode::PIPELINE_REPORT, "Pipeline depth = 2")
            .for_operator("IntAdder_64_uid1");
        let line = JsonRenderer.render(&diag);
        assert_eq!(line.matches('\n').count(), 1);
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["message"], "Pipeline depth = 2");
        assert_eq!(value["operator"], "IntAdder_64_uid1");
        assert_eq!(value["severity"], "Note");
    }
}
