//! Differential testing: hardware simulation against the exact model.

use crate::compare::output_matches;
use crate::error::TestbenchError;
use malachite::Natural;
use pipegen_common::Bits;
use pipegen_core::TestCaseList;
use pipegen_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use pipegen_ir::Operator;
use pipegen_sim::{run_vectors, SimError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One output that the simulated hardware got wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// Position of the test case in its list.
    pub index: usize,
    /// The output port.
    pub port: String,
    /// Width of the output port.
    pub width: u32,
    /// The test case inputs, in port order.
    pub inputs: Vec<(String, Bits)>,
    /// The acceptable values.
    pub expected: Vec<Natural>,
    /// What the hardware produced.
    pub actual: Natural,
}

impl Mismatch {
    fn to_diagnostic(&self, operator: &str) -> Diagnostic {
        let inputs = self
            .inputs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        let expected = self
            .expected
            .iter()
            .map(|v| Bits::new(v.clone(), self.width).to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Diagnostic::error(
            DiagnosticCode::TEST_MISMATCH,
            format!("test case {}: incorrect value on output '{}'", self.index, self.port),
        )
        .for_operator(operator)
        .with_note(format!("inputs: {inputs}"))
        .with_note(format!("expected: {expected}"))
        .with_note(format!(
            "actual: {}",
            Bits::new(self.actual.clone(), self.width)
        ))
    }
}

/// Outcome of a differential run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialReport {
    /// The tested operator.
    pub operator: String,
    /// Number of test cases run.
    pub cases: usize,
    /// Every wrong output, in test order.
    pub mismatches: Vec<Mismatch>,
}

impl DifferentialReport {
    /// Returns `true` if every output of every case was acceptable.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Returns the number of test cases with at least one wrong output.
    pub fn failed_cases(&self) -> usize {
        let mut indices: Vec<usize> = self.mismatches.iter().map(|m| m.index).collect();
        indices.dedup();
        indices.len()
    }
}

/// Streams every test case through the simulated operator, one per cycle,
/// and checks each output `pipeline_depth` cycles later.
///
/// A wrong output does not stop the run: it is recorded in the report and
/// emitted into `sink` as a V001 error carrying the inputs, the expected
/// values and the actual value.
///
/// # Errors
///
/// Fails only if the operator cannot be simulated.
pub fn run_differential(
    op: &Arc<Operator>,
    tests: &TestCaseList,
    sink: &DiagnosticSink,
) -> Result<DifferentialReport, TestbenchError> {
    let vectors: Vec<BTreeMap<String, Natural>> = tests
        .iter()
        .map(|tc| {
            tc.inputs()
                .filter_map(|(name, _, value)| value.map(|v| (name.to_string(), v.clone())))
                .collect()
        })
        .collect();
    let results = run_vectors(op, &vectors)?;

    let mut report = DifferentialReport {
        operator: op.name.clone(),
        cases: tests.len(),
        mismatches: Vec::new(),
    };
    for (index, (tc, actual)) in tests.iter().zip(&results).enumerate() {
        for (port, width, expected) in tc.outputs() {
            let value = actual.get(port).ok_or_else(|| SimError::UnknownPort {
                operator: op.name.clone(),
                port: port.to_string(),
            })?;
            let format = op.output(port).map(|s| s.numeric).unwrap_or_default();
            if output_matches(format, value, expected) {
                continue;
            }
            let mismatch = Mismatch {
                index,
                port: port.to_string(),
                width,
                inputs: tc
                    .inputs()
                    .filter_map(|(name, w, v)| {
                        v.map(|v| (name.to_string(), Bits::new(v.clone(), w)))
                    })
                    .collect(),
                expected: expected.to_vec(),
                actual: value.clone(),
            };
            sink.emit(mismatch.to_diagnostic(&op.name));
            report.mismatches.push(mismatch);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Adder3;
    use crate::generate::{build_test_cases, TestPlan};
    use pipegen_core::{ArithmeticOperator, GenerationContext};

    fn plan() -> TestPlan {
        TestPlan {
            exhaustive: true,
            ..TestPlan::default()
        }
    }

    #[test]
    fn correct_model_passes() {
        let mut ctx = GenerationContext::new();
        let model = Adder3::new(&mut ctx, 0, true);
        let sink = DiagnosticSink::new();
        let tests = build_test_cases(&model, &plan(), &sink).unwrap();
        let report = run_differential(model.operator(), &tests, &sink).unwrap();
        assert_eq!(report.cases, 65);
        assert!(report.passed(), "{:?}", report.mismatches.first());
        assert!(!sink.has_errors());
    }

    #[test]
    fn mismatches_are_counted_not_fatal() {
        let mut ctx = GenerationContext::new();
        let model = Adder3::new(&mut ctx, 1, false);
        let sink = DiagnosticSink::new();
        let tests = build_test_cases(&model, &plan(), &sink).unwrap();
        let report = run_differential(model.operator(), &tests, &sink).unwrap();
        assert_eq!(report.mismatches.len(), 64);
        assert_eq!(report.failed_cases(), 64);
        assert_eq!(sink.error_count(), 64);
    }

    #[test]
    fn mismatch_diagnostic_has_context() {
        let mut ctx = GenerationContext::new();
        let model = Adder3::new(&mut ctx, 1, false);
        let sink = DiagnosticSink::new();
        let tests = build_test_cases(&model, &plan(), &sink).unwrap();
        run_differential(model.operator(), &tests, &sink).unwrap();
        let first = sink
            .diagnostics()
            .into_iter()
            .find(|d| d.code == DiagnosticCode::TEST_MISMATCH)
            .unwrap();
        assert_eq!(first.message, "test case 0: incorrect value on output 'R'");
        assert_eq!(first.operator.as_deref(), Some("Adder3_uid1"));
        assert_eq!(
            first.notes,
            vec![
                "inputs: X=000 Y=000".to_string(),
                "expected: 001".to_string(),
                "actual: 000".to_string(),
            ]
        );
    }
}
