//! Building the list of test cases of a campaign.

use crate::error::TestbenchError;
use malachite::Natural;
use pipegen_config::{BenchMode, ResolvedConfig};
use pipegen_core::{ArithmeticOperator, TestCaseList};
use pipegen_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// What a campaign runs, taken from the `[test]` configuration section.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlan {
    /// Seed of the random stimulus generator.
    pub seed: u64,
    /// Number of random test cases.
    pub random_tests: u32,
    /// Enumerate every input combination instead of drawing random ones.
    pub exhaustive: bool,
    /// Largest total input width for which exhaustive testing is accepted.
    pub exhaustive_limit: u32,
    /// Stimulus delivery of the VHDL testbench.
    pub bench: BenchMode,
}

impl Default for TestPlan {
    fn default() -> Self {
        Self {
            seed: 0,
            random_tests: 100,
            exhaustive: false,
            exhaustive_limit: 20,
            bench: BenchMode::Inline,
        }
    }
}

impl TestPlan {
    /// Extracts the test settings of a resolved configuration.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            seed: config.random_seed,
            random_tests: config.number_of_random_tests,
            exhaustive: config.exhaustive,
            exhaustive_limit: config.exhaustive_limit,
            bench: config.bench,
        }
    }
}

/// Builds the test cases of `model` according to `plan`.
///
/// Standard cases come first, followed by either the exhaustive
/// enumeration or the seeded random draws. The same plan always yields the
/// same list. Warnings (no standard cases, exhaustive testing refused) go
/// to `sink`.
///
/// # Errors
///
/// Fails when the model raises an internal error or leaves a test case
/// without an expected output.
pub fn build_test_cases(
    model: &dyn ArithmeticOperator,
    plan: &TestPlan,
    sink: &DiagnosticSink,
) -> Result<TestCaseList, TestbenchError> {
    let op = model.operator();
    let mut tests = TestCaseList::new();
    model.build_standard_test_cases(&mut tests)?;
    if tests.is_empty() {
        sink.emit(
            Diagnostic::warning(
                DiagnosticCode::NO_STANDARD_TESTS,
                "operator provides no standard test cases",
            )
            .for_operator(&op.name),
        );
    }

    let width = op.total_input_width();
    let exhaustive_ok = width <= plan.exhaustive_limit && width < 64;
    if plan.exhaustive && exhaustive_ok {
        add_exhaustive_cases(model, &mut tests)?;
    } else {
        if plan.exhaustive {
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::EXHAUSTIVE_TOO_LARGE,
                    format!("exhaustive testing refused for {width} input bits"),
                )
                .for_operator(&op.name)
                .with_note(format!(
                    "the limit is {} input bits; running {} random tests instead",
                    plan.exhaustive_limit, plan.random_tests
                ))
                .with_help("raise `exhaustive_limit` in the [test] section"),
            );
        }
        let mut rng = StdRng::seed_from_u64(plan.seed);
        for _ in 0..plan.random_tests {
            tests.add(model.build_random_test_case(&mut rng)?);
        }
    }

    check_complete(&op.name, &tests)?;
    Ok(tests)
}

fn add_exhaustive_cases(
    model: &dyn ArithmeticOperator,
    tests: &mut TestCaseList,
) -> Result<(), TestbenchError> {
    let op = model.operator();
    // the first input takes the most significant bits of the counter
    let inputs: Vec<(String, u32)> = op
        .input_signals()
        .map(|s| (s.name.clone(), s.width))
        .collect();
    for n in 0..(1u64 << op.total_input_width()) {
        let mut tc = model.new_test_case();
        let mut rest = n;
        for (name, width) in inputs.iter().rev() {
            tc.set_input(name, Natural::from(rest & ((1u64 << width) - 1)))?;
            rest >>= width;
        }
        model.emulate(&mut tc)?;
        tests.add(tc);
    }
    Ok(())
}

fn check_complete(operator: &str, tests: &TestCaseList) -> Result<(), TestbenchError> {
    for (index, tc) in tests.iter().enumerate() {
        let missing_input = tc
            .inputs()
            .find(|(_, _, v)| v.is_none())
            .map(|(name, _, _)| name);
        let missing_output = tc
            .outputs()
            .find(|(_, _, values)| values.is_empty())
            .map(|(name, _, _)| name);
        if let Some(port) = missing_input.or(missing_output) {
            return Err(TestbenchError::IncompleteTestCase {
                index,
                operator: operator.to_string(),
                port: port.to_string(),
            });
        }
    }
    Ok(())
}
