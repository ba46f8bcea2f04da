//! A complete test campaign for one operator.

use crate::differential::{run_differential, DifferentialReport};
use crate::error::TestbenchError;
use crate::generate::{build_test_cases, TestPlan};
use crate::input_file::test_input;
use crate::vhdl::TestBenchVhdl;
use pipegen_config::BenchMode;
use pipegen_core::{ArithmeticOperator, TestCaseList};
use pipegen_diagnostics::DiagnosticSink;
use pipegen_ir::Operator;
use std::path::Path;
use std::sync::Arc;

/// An operator with its test cases and stimulus delivery mode.
#[derive(Debug, Clone)]
pub struct TestBench {
    op: Arc<Operator>,
    tests: TestCaseList,
    mode: BenchMode,
}

impl TestBench {
    /// Builds the test cases of `model` according to `plan`.
    pub fn generate(
        model: &dyn ArithmeticOperator,
        plan: &TestPlan,
        sink: &DiagnosticSink,
    ) -> Result<Self, TestbenchError> {
        let tests = build_test_cases(model, plan, sink)?;
        Ok(Self::from_tests(Arc::clone(model.operator()), tests, plan.bench))
    }

    /// Wraps an existing list of test cases.
    pub fn from_tests(op: Arc<Operator>, tests: TestCaseList, mode: BenchMode) -> Self {
        Self { op, tests, mode }
    }

    /// Returns the operator under test.
    pub fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    /// Returns the test cases, in application order.
    pub fn tests(&self) -> &TestCaseList {
        &self.tests
    }

    /// Returns the stimulus delivery mode.
    pub fn mode(&self) -> BenchMode {
        self.mode
    }

    /// Returns the VHDL testbench; file-based benches read `input_file`.
    pub fn vhdl(&self, input_file: &str) -> String {
        TestBenchVhdl::new(&self.op, &self.tests, self.mode)
            .with_input_file(input_file)
            .to_string()
    }

    /// Returns the text of the stimulus file.
    pub fn test_input(&self) -> String {
        test_input(&self.tests)
    }

    /// Runs the test cases through the simulator.
    pub fn simulate(&self, sink: &DiagnosticSink) -> Result<DifferentialReport, TestbenchError> {
        run_differential(&self.op, &self.tests, sink)
    }

    /// Writes the testbench to `testbench`, and for file-based benches the
    /// stimulus file to `input`.
    pub fn write_files(&self, testbench: &Path, input: &Path) -> Result<(), TestbenchError> {
        let input_name = input.to_string_lossy();
        std::fs::write(testbench, self.vhdl(&input_name))?;
        if self.mode == BenchMode::File {
            std::fs::write(input, self.test_input())?;
        }
        Ok(())
    }
}
