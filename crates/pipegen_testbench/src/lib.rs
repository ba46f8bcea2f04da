//! Test campaigns for generated operators.
//!
//! A campaign starts from an [`ArithmeticOperator`](pipegen_core::ArithmeticOperator):
//! [`build_test_cases`] collects its standard corner cases, then random or
//! exhaustive stimuli, each completed by the operator's exact model. The
//! resulting [`TestCaseList`](pipegen_core::TestCaseList) feeds two
//! checkers:
//!
//! - [`run_differential`] replays it through the cycle-accurate simulator
//!   and counts every output outside the acceptable set;
//! - [`TestBenchVhdl`] writes a self-checking VHDL testbench, with the
//!   stimuli inline or streamed from a `test.input` file written by
//!   [`test_input`].
//!
//! [`TestBench`] bundles the three for callers that just want a campaign.

#![warn(missing_docs)]

pub mod bench;
pub mod compare;
pub mod differential;
pub mod error;
pub mod generate;
pub mod input_file;
pub mod vhdl;

pub use bench::TestBench;
pub use compare::{fp_equal, fp_equal_ieee, output_matches};
pub use differential::{run_differential, DifferentialReport, Mismatch};
pub use error::TestbenchError;
pub use generate::{build_test_cases, TestPlan};
pub use input_file::test_input;
pub use vhdl::TestBenchVhdl;
