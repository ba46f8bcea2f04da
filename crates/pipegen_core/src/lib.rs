//! The operator composition engine.
//!
//! An operator is generated by a plain function that drives an
//! [`OperatorBuilder`]: it declares ports and signals in a [`SignalTable`],
//! appends cycle-tagged statements to an [`IrBuilder`], and moves the
//! [`SchedulingContext`] cursor forward as combinational delay accumulates
//! or as child operators add their latency. [`OperatorBuilder::finish`]
//! runs the second pass ([`resolve`]) that turns every cycle-stamped read
//! into a register tap, then records the operator in the run's
//! [`GenerationContext`].
//!
//! The reference-model side lives here too: [`TestCase`], [`TestCaseList`]
//! and the [`ArithmeticOperator`] trait that pairs hardware with an exact
//! `emulate` function.

#![warn(missing_docs)]

pub mod builder;
pub mod context;
pub mod error;
pub mod ir_builder;
pub mod oracle;
pub mod resolve;
pub mod schedule;
pub mod table;
pub mod testcase;

pub use builder::{constant, OperatorBuilder, PortMap, UseCond, UseExpr};
pub use context::GenerationContext;
pub use error::{GenError, GenOutcome};
pub use ir_builder::IrBuilder;
pub use oracle::{random_bits, random_normal_float, ArithmeticOperator};
pub use resolve::resolve;
pub use schedule::{PeriodOverrun, SchedulingContext};
pub use table::SignalTable;
pub use testcase::{TestCase, TestCaseList};
