//! Arithmetic operator generators with their exact models.
//!
//! Each operator is a small type that drives an
//! [`OperatorBuilder`](pipegen_core::OperatorBuilder) at construction and
//! keeps the resulting [`Operator`](pipegen_ir::Operator) together with its
//! parameters. The parameters are all its
//! [`ArithmeticOperator::emulate`](pipegen_core::ArithmeticOperator::emulate)
//! needs to compute the expected outputs with exact arithmetic.
//!
//! Integer building blocks ([`IntAdder`], [`Shifter`], [`LzocShifterSticky`],
//! [`IntMultiplier`], [`Table`]) are instantiated by the floating-point
//! operators ([`FpAdd`], [`FpMult`], [`FpDiv`]) and the accumulator pair
//! ([`LongAcc`], [`LongAcc2Fp`]). [`PolynomialEvaluator`] chains
//! multipliers and adders for the polynomial stage of function
//! approximation. [`registry`] builds any of them by name from a resolved
//! configuration.

pub mod float;
pub mod fp_add;
pub mod fp_div;
pub mod fp_mult;
pub mod ieee;
pub mod int_adder;
pub mod int_multiplier;
pub mod long_acc;
pub mod long_acc2fp;
pub mod lzoc;
pub mod polynomial;
pub mod registry;
pub mod shifter;
pub mod table;

pub use float::{Exn, FpFormat, FpValue, Rounding};
pub use fp_add::FpAdd;
pub use fp_div::FpDiv;
pub use fp_mult::FpMult;
pub use ieee::{InputIeee, OutputIeee};
pub use int_adder::IntAdder;
pub use int_multiplier::IntMultiplier;
pub use long_acc::LongAcc;
pub use long_acc2fp::LongAcc2Fp;
pub use lzoc::{LeadingDigit, LzocShifterSticky};
pub use polynomial::{PolynomialEvaluator, PolynomialFormat};
pub use registry::{build_operator, operator_names, target_for};
pub use shifter::{ShiftDirection, Shifter};
pub use table::{Table, TableFunction};

use std::collections::BTreeMap;

/// Arrival delay in nanoseconds of each input port, by port name.
pub type DelayMap = BTreeMap<String, f64>;
