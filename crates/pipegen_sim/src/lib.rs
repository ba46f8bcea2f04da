//! Cycle-accurate simulation of generated operators.
//!
//! The simulator executes the resolved IR directly: each clock period the
//! concurrent statements are evaluated in dependency order, then every
//! register chain shifts. It is the software stand-in for the VHDL
//! simulator when checking generated operators against their `emulate`
//! oracle.

#![warn(missing_docs)]

pub mod error;
pub mod evaluator;
pub mod simulator;

pub use error::SimError;
pub use evaluator::{eval_cond, eval_expr, TapSource};
pub use simulator::{run_vectors, Simulator};
