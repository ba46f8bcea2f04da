//! The typed intermediate representation of generated operators.
//!
//! Operators are built as an append-only list of cycle-tagged [`Statement`]s
//! over [`Signal`]s stored in an [`Arena`]. Statements are generic over their
//! leaf reference type: during construction a leaf is a [`SignalUse`] (a
//! signal read at an absolute cycle), and after resolution it is a [`Tap`]
//! (a signal read through a fixed number of pipeline registers). A resolved
//! [`Operator`] is what back ends (VHDL, simulation) consume.

#![warn(missing_docs)]

pub mod arena;
pub mod expr;
pub mod ids;
pub mod operator;
pub mod signal;
pub mod stmt;

pub use arena::{Arena, ArenaId};
pub use expr::{BinaryOp, CmpOp, Cond, Expr};
pub use ids::SignalId;
pub use operator::{Attribute, Clocking, Operator, SignalUse, Tap};
pub use signal::{NumericFormat, ResetStyle, Signal, SignalKind, SignalTiming};
pub use stmt::{Instance, SelectArm, Statement, Tagged};
