//! Cycle-tagged statements of the operator body.

use crate::expr::{Cond, Expr};
use crate::ids::SignalId;
use crate::operator::Operator;
use pipegen_common::Bits;
use std::sync::Arc;

/// One alternative of a [`Statement::Select`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectArm<L> {
    /// Selector values that pick this arm.
    pub choices: Vec<Bits>,
    /// Value assigned when the arm is picked.
    pub value: Expr<L>,
}

/// An instantiation of a child operator.
#[derive(Debug, Clone)]
pub struct Instance<L> {
    /// Instance label, unique within the parent.
    pub name: String,
    /// The instantiated operator.
    pub child: Arc<Operator>,
    /// Actuals of the child's input ports, in the child's port order.
    pub inputs: Vec<(String, Expr<L>)>,
    /// Parent signals driven by the child's output ports.
    pub outputs: Vec<(String, SignalId)>,
}

/// A concurrent statement.
#[derive(Debug, Clone)]
pub enum Statement<L> {
    /// `target <= value`.
    Assign {
        /// The driven signal.
        target: SignalId,
        /// The driven value.
        value: Expr<L>,
    },
    /// `target <= v1 when c1 else v2 when c2 else otherwise`.
    Conditional {
        /// The driven signal.
        target: SignalId,
        /// Condition/value pairs, tested in order.
        arms: Vec<(Cond<L>, Expr<L>)>,
        /// Value when no condition holds.
        otherwise: Expr<L>,
    },
    /// `with selector select target <= ...`.
    Select {
        /// The driven signal.
        target: SignalId,
        /// The selecting signal.
        selector: L,
        /// Alternatives, tested in order.
        arms: Vec<SelectArm<L>>,
        /// Value for every other selector value.
        otherwise: Expr<L>,
    },
    /// A child operator instance.
    Instance(Instance<L>),
    /// A comment line in the generated text.
    Comment(String),
    /// Marks the point where the schedule entered a new cycle.
    Barrier(u32),
}

impl<L> Statement<L> {
    /// Returns the signals driven by this statement.
    pub fn targets(&self) -> Vec<SignalId> {
        match self {
            Statement::Assign { target, .. }
            | Statement::Conditional { target, .. }
            | Statement::Select { target, .. } => vec![*target],
            Statement::Instance(inst) => inst.outputs.iter().map(|(_, id)| *id).collect(),
            Statement::Comment(_) | Statement::Barrier(_) => Vec::new(),
        }
    }

    /// Calls `f` on every leaf read by this statement.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&L)) {
        match self {
            Statement::Assign { value, .. } => value.for_each_leaf(f),
            Statement::Conditional {
                arms, otherwise, ..
            } => {
                for (cond, value) in arms {
                    cond.for_each_leaf(f);
                    value.for_each_leaf(f);
                }
                otherwise.for_each_leaf(f);
            }
            Statement::Select {
                selector,
                arms,
                otherwise,
                ..
            } => {
                f(selector);
                for arm in arms {
                    arm.value.for_each_leaf(f);
                }
                otherwise.for_each_leaf(f);
            }
            Statement::Instance(inst) => {
                for (_, actual) in &inst.inputs {
                    actual.for_each_leaf(f);
                }
            }
            Statement::Comment(_) | Statement::Barrier(_) => {}
        }
    }

    /// Calls `f` on every leaf mutably.
    pub fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut L)) {
        match self {
            Statement::Assign { value, .. } => value.for_each_leaf_mut(f),
            Statement::Conditional {
                arms, otherwise, ..
            } => {
                for (cond, value) in arms {
                    cond.for_each_leaf_mut(f);
                    value.for_each_leaf_mut(f);
                }
                otherwise.for_each_leaf_mut(f);
            }
            Statement::Select {
                selector,
                arms,
                otherwise,
                ..
            } => {
                f(selector);
                for arm in arms {
                    arm.value.for_each_leaf_mut(f);
                }
                otherwise.for_each_leaf_mut(f);
            }
            Statement::Instance(inst) => {
                for (_, actual) in &mut inst.inputs {
                    actual.for_each_leaf_mut(f);
                }
            }
            Statement::Comment(_) | Statement::Barrier(_) => {}
        }
    }

    /// Rebuilds the statement with every leaf mapped through a fallible function.
    pub fn try_map_leaves<M, E>(
        &self,
        f: &mut impl FnMut(&L) -> Result<M, E>,
    ) -> Result<Statement<M>, E> {
        Ok(match self {
            Statement::Assign { target, value } => Statement::Assign {
                target: *target,
                value: value.try_map_leaves(f)?,
            },
            Statement::Conditional {
                target,
                arms,
                otherwise,
            } => Statement::Conditional {
                target: *target,
                arms: arms
                    .iter()
                    .map(|(c, v)| Ok((c.try_map_leaves(f)?, v.try_map_leaves(f)?)))
                    .collect::<Result<_, E>>()?,
                otherwise: otherwise.try_map_leaves(f)?,
            },
            Statement::Select {
                target,
                selector,
                arms,
                otherwise,
            } => Statement::Select {
                target: *target,
                selector: f(selector)?,
                arms: arms
                    .iter()
                    .map(|arm| {
                        Ok(SelectArm {
                            choices: arm.choices.clone(),
                            value: arm.value.try_map_leaves(f)?,
                        })
                    })
                    .collect::<Result<_, E>>()?,
                otherwise: otherwise.try_map_leaves(f)?,
            },
            Statement::Instance(inst) => Statement::Instance(Instance {
                name: inst.name.clone(),
                child: Arc::clone(&inst.child),
                inputs: inst
                    .inputs
                    .iter()
                    .map(|(port, e)| Ok((port.clone(), e.try_map_leaves(f)?)))
                    .collect::<Result<_, E>>()?,
                outputs: inst.outputs.clone(),
            }),
            Statement::Comment(text) => Statement::Comment(text.clone()),
            Statement::Barrier(cycle) => Statement::Barrier(*cycle),
        })
    }
}

/// A statement together with the cycle at which it executes.
#[derive(Debug, Clone)]
pub struct Tagged<L> {
    /// Execution cycle.
    pub cycle: u32,
    /// The statement.
    pub stmt: Statement<L>,
}
