//! Bit-vector expressions and conditions.
//!
//! Both are generic over the leaf type `L` that refers to a signal, so the
//! same tree shape serves the construction pass (`L = SignalUse`) and the
//! resolved form (`L = Tap`). All arithmetic is unsigned and modular.

use pipegen_common::Bits;
use serde::{Deserialize, Serialize};

/// A binary bit-vector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Bitwise AND; operands have equal widths.
    And,
    /// Bitwise OR; operands have equal widths.
    Or,
    /// Bitwise XOR; operands have equal widths.
    Xor,
    /// Addition modulo `2^w`, `w` the left width; the right operand may be narrower.
    Add,
    /// Subtraction modulo `2^w`, `w` the left width; the right operand may be narrower.
    Sub,
    /// Full product; the result width is the sum of the operand widths.
    Mul,
}

impl BinaryOp {
    /// Returns `true` for the bitwise operators.
    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }
}

/// An unsigned comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

/// A bit-vector expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr<L> {
    /// A whole signal.
    Signal(L),
    /// A literal.
    Const(Bits),
    /// Bits `high` down to `low` of a signal.
    Slice {
        /// The sliced signal.
        signal: L,
        /// High bit index (inclusive).
        high: u32,
        /// Low bit index (inclusive).
        low: u32,
    },
    /// Concatenation, first element most significant.
    Concat(Vec<Expr<L>>),
    /// A single bit repeated `count` times.
    Replicate {
        /// The repeated bit (width 1).
        bit: Box<Expr<L>>,
        /// Number of copies.
        count: u32,
    },
    /// Bitwise complement.
    Not(Box<Expr<L>>),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr<L>>,
        /// Right operand.
        rhs: Box<Expr<L>>,
    },
}

impl<L> Expr<L> {
    /// A literal of `width` bits.
    pub fn constant(value: u64, width: u32) -> Self {
        Expr::Const(Bits::from_u64(value, width))
    }

    /// A single-bit literal.
    pub fn bit(value: bool) -> Self {
        Expr::Const(Bits::from_bool(value))
    }

    /// An all-zero literal.
    pub fn zeros(width: u32) -> Self {
        Expr::Const(Bits::zero(width))
    }

    /// An all-one literal.
    pub fn ones(width: u32) -> Self {
        Expr::Const(Bits::ones(width))
    }

    /// A single bit of a signal.
    pub fn bit_of(signal: L, index: u32) -> Self {
        Expr::Slice {
            signal,
            high: index,
            low: index,
        }
    }

    /// A slice of a signal.
    pub fn slice(signal: L, high: u32, low: u32) -> Self {
        Expr::Slice { signal, high, low }
    }

    /// A concatenation.
    pub fn concat(parts: Vec<Expr<L>>) -> Self {
        Expr::Concat(parts)
    }

    /// A single bit repeated `count` times.
    pub fn replicate(bit: Expr<L>, count: u32) -> Self {
        Expr::Replicate {
            bit: Box::new(bit),
            count,
        }
    }

    /// Bitwise complement.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    fn binary(self, op: BinaryOp, rhs: Expr<L>) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Bitwise AND.
    pub fn and(self, rhs: Expr<L>) -> Self {
        self.binary(BinaryOp::And, rhs)
    }

    /// Bitwise OR.
    pub fn or(self, rhs: Expr<L>) -> Self {
        self.binary(BinaryOp::Or, rhs)
    }

    /// Bitwise XOR.
    pub fn xor(self, rhs: Expr<L>) -> Self {
        self.binary(BinaryOp::Xor, rhs)
    }

    /// Modular addition.
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, rhs: Expr<L>) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    /// Modular subtraction.
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, rhs: Expr<L>) -> Self {
        self.binary(BinaryOp::Sub, rhs)
    }

    /// Full-width product.
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, rhs: Expr<L>) -> Self {
        self.binary(BinaryOp::Mul, rhs)
    }

    /// Returns the width of the expression given the width of each leaf.
    pub fn width(&self, leaf_width: &impl Fn(&L) -> u32) -> u32 {
        match self {
            Expr::Signal(l) => leaf_width(l),
            Expr::Const(bits) => bits.width(),
            Expr::Slice { high, low, .. } => high - low + 1,
            Expr::Concat(parts) => parts.iter().map(|p| p.width(leaf_width)).sum(),
            Expr::Replicate { count, .. } => *count,
            Expr::Not(e) => e.width(leaf_width),
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::Mul => lhs.width(leaf_width) + rhs.width(leaf_width),
                _ => lhs.width(leaf_width),
            },
        }
    }

    /// Calls `f` on every leaf, left to right.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&L)) {
        match self {
            Expr::Signal(l) | Expr::Slice { signal: l, .. } => f(l),
            Expr::Const(_) => {}
            Expr::Concat(parts) => parts.iter().for_each(|p| p.for_each_leaf(f)),
            Expr::Replicate { bit, .. } => bit.for_each_leaf(f),
            Expr::Not(e) => e.for_each_leaf(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_leaf(f);
                rhs.for_each_leaf(f);
            }
        }
    }

    /// Calls `f` on every leaf mutably.
    pub fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut L)) {
        match self {
            Expr::Signal(l) | Expr::Slice { signal: l, .. } => f(l),
            Expr::Const(_) => {}
            Expr::Concat(parts) => parts.iter_mut().for_each(|p| p.for_each_leaf_mut(f)),
            Expr::Replicate { bit, .. } => bit.for_each_leaf_mut(f),
            Expr::Not(e) => e.for_each_leaf_mut(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_leaf_mut(f);
                rhs.for_each_leaf_mut(f);
            }
        }
    }

    /// Rebuilds the tree with every leaf mapped through a fallible function.
    pub fn try_map_leaves<M, E>(
        &self,
        f: &mut impl FnMut(&L) -> Result<M, E>,
    ) -> Result<Expr<M>, E> {
        Ok(match self {
            Expr::Signal(l) => Expr::Signal(f(l)?),
            Expr::Const(bits) => Expr::Const(bits.clone()),
            Expr::Slice { signal, high, low } => Expr::Slice {
                signal: f(signal)?,
                high: *high,
                low: *low,
            },
            Expr::Concat(parts) => Expr::Concat(
                parts
                    .iter()
                    .map(|p| p.try_map_leaves(f))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Replicate { bit, count } => Expr::Replicate {
                bit: Box::new(bit.try_map_leaves(f)?),
                count: *count,
            },
            Expr::Not(e) => Expr::Not(Box::new(e.try_map_leaves(f)?)),
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(lhs.try_map_leaves(f)?),
                rhs: Box::new(rhs.try_map_leaves(f)?),
            },
        })
    }

    /// Returns `true` if the expression can appear directly in a port map.
    pub fn is_port_actual(&self) -> bool {
        matches!(self, Expr::Signal(_) | Expr::Const(_) | Expr::Slice { .. })
    }
}

/// A boolean condition over expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cond<L> {
    /// An unsigned comparison of two expressions.
    Cmp {
        /// The comparison.
        op: CmpOp,
        /// Left operand.
        lhs: Expr<L>,
        /// Right operand.
        rhs: Expr<L>,
    },
    /// Both conditions hold.
    And(Box<Cond<L>>, Box<Cond<L>>),
    /// Either condition holds.
    Or(Box<Cond<L>>, Box<Cond<L>>),
    /// The condition does not hold.
    Not(Box<Cond<L>>),
}

impl<L> Cond<L> {
    fn cmp(op: CmpOp, lhs: Expr<L>, rhs: Expr<L>) -> Self {
        Cond::Cmp { op, lhs, rhs }
    }

    /// `lhs = rhs`.
    pub fn eq(lhs: Expr<L>, rhs: Expr<L>) -> Self {
        Self::cmp(CmpOp::Eq, lhs, rhs)
    }

    /// `lhs /= rhs`.
    pub fn ne(lhs: Expr<L>, rhs: Expr<L>) -> Self {
        Self::cmp(CmpOp::Ne, lhs, rhs)
    }

    /// `lhs < rhs`, unsigned.
    pub fn lt(lhs: Expr<L>, rhs: Expr<L>) -> Self {
        Self::cmp(CmpOp::Lt, lhs, rhs)
    }

    /// `lhs <= rhs`, unsigned.
    pub fn le(lhs: Expr<L>, rhs: Expr<L>) -> Self {
        Self::cmp(CmpOp::Le, lhs, rhs)
    }

    /// `lhs > rhs`, unsigned.
    pub fn gt(lhs: Expr<L>, rhs: Expr<L>) -> Self {
        Self::cmp(CmpOp::Gt, lhs, rhs)
    }

    /// `lhs >= rhs`, unsigned.
    pub fn ge(lhs: Expr<L>, rhs: Expr<L>) -> Self {
        Self::cmp(CmpOp::Ge, lhs, rhs)
    }

    /// A single-bit expression equals `'1'`.
    pub fn is_set(bit: Expr<L>) -> Self {
        Self::eq(bit, Expr::bit(true))
    }

    /// Conjunction.
    pub fn and(self, other: Cond<L>) -> Self {
        Cond::And(Box::new(self), Box::new(other))
    }

    /// Disjunction.
    pub fn or(self, other: Cond<L>) -> Self {
        Cond::Or(Box::new(self), Box::new(other))
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Cond::Not(Box::new(self))
    }

    /// Calls `f` on every leaf.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&L)) {
        match self {
            Cond::Cmp { lhs, rhs, .. } => {
                lhs.for_each_leaf(f);
                rhs.for_each_leaf(f);
            }
            Cond::And(a, b) | Cond::Or(a, b) => {
                a.for_each_leaf(f);
                b.for_each_leaf(f);
            }
            Cond::Not(c) => c.for_each_leaf(f),
        }
    }

    /// Calls `f` on every leaf mutably.
    pub fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut L)) {
        match self {
            Cond::Cmp { lhs, rhs, .. } => {
                lhs.for_each_leaf_mut(f);
                rhs.for_each_leaf_mut(f);
            }
            Cond::And(a, b) | Cond::Or(a, b) => {
                a.for_each_leaf_mut(f);
                b.for_each_leaf_mut(f);
            }
            Cond::Not(c) => c.for_each_leaf_mut(f),
        }
    }

    /// Rebuilds the condition with every leaf mapped through a fallible function.
    pub fn try_map_leaves<M, E>(
        &self,
        f: &mut impl FnMut(&L) -> Result<M, E>,
    ) -> Result<Cond<M>, E> {
        Ok(match self {
            Cond::Cmp { op, lhs, rhs } => Cond::Cmp {
                op: *op,
                lhs: lhs.try_map_leaves(f)?,
                rhs: rhs.try_map_leaves(f)?,
            },
            Cond::And(a, b) => Cond::And(
                Box::new(a.try_map_leaves(f)?),
                Box::new(b.try_map_leaves(f)?),
            ),
            Cond::Or(a, b) => Cond::Or(
                Box::new(a.try_map_leaves(f)?),
                Box::new(b.try_map_leaves(f)?),
            ),
            Cond::Not(c) => Cond::Not(Box::new(c.try_map_leaves(f)?)),
        })
    }
}
