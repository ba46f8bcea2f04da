//! Rendering of resolved expressions and conditions as VHDL text.
//!
//! A width-1 value exists in two VHDL shapes: a `std_logic` scalar and a
//! one-element `std_logic_vector`. Every expression is rendered in the shape
//! its context asks for; `scalar` is only ever requested for width-1 values.

use pipegen_common::Bits;
use pipegen_ir::{BinaryOp, CmpOp, Cond, Expr, Operator, Tap};

/// Renders expressions of one operator.
#[derive(Debug, Clone, Copy)]
pub struct ExprPrinter<'a> {
    op: &'a Operator,
}

impl<'a> ExprPrinter<'a> {
    /// Creates a printer resolving names against `op`.
    pub fn new(op: &'a Operator) -> Self {
        Self { op }
    }

    /// Returns the VHDL name of a register tap.
    pub fn tap(&self, tap: &Tap) -> String {
        self.op.signal(tap.signal).delayed_name(tap.delay)
    }

    fn is_std_logic(&self, tap: &Tap) -> bool {
        self.op.signal(tap.signal).is_std_logic()
    }

    /// Returns the width of an expression.
    pub fn width(&self, e: &Expr<Tap>) -> u32 {
        e.width(&|t: &Tap| self.op.signal(t.signal).width)
    }

    /// Returns `true` if the expression is a scalar when left to itself.
    pub fn natural_scalar(&self, e: &Expr<Tap>) -> bool {
        if self.width(e) != 1 {
            return false;
        }
        match e {
            Expr::Signal(t) => self.is_std_logic(t),
            Expr::Const(_) | Expr::Slice { .. } | Expr::Replicate { .. } => true,
            Expr::Concat(parts) => parts.first().is_some_and(|p| self.natural_scalar(p)),
            Expr::Not(inner) => self.natural_scalar(inner),
            Expr::Binary { lhs, rhs, op } if op.is_bitwise() => {
                self.natural_scalar(lhs) && self.natural_scalar(rhs)
            }
            Expr::Binary { lhs, .. } => self.natural_scalar(lhs),
        }
    }

    /// Renders `e` in its natural shape.
    pub fn natural(&self, e: &Expr<Tap>) -> String {
        self.expr(e, self.natural_scalar(e))
    }

    /// Renders `e` as a `std_logic` (`scalar`) or as a vector.
    pub fn expr(&self, e: &Expr<Tap>, scalar: bool) -> String {
        if scalar {
            self.scalar(e)
        } else {
            self.vector(e)
        }
    }

    fn scalar(&self, e: &Expr<Tap>) -> String {
        match e {
            Expr::Signal(t) if self.is_std_logic(t) => self.tap(t),
            Expr::Signal(t) => format!("{}(0)", self.tap(t)),
            Expr::Const(bits) => format!("'{}'", u8::from(bits.bit(0))),
            Expr::Slice { signal, .. } if self.is_std_logic(signal) => self.tap(signal),
            Expr::Slice { signal, low, .. } => format!("{}({low})", self.tap(signal)),
            Expr::Concat(parts) => match parts.as_slice() {
                [only] => self.scalar(only),
                _ => self.vector_to_scalar(e),
            },
            Expr::Replicate { bit, .. } => self.scalar(bit),
            Expr::Not(inner) => format!("(not {})", self.scalar(inner)),
            Expr::Binary { op, lhs, rhs } => {
                let keyword = match op {
                    BinaryOp::And => "and",
                    BinaryOp::Or => "or",
                    // one-bit sums and differences are modulo 2
                    BinaryOp::Xor | BinaryOp::Add | BinaryOp::Sub => "xor",
                    BinaryOp::Mul => return self.vector_to_scalar(e),
                };
                format!("({} {keyword} {})", self.scalar(lhs), self.scalar(rhs))
            }
        }
    }

    // Width-1 products and multi-part concatenations do not occur.
    fn vector_to_scalar(&self, e: &Expr<Tap>) -> String {
        format!("std_logic_vector'({})(0)", self.vector(e))
    }

    fn vector(&self, e: &Expr<Tap>) -> String {
        match e {
            Expr::Signal(t) if self.is_std_logic(t) => format!("(0 => {})", self.tap(t)),
            Expr::Signal(t) => self.tap(t),
            Expr::Const(bits) => format!("\"{bits}\""),
            Expr::Slice { signal, high, low } => {
                if self.is_std_logic(signal) {
                    format!("(0 => {})", self.tap(signal))
                } else {
                    format!("{}({high} downto {low})", self.tap(signal))
                }
            }
            Expr::Concat(parts) => {
                if let [only] = parts.as_slice() {
                    return self.vector(only);
                }
                let items: Vec<String> = parts.iter().map(|p| self.natural(p)).collect();
                format!("({})", items.join(" & "))
            }
            Expr::Replicate { bit, count } => format!(
                "std_logic_vector'({} downto 0 => {})",
                count - 1,
                self.scalar(bit)
            ),
            Expr::Not(inner) => format!("(not {})", self.operand(inner)),
            Expr::Binary { op, lhs, rhs } => {
                let symbol = match op {
                    BinaryOp::And => "and",
                    BinaryOp::Or => "or",
                    BinaryOp::Xor => "xor",
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                };
                format!("({} {symbol} {})", self.operand(lhs), self.operand(rhs))
            }
        }
    }

    /// An operator operand: a vector, with aggregates qualified so that
    /// overload resolution has a type to work with.
    fn operand(&self, e: &Expr<Tap>) -> String {
        let text = self.vector(e);
        if text.starts_with("(0 =>") {
            format!("std_logic_vector'{text}")
        } else {
            text
        }
    }

    /// Renders a literal in the shape of a signal of the given kind.
    pub fn literal(bits: &Bits, scalar: bool) -> String {
        if scalar {
            format!("'{}'", u8::from(bits.bit(0)))
        } else {
            format!("\"{bits}\"")
        }
    }

    /// Renders a condition as a VHDL boolean.
    pub fn cond(&self, c: &Cond<Tap>) -> String {
        match c {
            Cond::Cmp { op, lhs, rhs } => {
                let scalar = (self.natural_scalar(lhs) && self.natural_scalar(rhs))
                    || (self.width(lhs) == 1 && matches!(rhs, Expr::Const(_)));
                let symbol = match op {
                    CmpOp::Eq => "=",
                    CmpOp::Ne => "/=",
                    CmpOp::Lt => "<",
                    CmpOp::Le => "<=",
                    CmpOp::Gt => ">",
                    CmpOp::Ge => ">=",
                };
                format!(
                    "{} {symbol} {}",
                    self.cmp_operand(lhs, scalar),
                    self.cmp_operand(rhs, scalar)
                )
            }
            Cond::And(a, b) => format!("({} and {})", self.cond(a), self.cond(b)),
            Cond::Or(a, b) => format!("({} or {})", self.cond(a), self.cond(b)),
            Cond::Not(inner) => format!("not ({})", self.cond(inner)),
        }
    }

    fn cmp_operand(&self, e: &Expr<Tap>, scalar: bool) -> String {
        if scalar {
            self.scalar(e)
        } else {
            self.operand(e)
        }
    }
}
