//! Evaluation of resolved expressions and conditions over bit patterns.
//!
//! All arithmetic is unsigned and modular, matching the generated VHDL:
//! sums and differences keep the left operand's width, products are full
//! width, and bitwise operators work on equal widths.

use crate::error::SimError;
use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use pipegen_common::Bits;
use pipegen_ir::{BinaryOp, CmpOp, Cond, Expr, Tap};

/// Provides the value seen through a register tap.
pub trait TapSource {
    /// Returns the value of `tap` in the current cycle.
    fn tap(&self, tap: &Tap) -> Result<&Bits, SimError>;
}

/// Evaluates an expression.
pub fn eval_expr(src: &impl TapSource, e: &Expr<Tap>) -> Result<Bits, SimError> {
    Ok(match e {
        Expr::Signal(t) => src.tap(t)?.clone(),
        Expr::Const(bits) => bits.clone(),
        Expr::Slice { signal, high, low } => src.tap(signal)?.slice(*high, *low),
        Expr::Concat(parts) => {
            let values = parts
                .iter()
                .map(|p| eval_expr(src, p))
                .collect::<Result<Vec<_>, _>>()?;
            Bits::concat(&values)
        }
        Expr::Replicate { bit, count } => {
            if eval_expr(src, bit)?.bit(0) {
                Bits::ones(*count)
            } else {
                Bits::zero(*count)
            }
        }
        Expr::Not(inner) => {
            let v = eval_expr(src, inner)?;
            let ones = Bits::ones(v.width());
            Bits::new(ones.value() ^ v.value(), v.width())
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval_expr(src, lhs)?;
            let r = eval_expr(src, rhs)?;
            eval_binary(*op, &l, &r)
        }
    })
}

fn eval_binary(op: BinaryOp, l: &Bits, r: &Bits) -> Bits {
    let w = l.width();
    match op {
        BinaryOp::And => Bits::new(l.value() & r.value(), w),
        BinaryOp::Or => Bits::new(l.value() | r.value(), w),
        BinaryOp::Xor => Bits::new(l.value() ^ r.value(), w),
        BinaryOp::Add => Bits::new(l.value() + r.value(), w),
        BinaryOp::Sub => {
            // r < 2^w, so the difference below never goes negative
            let lifted = l.value() + Natural::power_of_2(u64::from(w.max(r.width())));
            Bits::new(lifted - r.value(), w)
        }
        BinaryOp::Mul => Bits::new(l.value() * r.value(), w + r.width()),
    }
}

/// Evaluates a condition.
pub fn eval_cond(src: &impl TapSource, c: &Cond<Tap>) -> Result<bool, SimError> {
    Ok(match c {
        Cond::Cmp { op, lhs, rhs } => {
            let l = eval_expr(src, lhs)?;
            let r = eval_expr(src, rhs)?;
            let (l, r) = (l.value(), r.value());
            match op {
                CmpOp::Eq => l == r,
                CmpOp::Ne => l != r,
                CmpOp::Lt => l < r,
                CmpOp::Le => l <= r,
                CmpOp::Gt => l > r,
                CmpOp::Ge => l >= r,
            }
        }
        Cond::And(a, b) => eval_cond(src, a)? && eval_cond(src, b)?,
        Cond::Or(a, b) => eval_cond(src, a)? || eval_cond(src, b)?,
        Cond::Not(inner) => !eval_cond(src, inner)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_ir::SignalId;

    struct Fixed(Vec<Bits>);

    impl TapSource for Fixed {
        fn tap(&self, tap: &Tap) -> Result<&Bits, SimError> {
            Ok(&self.0[tap.signal.as_raw() as usize])
        }
    }

    fn sig(n: u32) -> Expr<Tap> {
        Expr::Signal(Tap::direct(SignalId::from_raw(n)))
    }

    fn vals() -> Fixed {
        Fixed(vec![Bits::from_u64(0b1011, 4), Bits::from_u64(0b0110, 4)])
    }

    fn eval(e: &Expr<Tap>) -> u64 {
        eval_expr(&vals(), e).unwrap().to_u64().unwrap()
    }

    #[test]
    fn modular_arithmetic() {
        assert_eq!(eval(&sig(0).add(sig(1))), (11 + 6) % 16);
        assert_eq!(eval(&sig(1).sub(sig(0))), (6 + 16 - 11) % 16);
        assert_eq!(eval(&sig(0).mul(sig(1))), 66);
        assert_eq!(eval(&sig(0).sub(Expr::constant(1, 1))), 10);
    }

    #[test]
    fn bitwise_and_structure() {
        assert_eq!(eval(&sig(0).and(sig(1))), 0b0010);
        assert_eq!(eval(&sig(0).xor(sig(1))), 0b1101);
        assert_eq!(eval(&sig(0).not()), 0b0100);
        let cat = Expr::concat(vec![
            Expr::slice(Tap::direct(SignalId::from_raw(0)), 1, 0),
            Expr::replicate(Expr::bit(true), 3),
        ]);
        assert_eq!(eval(&cat), 0b11111);
        assert_eq!(eval_expr(&vals(), &cat).unwrap().width(), 5);
    }

    #[test]
    fn conditions() {
        let v = vals();
        assert!(eval_cond(&v, &Cond::gt(sig(0), sig(1))).unwrap());
        assert!(eval_cond(&v, &Cond::is_set(Expr::bit_of(Tap::direct(SignalId::from_raw(1)), 2))).unwrap());
        assert!(!eval_cond(&v, &Cond::eq(sig(0), sig(1)).or(Cond::le(sig(0), sig(1)))).unwrap());
    }
}
