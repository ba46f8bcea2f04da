//! Barrel shifters.
//!
//! One multiplexer level per bit of the shift amount; level `i` shifts by
//! `2^i` when bit `i` of `S` is set. The output keeps every bit that can be
//! shifted in: `R` is `width + max_shift` bits wide.

use crate::DelayMap;
use malachite::Natural;
use pipegen_common::bits::{all_ones, mask};
use pipegen_common::{intlog2, GenResult};
use pipegen_core::{
    ArithmeticOperator, GenError, GenerationContext, OperatorBuilder, TestCase, TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator};
use pipegen_target::Target;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftDirection {
    Left,
    Right,
}

impl ShiftDirection {
    /// Parses `"left"` or `"right"`.
    pub fn parse(text: &str) -> Option<ShiftDirection> {
        match text.trim().to_ascii_lowercase().as_str() {
            "left" => Some(ShiftDirection::Left),
            "right" => Some(ShiftDirection::Right),
            _ => None,
        }
    }
}

impl fmt::Display for ShiftDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftDirection::Left => write!(f, "Left"),
            ShiftDirection::Right => write!(f, "Right"),
        }
    }
}

/// Left shifter: `R = (X << S) mod 2^(width + max_shift)`.
///
/// Right shifter: `R = (X << max_shift) >> S`, i.e. `X` lands in the upper
/// `width` bits when `S = 0` and the bits shifted out on the right are kept
/// in the lower `max_shift` bits.
#[derive(Debug, Clone)]
pub struct Shifter {
    op: Arc<Operator>,
    width: u32,
    max_shift: u32,
    direction: ShiftDirection,
}

impl Shifter {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        width: u32,
        max_shift: u32,
        direction: ShiftDirection,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        if width == 0 {
            return Err(GenError::config("input_width", "a shifter needs at least one bit"));
        }
        if max_shift == 0 {
            return Err(GenError::config("max_shift", "must be at least 1"));
        }
        let name = ctx.unique_name(&format!("{direction}Shifter_{width}_by_max_{max_shift}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let sw = intlog2(u64::from(max_shift));
        let x = b.add_input("X", width)?;
        let s = b.add_input("S", sw)?;
        let r = b.add_output("R", width + max_shift)?;

        let mut level = x;
        let mut level_width = width;
        for i in 0..sw {
            let amount = 1u32 << i;
            b.manage_critical_path(target.lut_delay() + target.local_wire_delay(level_width));
            let shifted = b.declare(&format!("level{}", i + 1), level_width + amount)?;
            let (when_set, otherwise) = match direction {
                ShiftDirection::Left => (
                    Expr::concat(vec![b.s(level), Expr::zeros(amount)]),
                    Expr::concat(vec![Expr::zeros(amount), b.s(level)]),
                ),
                ShiftDirection::Right => (
                    Expr::concat(vec![Expr::zeros(amount), b.s(level)]),
                    Expr::concat(vec![b.s(level), Expr::zeros(amount)]),
                ),
            };
            b.assign_when(shifted, vec![(Cond::is_set(b.bit(s, i)), when_set)], otherwise)?;
            level = shifted;
            level_width += amount;
        }

        match direction {
            ShiftDirection::Left => b.assign(r, b.slice(level, width + max_shift - 1, 0))?,
            ShiftDirection::Right => {
                let pad = level_width - width;
                b.assign(r, b.slice(level, level_width - 1, pad - max_shift))?
            }
        }
        let op = b.finish(ctx)?;
        Ok(Self {
            op,
            width,
            max_shift,
            direction,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn max_shift(&self) -> u32 {
        self.max_shift
    }

    pub fn direction(&self) -> ShiftDirection {
        self.direction
    }
}

impl ArithmeticOperator for Shifter {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let x = tc.input("X")?.clone();
        let s = u64::try_from(tc.input("S")?).unwrap_or(u64::MAX);
        let out_width = self.width + self.max_shift;
        let r = match self.direction {
            ShiftDirection::Left => mask(&(x << s), out_width),
            ShiftDirection::Right => (x << u64::from(self.max_shift)) >> s,
        };
        tc.add_expected("R", r)
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let sw = intlog2(u64::from(self.max_shift));
        let amounts = [0u64, 1, u64::from(self.max_shift), (1u64 << sw) - 1];
        for (k, s) in amounts.into_iter().enumerate() {
            if amounts[..k].contains(&s) {
                continue;
            }
            let mut tc = self.new_test_case();
            tc.set_input("X", all_ones(self.width))?;
            tc.set_input("S", Natural::from(s))?;
            tc.set_comment(format!("shift by {s}"));
            self.emulate(&mut tc)?;
            tcl.add(tc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_passed, differential, exhaustive, target};

    fn shifter(width: u32, max: u32, dir: ShiftDirection) -> Shifter {
        let t = target();
        let mut ctx = GenerationContext::new();
        Shifter::new(&mut ctx, t.as_ref(), width, max, dir, &DelayMap::new()).unwrap()
    }

    #[test]
    fn left_shifter_matches_model() {
        let sh = shifter(8, 5, ShiftDirection::Left);
        assert_eq!(sh.operator().input("S").unwrap().width, 3);
        assert_eq!(sh.operator().output("R").unwrap().width, 13);
        assert_eq!(sh.operator().name, "LeftShifter_8_by_max_5_uid1");
        assert_passed(&exhaustive(&sh));
    }

    #[test]
    fn right_shifter_matches_model() {
        let sh = shifter(8, 5, ShiftDirection::Right);
        assert_passed(&exhaustive(&sh));
    }

    #[test]
    fn right_shift_keeps_bits_shifted_out() {
        let sh = shifter(4, 4, ShiftDirection::Right);
        let mut tc = sh.new_test_case();
        tc.set_input("X", Natural::from(0b1011u32)).unwrap();
        tc.set_input("S", Natural::from(2u32)).unwrap();
        sh.emulate(&mut tc).unwrap();
        assert_eq!(tc.expected("R"), &[Natural::from(0b0010_1100u32)]);
    }

    #[test]
    fn wide_shifter_is_pipelined() {
        let sh = shifter(64, 64, ShiftDirection::Left);
        assert_eq!(sh.operator().input("S").unwrap().width, 7);
        assert!(sh.operator().pipeline_depth >= 1);
        assert_passed(&differential(&sh, 100));
    }

    #[test]
    fn direction_names() {
        assert_eq!(ShiftDirection::parse(" Left"), Some(ShiftDirection::Left));
        assert_eq!(ShiftDirection::parse("right"), Some(ShiftDirection::Right));
        assert_eq!(ShiftDirection::parse("up"), None);
    }

    #[test]
    fn zero_shift_is_rejected() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let err = Shifter::new(&mut ctx, t.as_ref(), 8, 0, ShiftDirection::Left, &DelayMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("max_shift"));
    }
}
