//! Leading zero/one counter fused with the normalizing shift.
//!
//! Stage `i` tests whether the top `2^i` bits of the partially normalized
//! value are all the counted digit and, if so, shifts them out. The test
//! outcomes, most significant stage first, form the count. Zeros are shifted
//! in from the right, so they never reach the compared bits ahead of the
//! first opposite digit. An input made only of the counted digit is
//! detected by a separate comparison and forced to `Count = width`.

use crate::DelayMap;
use malachite::base::num::logic::traits::BitAccess;
use malachite::Natural;
use pipegen_common::bits::{all_ones, mask};
use pipegen_common::{intlog2, GenResult};
use pipegen_core::{
    constant, random_bits, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder,
    TestCase, TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator};
use pipegen_target::Target;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// The digit whose leading run is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadingDigit {
    Zero,
    One,
    /// Chosen per input by the `OZb` port (`'0'` counts zeros).
    Dynamic,
}

impl LeadingDigit {
    /// Parses `"zero"`, `"one"` or `"dynamic"`.
    pub fn parse(text: &str) -> Option<LeadingDigit> {
        match text.trim().to_ascii_lowercase().as_str() {
            "zero" | "zeros" | "0" => Some(LeadingDigit::Zero),
            "one" | "ones" | "1" => Some(LeadingDigit::One),
            "dynamic" => Some(LeadingDigit::Dynamic),
            _ => None,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            LeadingDigit::Zero => "LZC",
            LeadingDigit::One => "LOC",
            LeadingDigit::Dynamic => "LZOC",
        }
    }
}

/// Counts the leading digits of `I` and shifts them out.
///
/// Ports: `I` (`width`), `OZb` (1, dynamic digit only), `Count`
/// (`intlog2(width)`), `O` (`wout`), and `Sticky` (1, only when
/// `wout < width`), the OR of the normalized bits below `O`.
///
/// An input made only of the counted digit gives `Count = width`, an
/// all-zero `O` and a clear `Sticky`.
#[derive(Debug, Clone)]
pub struct LzocShifterSticky {
    op: Arc<Operator>,
    width: u32,
    wout: u32,
    digit: LeadingDigit,
}

impl LzocShifterSticky {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        width: u32,
        wout: u32,
        digit: LeadingDigit,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        if width < 2 {
            return Err(GenError::config("input_width", "must be at least 2"));
        }
        if wout == 0 {
            return Err(GenError::config("output_width", "must be at least 1"));
        }
        let name = ctx.unique_name(&format!("{}ShifterSticky_{width}_to_{wout}", digit.prefix()));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let wc = intlog2(u64::from(width));
        let input = b.add_input("I", width)?;
        let ozb = match digit {
            LeadingDigit::Dynamic => Some(b.add_input("OZb", 1)?),
            _ => None,
        };
        let count_out = b.add_output("Count", wc)?;
        let o = b.add_output("O", wout)?;
        let sticky_out = if wout < width {
            Some(b.add_output("Sticky", 1)?)
        } else {
            None
        };

        let digit_bit = |b: &OperatorBuilder<'_>| match (digit, ozb) {
            (LeadingDigit::Dynamic, Some(ozb)) => b.s(ozb),
            (LeadingDigit::One, _) => Expr::bit(true),
            _ => Expr::bit(false),
        };

        // An input made only of the counted digit is recognized on its own,
        // in parallel with the stages, which would otherwise overcount it.
        let start = b.cycle();
        let start_delay = b.critical_path();
        b.manage_critical_path(target.eq_comparator_delay(width));
        let all_digits = b.declare("allDigits", 1)?;
        b.assign_when(
            all_digits,
            vec![(
                Cond::eq(b.s(input), Expr::replicate(digit_bit(&b), width)),
                Expr::bit(true),
            )],
            Expr::bit(false),
        )?;
        b.set_cycle(start);
        b.set_critical_path(start_delay);

        let mut level = b.define(&format!("level{wc}"), b.s(input))?;
        let mut count_bits = Vec::with_capacity(wc as usize);
        for i in (0..wc).rev() {
            let p = 1u32 << i;
            b.manage_critical_path(
                target.eq_comparator_delay(p) + target.lut_delay() + target.local_wire_delay(width),
            );
            let c = b.declare(&format!("count{i}"), 1)?;
            let run = Expr::replicate(digit_bit(&b), p);
            b.assign_when(
                c,
                vec![(Cond::eq(b.slice(level, width - 1, width - p), run), Expr::bit(true))],
                Expr::bit(false),
            )?;
            let shifted = if p < width {
                Expr::concat(vec![b.slice(level, width - 1 - p, 0), Expr::zeros(p)])
            } else {
                Expr::zeros(width)
            };
            let next = b.declare(&format!("level{i}"), width)?;
            b.assign_when(next, vec![(Cond::is_set(b.s(c)), shifted)], b.s(level))?;
            count_bits.push(c);
            level = next;
        }

        b.sync_with(&[all_digits])?;
        let count = b.declare("sCount", wc)?;
        b.assign_when(
            count,
            vec![(Cond::is_set(b.s(all_digits)), constant(u64::from(width), wc))],
            Expr::concat(count_bits.iter().map(|&c| b.s(c)).collect()),
        )?;
        let normalized = if wout <= width {
            b.slice(level, width - 1, width - wout)
        } else {
            Expr::concat(vec![b.s(level), Expr::zeros(wout - width)])
        };
        b.assign_when(o, vec![(Cond::is_set(b.s(all_digits)), Expr::zeros(wout))], normalized)?;
        if let Some(sticky) = sticky_out {
            b.manage_critical_path(target.eq_comparator_delay(width - wout));
            b.assign_when(
                sticky,
                vec![(
                    Cond::ne(b.slice(level, width - wout - 1, 0), Expr::zeros(width - wout)),
                    Expr::bit(true),
                )],
                Expr::bit(false),
            )?;
        }
        b.assign(count_out, b.s(count))?;
        let op = b.finish(ctx)?;
        Ok(Self {
            op,
            width,
            wout,
            digit,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn wout(&self) -> u32 {
        self.wout
    }

    pub fn digit(&self) -> LeadingDigit {
        self.digit
    }

    /// Width of the `Count` output.
    pub fn count_width(&self) -> u32 {
        intlog2(u64::from(self.width))
    }

    pub fn has_sticky(&self) -> bool {
        self.wout < self.width
    }

    fn counted_digit(&self, tc: &TestCase) -> GenResult<bool> {
        Ok(match self.digit {
            LeadingDigit::Zero => false,
            LeadingDigit::One => true,
            LeadingDigit::Dynamic => *tc.input("OZb")? != 0u32,
        })
    }

    fn case(&self, input: Natural, ozb: bool, comment: &str) -> GenResult<TestCase> {
        let mut tc = self.new_test_case();
        tc.set_input("I", input)?;
        if self.digit == LeadingDigit::Dynamic {
            tc.set_input("OZb", Natural::from(u32::from(ozb)))?;
        }
        tc.set_comment(comment);
        self.emulate(&mut tc)?;
        Ok(tc)
    }
}

impl ArithmeticOperator for LzocShifterSticky {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let input = tc.input("I")?.clone();
        let digit = self.counted_digit(tc)?;
        let w = u64::from(self.width);
        let count = (0..w)
            .rev()
            .take_while(|&i| input.get_bit(i) == digit)
            .count() as u64;
        let (o, sticky) = if count == w {
            (Natural::from(0u32), false)
        } else {
            let shifted = mask(&(input << count), self.width);
            if self.wout <= self.width {
                let drop = u64::from(self.width - self.wout);
                let rest = mask(&shifted, self.width - self.wout);
                (shifted >> drop, rest != 0u32)
            } else {
                (shifted << u64::from(self.wout - self.width), false)
            }
        };
        tc.add_expected("Count", Natural::from(count))?;
        tc.add_expected("O", o)?;
        if self.has_sticky() {
            tc.add_expected("Sticky", Natural::from(u32::from(sticky)))?;
        }
        Ok(())
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let ones = all_ones(self.width);
        let zero = Natural::from(0u32);
        for ozb in [false, true] {
            let digit = match self.digit {
                LeadingDigit::Dynamic => ozb,
                LeadingDigit::One => true,
                LeadingDigit::Zero => false,
            };
            if self.digit != LeadingDigit::Dynamic && ozb {
                break;
            }
            let (run, other) = if digit { (ones.clone(), zero.clone()) } else { (zero.clone(), ones.clone()) };
            tcl.add(self.case(run.clone(), ozb, "only the counted digit")?);
            tcl.add(self.case(run.clone() ^ Natural::from(1u32), ozb, "last bit differs")?);
            tcl.add(self.case(other, ozb, "no leading digit")?);
        }
        Ok(())
    }

    /// Draws the length of the leading run uniformly, so that every count
    /// is exercised.
    fn build_random_test_case(&self, rng: &mut StdRng) -> GenResult<TestCase> {
        let ozb = rng.gen_bool(0.5);
        let digit = match self.digit {
            LeadingDigit::Dynamic => ozb,
            LeadingDigit::One => true,
            LeadingDigit::Zero => false,
        };
        let run = rng.gen_range(0..=self.width);
        let input = if run == self.width {
            if digit { all_ones(self.width) } else { Natural::from(0u32) }
        } else {
            // run digits, then the opposite digit, then random bits
            let tail_width = self.width - run - 1;
            let tail = random_bits(rng, tail_width);
            let head = if digit { all_ones(run) << 1u64 } else { Natural::from(1u32) };
            (head << u64::from(tail_width)) + tail
        };
        self.case(input, ozb, "")
    }
}
