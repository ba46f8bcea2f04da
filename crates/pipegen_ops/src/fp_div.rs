//! Floating-point divider.
//!
//! The significand quotient is produced one bit per step by restoring
//! division: `wf + 3` steps give the leading bit, the fraction, a round bit
//! and, together with the final remainder, a sticky bit. The result is
//! correctly rounded to nearest even.

use crate::float::{round_and_pack, Exn, FpFormat, Packing};
use crate::DelayMap;
use malachite::Natural;
use pipegen_common::bits::all_ones;
use pipegen_common::{Bits, GenResult};
use pipegen_core::{
    constant, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder, TestCase,
    TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator, SelectArm, SignalId};
use pipegen_target::Target;
use std::sync::Arc;

/// Exception tag of a quotient, by concatenated input tags. Pairs not
/// listed give NaN.
const QUOTIENT_EXN: [(u64, &[u64]); 3] = [
    (0b00, &[0b0001, 0b0010, 0b0110]),
    (0b01, &[0b0101]),
    (0b10, &[0b0100, 0b1000, 0b1001]),
];

/// `R = X / Y`, correctly rounded.
#[derive(Debug, Clone)]
pub struct FpDiv {
    op: Arc<Operator>,
    format: FpFormat,
}

impl FpDiv {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        format: FpFormat,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        format.validate()?;
        let (we, wf) = (format.we, format.wf);
        let name = ctx.unique_name(&format!("FPDiv_{we}_{wf}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        b.set_description("Restoring floating-point divider, round to nearest even");
        let x = b.add_fp_input("X", we, wf)?;
        let y = b.add_fp_input("Y", we, wf)?;
        let r = b.add_fp_output("R", we, wf, 1)?;

        b.manage_critical_path(target.lut_delay());
        let sign = b.define("sign", format.sign_of(&b, x).xor(format.sign_of(&b, y)))?;
        let exn_xy = b.define(
            "exnXY",
            Expr::concat(vec![format.exn_of(&b, x), format.exn_of(&b, y)]),
        )?;
        let exn_sel = b.declare("exnSel", 2)?;
        let arms = QUOTIENT_EXN
            .iter()
            .map(|&(value, choices)| SelectArm {
                choices: choices.iter().map(|c| Bits::from_u64(*c, 4)).collect(),
                value: constant(value, 2),
            })
            .collect();
        b.select(exn_sel, exn_xy, arms, constant(0b11, 2))?;

        let ew = we + 2;
        b.manage_critical_path(target.adder_delay(ew));
        let exp_diff = b.define(
            "expDiff",
            Expr::concat(vec![Expr::zeros(2), format.exponent_of(&b, x)])
                .add(constant(format.bias() as u64, ew))
                .sub(Expr::concat(vec![Expr::zeros(2), format.exponent_of(&b, y)])),
        )?;
        let divisor = b.define("divisor", format.significand_of(&b, y))?;
        let mut rem = b.define(
            "r0",
            Expr::concat(vec![Expr::bit(false), format.significand_of(&b, x)]),
        )?;

        // r < 2 * divisor holds before every step
        let steps = wf + 3;
        let mut quotient: Vec<SignalId> = Vec::with_capacity(steps as usize);
        let mut last = rem;
        for k in 0..steps {
            b.manage_critical_path(
                target.adder_delay(wf + 3) + target.lut_delay() + target.local_wire_delay(wf + 2),
            );
            let trial = b.define(
                &format!("t{k}"),
                Expr::concat(vec![Expr::bit(false), b.s(rem)])
                    .sub(Expr::concat(vec![Expr::zeros(2), b.s(divisor)])),
            )?;
            let q = b.define(&format!("q{k}"), b.bit(trial, wf + 2).not())?;
            let restored = b.declare(&format!("rs{k}"), wf + 1)?;
            b.assign_when(
                restored,
                vec![(Cond::is_set(b.s(q)), b.slice(trial, wf, 0))],
                b.slice(rem, wf, 0),
            )?;
            quotient.push(q);
            last = restored;
            if k + 1 < steps {
                rem = b.define(
                    &format!("r{}", k + 1),
                    Expr::concat(vec![b.s(restored), Expr::bit(false)]),
                )?;
            }
        }

        b.manage_critical_path(target.eq_comparator_delay(wf + 1) + target.lut_delay());
        let q = b.define(
            "quotient",
            Expr::concat(quotient.iter().map(|&q| b.s(q)).collect()),
        )?;
        let inexact = b.declare("inexact", 1)?;
        b.assign_when(
            inexact,
            vec![(Cond::ne(b.s(last), Expr::zeros(wf + 1)), Expr::bit(true))],
            Expr::bit(false),
        )?;

        b.manage_critical_path(target.adder_delay(ew) + target.lut_delay());
        let msb = b.define("qMsb", b.bit(q, wf + 2))?;
        let exponent = b.define(
            "expPostNorm",
            b.s(exp_diff)
                .sub(Expr::concat(vec![Expr::zeros(ew - 1), b.s(msb).not()])),
        )?;
        let fraction = b.declare("fracPostNorm", wf)?;
        b.assign_when(
            fraction,
            vec![(Cond::is_set(b.s(msb)), b.slice(q, wf + 1, 2))],
            b.slice(q, wf, 1),
        )?;
        let round_up = b.declare("roundUp", 1)?;
        b.assign_when(
            round_up,
            vec![(
                Cond::is_set(b.s(msb)),
                b.bit(q, 1).and(b.bit(q, 0).or(b.s(inexact)).or(b.bit(q, 2))),
            )],
            b.bit(q, 0).and(b.s(inexact).or(b.bit(q, 1))),
        )?;

        let packed = round_and_pack(
            &mut b,
            format,
            Packing {
                exn: exn_sel,
                sign,
                exponent,
                fraction,
                round_up,
            },
        )?;
        b.assign(r, b.s(packed))?;
        let op = b.finish(ctx)?;
        Ok(Self { op, format })
    }

    pub fn format(&self) -> FpFormat {
        self.format
    }

    fn case(&self, x: Natural, y: Natural, comment: &str) -> GenResult<TestCase> {
        let mut tc = self.new_test_case();
        tc.set_input("X", x)?;
        tc.set_input("Y", y)?;
        tc.set_comment(comment);
        self.emulate(&mut tc)?;
        Ok(tc)
    }
}

impl ArithmeticOperator for FpDiv {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let f = self.format;
        let x = f.decode(tc.input("X")?);
        let y = f.decode(tc.input("Y")?);
        let sign = x.sign != y.sign;
        let r = match (x.exn, y.exn) {
            (Exn::NaN, _) | (_, Exn::NaN) => f.nan(),
            (Exn::Zero, Exn::Zero) | (Exn::Infinity, Exn::Infinity) => f.nan(),
            (Exn::Infinity, _) | (_, Exn::Zero) => f.infinity(sign),
            (Exn::Zero, _) | (_, Exn::Infinity) => f.zero(sign),
            (Exn::Normal, Exn::Normal) => {
                let (mx, ex) = f.scaled(&x);
                let (my, ey) = f.scaled(&y);
                let extra = u64::from(f.wf + 4);
                let numerator = mx << extra;
                let q = &numerator / &my;
                let sticky = &q * &my != numerator;
                f.round(sign, &q, ex - ey - extra as i64, sticky, crate::Rounding::NearestEven)
            }
        };
        tc.add_expected("R", r)
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let f = self.format;
        let zero = Natural::from(0u32);
        let bias = f.bias() as u64;
        let one = f.one();
        let three = f.normal(false, bias + 1, Natural::from(1u32) << u64::from(f.wf - 1));
        let largest = f.normal(false, f.max_exponent() as u64, all_ones(f.wf));
        let smallest = f.normal(false, 0, zero);
        let cases = [
            (one.clone(), one.clone(), "1 / 1"),
            (one.clone(), three, "1 / 3"),
            (largest.clone(), smallest.clone(), "overflow"),
            (smallest, largest, "underflow"),
            (f.zero(false), f.zero(true), "0 / 0"),
            (one.clone(), f.zero(true), "1 / -0"),
            (f.infinity(false), f.infinity(false), "inf / inf"),
            (f.infinity(true), one.clone(), "-inf / 1"),
            (f.zero(false), f.infinity(false), "0 / inf"),
            (f.nan(), one, "NaN / 1"),
        ];
        for (x, y, comment) in cases {
            tcl.add(self.case(x, y, comment)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_passed, differential, target};

    fn divider(we: u32, wf: u32) -> FpDiv {
        let t = target();
        let mut ctx = GenerationContext::new();
        FpDiv::new(&mut ctx, t.as_ref(), FpFormat::new(we, wf), &DelayMap::new()).unwrap()
    }

    fn quotient(d: &FpDiv, x: Natural, y: Natural) -> Natural {
        let mut tc = d.new_test_case();
        tc.set_input("X", x).unwrap();
        tc.set_input("Y", y).unwrap();
        d.emulate(&mut tc).unwrap();
        tc.expected("R")[0].clone()
    }

    #[test]
    fn quotient_model() {
        let d = divider(8, 23);
        let f = d.format();
        let two = f.normal(false, 128, Natural::from(0u32));
        let half = f.normal(false, 126, Natural::from(0u32));
        assert_eq!(quotient(&d, f.one(), two), half);
        // 1/3 = 1.0101...b * 2^-2, rounded up
        let three = f.normal(false, 128, Natural::from(1u32) << 22u64);
        let third = f.normal(false, 125, Natural::from(0x2a_aaabu32));
        assert_eq!(quotient(&d, f.one(), three), third);
        assert_eq!(quotient(&d, f.one(), f.zero(false)), f.infinity(false));
        assert_eq!(quotient(&d, f.zero(false), f.zero(false)), f.nan());
    }

    #[test]
    fn exception_table_is_consistent() {
        let mut seen: Vec<u64> =
            QUOTIENT_EXN.iter().flat_map(|(_, c)| c.iter().copied()).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn half_precision_hardware() {
        let d = divider(5, 10);
        assert!(d.operator().pipeline_depth >= 1);
        assert_passed(&differential(&d, 500));
    }

    #[test]
    fn small_format_hardware() {
        assert_passed(&differential(&divider(4, 5), 1000));
    }

    #[test]
    fn single_precision_hardware() {
        assert_passed(&differential(&divider(8, 23), 200));
    }
}
