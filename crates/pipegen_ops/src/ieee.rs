//! Conversions between IEEE-754 encodings and the exception-tagged format.
//!
//! The tagged format has no subnormals and no reserved exponents, so:
//! IEEE subnormals are flushed to zero on the way in; on the way out,
//! normal numbers with the smallest exponent flush to zero and those with
//! the largest exponent become infinities. NaNs leave as the quiet NaN with
//! only the top fraction bit set.

use crate::float::{constant_natural, Exn, FpFormat};
use crate::DelayMap;
use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use pipegen_common::bits::{all_ones, mask};
use pipegen_common::GenResult;
use pipegen_core::{
    constant, random_bits, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder,
    TestCase, TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator};
use pipegen_target::Target;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Exponent and fraction fields of an IEEE-754 encoding.
fn ieee_fields(format: FpFormat, bits: &Natural) -> (Natural, Natural) {
    let exponent = mask(&(bits >> u64::from(format.wf)), format.we);
    (exponent, mask(bits, format.wf))
}

fn ieee_infinity(format: FpFormat, sign: bool) -> Natural {
    let sign_bit = if sign {
        Natural::power_of_2(u64::from(format.we + format.wf))
    } else {
        Natural::from(0u32)
    };
    sign_bit + (all_ones(format.we) << u64::from(format.wf))
}

fn ieee_quiet_nan(format: FpFormat) -> Natural {
    ieee_infinity(format, false) + Natural::power_of_2(u64::from(format.wf - 1))
}

fn ieee_zero(format: FpFormat, sign: bool) -> Natural {
    if sign {
        Natural::power_of_2(u64::from(format.we + format.wf))
    } else {
        Natural::from(0u32)
    }
}

/// Tags an IEEE-754 number: `R = exn & X`.
#[derive(Debug, Clone)]
pub struct InputIeee {
    op: Arc<Operator>,
    format: FpFormat,
}

impl InputIeee {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        format: FpFormat,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        format.validate()?;
        let (we, wf) = (format.we, format.wf);
        let name = ctx.unique_name(&format!("InputIEEE_{we}_{wf}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let x = b.add_ieee_input("X", we, wf)?;
        let r = b.add_fp_output("R", we, wf, 1)?;

        b.manage_critical_path(target.eq_comparator_delay(we.max(wf)) + target.lut_delay());
        let exn = b.declare("exn", 2)?;
        let exp_max = Cond::eq(b.slice(x, we + wf - 1, wf), Expr::ones(we));
        b.assign_when(
            exn,
            vec![
                (
                    Cond::eq(b.slice(x, we + wf - 1, wf), Expr::zeros(we)),
                    constant(Exn::Zero.code(), 2),
                ),
                (
                    exp_max.clone().and(Cond::eq(b.slice(x, wf - 1, 0), Expr::zeros(wf))),
                    constant(Exn::Infinity.code(), 2),
                ),
                (exp_max, constant(Exn::NaN.code(), 2)),
            ],
            constant(Exn::Normal.code(), 2),
        )?;
        b.assign(r, Expr::concat(vec![b.s(exn), b.s(x)]))?;
        let op = b.finish(ctx)?;
        Ok(Self { op, format })
    }
}

impl ArithmeticOperator for InputIeee {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let f = self.format;
        let x = tc.input("X")?.clone();
        let (exponent, fraction) = ieee_fields(f, &x);
        let exn = if exponent == 0u32 {
            Exn::Zero
        } else if exponent == all_ones(f.we) {
            if fraction == 0u32 {
                Exn::Infinity
            } else {
                Exn::NaN
            }
        } else {
            Exn::Normal
        };
        let tagged = (Natural::from(exn.code()) << u64::from(1 + f.we + f.wf)) + x;
        tc.add_expected("R", tagged)
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let f = self.format;
        let one = Natural::from(f.bias() as u64) << u64::from(f.wf);
        let cases = [
            (ieee_zero(f, false), "+0"),
            (ieee_zero(f, true), "-0"),
            (Natural::from(1u32), "smallest subnormal"),
            (one, "1"),
            (ieee_infinity(f, true), "-inf"),
            (ieee_quiet_nan(f), "NaN"),
        ];
        for (x, comment) in cases {
            let mut tc = self.new_test_case();
            tc.set_input("X", x)?;
            tc.set_comment(comment);
            self.emulate(&mut tc)?;
            tcl.add(tc);
        }
        Ok(())
    }
}

/// Converts a tagged number to IEEE-754.
#[derive(Debug, Clone)]
pub struct OutputIeee {
    op: Arc<Operator>,
    format: FpFormat,
}

impl OutputIeee {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        format: FpFormat,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        format.validate()?;
        let (we, wf) = (format.we, format.wf);
        let name = ctx.unique_name(&format!("OutputIEEE_{we}_{wf}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let x = b.add_fp_input("X", we, wf)?;
        let r = b.add_ieee_output("R", we, wf)?;

        b.manage_critical_path(target.eq_comparator_delay(we) + target.lut_delay());
        let exn_is = |b: &OperatorBuilder<'_>, e: Exn| {
            Cond::eq(format.exn_of(b, x), constant(e.code(), 2))
        };
        let exp_min = exn_is(&b, Exn::Normal)
            .and(Cond::eq(format.exponent_of(&b, x), Expr::zeros(we)));
        let exp_max = exn_is(&b, Exn::Normal)
            .and(Cond::eq(format.exponent_of(&b, x), Expr::ones(we)));
        let sign = format.sign_of(&b, x);
        let zero = Expr::concat(vec![sign.clone(), Expr::zeros(we + wf)]);
        let infinity = Expr::concat(vec![sign.clone(), Expr::ones(we), Expr::zeros(wf)]);
        b.assign_when(
            r,
            vec![
                (exn_is(&b, Exn::Zero), zero.clone()),
                (exp_min, zero),
                (exn_is(&b, Exn::Infinity), infinity.clone()),
                (exp_max, infinity),
                (
                    exn_is(&b, Exn::NaN),
                    constant_natural(&ieee_quiet_nan(format), 1 + we + wf),
                ),
            ],
            Expr::concat(vec![sign, format.exponent_of(&b, x), format.fraction_of(&b, x)]),
        )?;
        let op = b.finish(ctx)?;
        Ok(Self { op, format })
    }
}

impl ArithmeticOperator for OutputIeee {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let f = self.format;
        let x = f.decode(tc.input("X")?);
        let r = match x.exn {
            Exn::Zero => ieee_zero(f, x.sign),
            Exn::Normal if x.exponent == 0 => ieee_zero(f, x.sign),
            Exn::Normal if Natural::from(x.exponent) == all_ones(f.we) => {
                ieee_infinity(f, x.sign)
            }
            Exn::Normal => {
                ieee_zero(f, x.sign) + (Natural::from(x.exponent) << u64::from(f.wf)) + x.fraction
            }
            Exn::Infinity => ieee_infinity(f, x.sign),
            Exn::NaN => ieee_quiet_nan(f),
        };
        tc.add_expected("R", r)
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let f = self.format;
        let zero = Natural::from(0u32);
        let cases = [
            (f.zero(true), "-0"),
            (f.infinity(false), "+inf"),
            (f.nan(), "NaN"),
            (f.one(), "1"),
            (f.normal(false, 0, all_ones(f.wf)), "smallest exponent"),
            (f.normal(true, (1u64 << f.we) - 1, zero), "largest exponent"),
        ];
        for (x, comment) in cases {
            let mut tc = self.new_test_case();
            tc.set_input("X", x)?;
            tc.set_comment(comment);
            self.emulate(&mut tc)?;
            tcl.add(tc);
        }
        Ok(())
    }

    /// Draws every exception tag, not only normal numbers.
    fn build_random_test_case(&self, rng: &mut StdRng) -> GenResult<TestCase> {
        let mut tc = self.new_test_case();
        tc.set_input("X", random_bits(rng, self.format.width()))?;
        self.emulate(&mut tc)?;
        Ok(tc)
    }
}
