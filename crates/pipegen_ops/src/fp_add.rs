//! Single-path floating-point adder with correct rounding.
//!
//! The operands are swapped so that `X` has the larger magnitude, the
//! significand of `Y` is aligned by a right [`Shifter`] (bits shifted past
//! the guard positions are ORed into one sticky bit), the aligned
//! significands are added or subtracted by an [`IntAdder`], and the sum is
//! normalized by a leading zero counter before rounding to nearest even.
//!
//! Three guard bits are enough: when the alignment loses bits, the exponents
//! differ by at least 3 and the sum needs at most one position of
//! normalization.

use crate::float::{round_and_pack, Exn, FpFormat, Packing};
use crate::int_adder::IntAdder;
use crate::lzoc::{LeadingDigit, LzocShifterSticky};
use crate::shifter::{ShiftDirection, Shifter};
use crate::DelayMap;
use malachite::Natural;
use pipegen_common::bits::all_ones;
use pipegen_common::{intlog2, GenResult};
use pipegen_core::{
    constant, random_bits, random_normal_float, ArithmeticOperator, GenError, GenerationContext,
    OperatorBuilder, PortMap, TestCase, TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator};
use pipegen_target::Target;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// `R = X + Y`, correctly rounded.
#[derive(Debug, Clone)]
pub struct FpAdd {
    op: Arc<Operator>,
    format: FpFormat,
}

impl FpAdd {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        format: FpFormat,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        format.validate()?;
        let (we, wf) = (format.we, format.wf);
        let name = ctx.unique_name(&format!("FPAdd_{we}_{wf}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        b.set_description("Single-path floating-point adder, round to nearest even");
        let x = b.add_fp_input("X", we, wf)?;
        let y = b.add_fp_input("Y", we, wf)?;
        let r = b.add_fp_output("R", we, wf, 1)?;

        // order the operands by exception tag, then magnitude
        b.manage_critical_path(target.adder_delay(we + wf + 2));
        let key = |b: &OperatorBuilder<'_>, id| {
            Expr::concat(vec![format.exn_of(b, id), b.slice(id, we + wf - 1, 0)])
        };
        let swap = b.declare("swap", 1)?;
        b.assign_when(
            swap,
            vec![(Cond::lt(key(&b, x), key(&b, y)), Expr::bit(true))],
            Expr::bit(false),
        )?;
        b.manage_critical_path(target.lut_delay() + target.local_wire_delay(we + wf + 3));
        let new_x = b.declare_fp("newX", we, wf)?;
        let new_y = b.declare_fp("newY", we, wf)?;
        b.assign_when(new_x, vec![(Cond::is_set(b.s(swap)), b.s(y))], b.s(x))?;
        b.assign_when(new_y, vec![(Cond::is_set(b.s(swap)), b.s(x))], b.s(y))?;

        b.manage_critical_path(target.adder_delay(we));
        let exn_x = b.define("exnX", format.exn_of(&b, new_x))?;
        let exn_y = b.define("exnY", format.exn_of(&b, new_y))?;
        let sign_x = b.define("signX", format.sign_of(&b, new_x))?;
        let sign_y = b.define("signY", format.sign_of(&b, new_y))?;
        let eff_sub = b.define("effSub", b.s(sign_x).xor(b.s(sign_y)))?;
        let exp_diff = b.define(
            "expDiff",
            format.exponent_of(&b, new_x).sub(format.exponent_of(&b, new_y)),
        )?;
        let sig_y = b.declare("sigY", wf + 1)?;
        b.assign_when(
            sig_y,
            vec![(
                Cond::eq(b.s(exn_y), constant(Exn::Normal.code(), 2)),
                format.significand_of(&b, new_y),
            )],
            Expr::zeros(wf + 1),
        )?;

        // alignment shift, saturated at wf + 3
        let max_shift = wf + 3;
        let sw = intlog2(u64::from(max_shift));
        let shift_val = b.declare("shiftVal", sw)?;
        if (1u64 << we) - 1 <= u64::from(wf + 2) {
            b.assign(
                shift_val,
                Expr::concat(vec![Expr::zeros(sw - we), b.s(exp_diff)]),
            )?;
        } else {
            b.manage_critical_path(target.adder_delay(we));
            b.assign_when(
                shift_val,
                vec![(
                    Cond::gt(b.s(exp_diff), constant(u64::from(wf + 2), we)),
                    constant(u64::from(max_shift), sw),
                )],
                b.slice(exp_diff, sw - 1, 0),
            )?;
        }
        let shifter = Shifter::new(
            ctx,
            target,
            wf + 1,
            max_shift,
            ShiftDirection::Right,
            &DelayMap::new(),
        )?;
        let shifted = b.instantiate(
            shifter.operator(),
            "rightShifter",
            PortMap::new()
                .input("X", b.s(sig_y))
                .input("S", b.s(shift_val))
                .output("R", "shiftedY"),
        )?;
        b.sync_with(&shifted)?;
        let shifted_y = shifted[0];

        b.manage_critical_path(target.eq_comparator_delay(wf + 1));
        let sticky_y = b.declare("stickyY", 1)?;
        b.assign_when(
            sticky_y,
            vec![(
                Cond::ne(b.slice(shifted_y, wf, 0), Expr::zeros(wf + 1)),
                Expr::bit(true),
            )],
            Expr::bit(false),
        )?;
        let aligned_y = b.define(
            "alignedY",
            Expr::concat(vec![
                Expr::bit(false),
                b.slice(shifted_y, 2 * wf + 3, wf + 1),
                b.s(sticky_y),
            ]),
        )?;
        let aligned_x = b.define(
            "alignedX",
            Expr::concat(vec![
                Expr::bit(false),
                format.significand_of(&b, new_x),
                Expr::zeros(3),
            ]),
        )?;

        let sw_add = wf + 5;
        let adder = IntAdder::new(ctx, target, sw_add, &DelayMap::new())?;
        b.manage_critical_path(target.lut_delay());
        let sum = b.instantiate(
            adder.operator(),
            "significandAdder",
            PortMap::new()
                .input("X", b.s(aligned_x))
                .input(
                    "Y",
                    b.s(aligned_y).xor(Expr::replicate(b.s(eff_sub), sw_add)),
                )
                .input("Cin", b.s(eff_sub))
                .output("R", "significandSum"),
        )?;
        b.sync_with(&sum)?;

        let lzc = LzocShifterSticky::new(
            ctx,
            target,
            sw_add,
            sw_add,
            LeadingDigit::Zero,
            &DelayMap::new(),
        )?;
        let norm = b.instantiate(
            lzc.operator(),
            "normalizer",
            PortMap::new()
                .input("I", b.s(sum[0]))
                .output("Count", "nZeros")
                .output("O", "normalizedSum"),
        )?;
        b.sync_with(&norm)?;
        let (n_zeros, normalized) = (norm[0], norm[1]);
        let cw = lzc.count_width();

        let ew = (we + 2).max(cw + 1);
        b.manage_critical_path(target.adder_delay(ew));
        let exp_pre = b.define(
            "expPreRound",
            Expr::concat(vec![Expr::zeros(ew - we), format.exponent_of(&b, new_x)])
                .add(constant(1, ew))
                .sub(Expr::concat(vec![Expr::zeros(ew - cw), b.s(n_zeros)])),
        )?;

        b.manage_critical_path(target.eq_comparator_delay(3) + target.lut_delay());
        let round_up = b.define(
            "roundUp",
            b.bit(normalized, 3).and(
                b.bit(normalized, 4)
                    .or(b.bit(normalized, 2))
                    .or(b.bit(normalized, 1))
                    .or(b.bit(normalized, 0)),
            ),
        )?;
        let fraction = b.define("fracPreRound", b.slice(normalized, wf + 3, 4))?;

        let zero_sum = Cond::eq(b.s(n_zeros), constant(u64::from(sw_add), cw));
        let exn_x_is = |b: &OperatorBuilder<'_>, e: Exn| Cond::eq(b.s(exn_x), constant(e.code(), 2));
        let exn_pre = b.declare("exnPreRound", 2)?;
        b.assign_when(
            exn_pre,
            vec![
                (exn_x_is(&b, Exn::NaN), constant(Exn::NaN.code(), 2)),
                (
                    exn_x_is(&b, Exn::Infinity)
                        .and(Cond::eq(b.s(exn_y), constant(Exn::Infinity.code(), 2)))
                        .and(Cond::is_set(b.s(eff_sub))),
                    constant(Exn::NaN.code(), 2),
                ),
                (exn_x_is(&b, Exn::Infinity), constant(Exn::Infinity.code(), 2)),
                (exn_x_is(&b, Exn::Zero), constant(Exn::Zero.code(), 2)),
                (zero_sum.clone(), constant(Exn::Zero.code(), 2)),
            ],
            constant(Exn::Normal.code(), 2),
        )?;
        let sign_r = b.declare("signR", 1)?;
        b.assign_when(
            sign_r,
            vec![
                (exn_x_is(&b, Exn::Zero), b.s(sign_x).and(b.s(sign_y))),
                (exn_x_is(&b, Exn::Normal).and(zero_sum), Expr::bit(false)),
            ],
            b.s(sign_x),
        )?;

        let packed = round_and_pack(
            &mut b,
            format,
            Packing {
                exn: exn_pre,
                sign: sign_r,
                exponent: exp_pre,
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

    /// Exact sum of two normal numbers, rounded to nearest even.
    fn add_normals(&self, x: &crate::FpValue, y: &crate::FpValue) -> Natural {
        let f = self.format;
        let (mx, ex) = f.scaled(x);
        let (my, ey) = f.scaled(y);
        let ((mb, eb, sb), (ms, es, ss)) = if ex >= ey {
            ((mx, ex, x.sign), (my, ey, y.sign))
        } else {
            ((my, ey, y.sign), (mx, ex, x.sign))
        };
        let d = (eb - es) as u64;
        let far = u64::from(2 * f.wf + 6);
        // a far operand is replaced by a stand-in below a quarter ulp of
        // the near one; both round the same way
        let (vb, vs, e) = if d <= far {
            (mb << d, ms, es)
        } else {
            let lift = u64::from(f.wf + 4);
            (mb << lift, Natural::from(1u32), eb - lift as i64)
        };
        let (mag, sign) = if sb == ss {
            (vb + vs, sb)
        } else if vb >= vs {
            (vb - vs, sb)
        } else {
            (vs - vb, ss)
        };
        if mag == 0u32 {
            return f.zero(false);
        }
        f.round(sign, &mag, e, false, crate::Rounding::NearestEven)
    }
}

impl ArithmeticOperator for FpAdd {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let f = self.format;
        let x = f.decode(tc.input("X")?);
        let y = f.decode(tc.input("Y")?);
        let r = match (x.exn, y.exn) {
            (Exn::NaN, _) | (_, Exn::NaN) => f.nan(),
            (Exn::Infinity, Exn::Infinity) if x.sign != y.sign => f.nan(),
            (Exn::Infinity, _) => f.infinity(x.sign),
            (_, Exn::Infinity) => f.infinity(y.sign),
            (Exn::Zero, Exn::Zero) => f.zero(x.sign && y.sign),
            (Exn::Zero, Exn::Normal) => f.normal(y.sign, y.exponent, y.fraction.clone()),
            (Exn::Normal, Exn::Zero) => f.normal(x.sign, x.exponent, x.fraction.clone()),
            (Exn::Normal, Exn::Normal) => self.add_normals(&x, &y),
        };
        tc.add_expected("R", r)
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let f = self.format;
        let zero = Natural::from(0u32);
        let bias = f.bias() as u64;
        let one = f.one();
        let minus_one = f.normal(true, bias, zero.clone());
        let dirty_zero = f.encode(&crate::FpValue {
            exn: Exn::Zero,
            sign: false,
            exponent: bias + 3,
            fraction: all_ones(f.wf),
        });
        // an infinity whose fields cancel the significand of the other operand
        let masked_infinity = f.encode(&crate::FpValue {
            exn: Exn::Infinity,
            sign: true,
            exponent: bias,
            fraction: Natural::from(0u32),
        });
        let largest = f.normal(false, f.max_exponent() as u64, all_ones(f.wf));
        let below_one = f.normal(true, bias - 1, all_ones(f.wf));
        let cases = [
            (one.clone(), minus_one, "1 + -1 gives +0"),
            (one.clone(), f.infinity(false), "1 + inf"),
            (f.infinity(false), f.infinity(true), "inf + -inf"),
            (one.clone(), dirty_zero, "1 + zero with garbage fields"),
            (masked_infinity, one.clone(), "-inf + 1 with cancelling fields"),
            (f.zero(true), f.zero(true), "-0 + -0"),
            (f.zero(true), f.zero(false), "-0 + +0"),
            (f.nan(), one.clone(), "NaN + 1"),
            (largest.clone(), largest, "overflow"),
            (one.clone(), below_one, "massive cancellation"),
        ];
        for (x, y, comment) in cases {
            tcl.add(self.case(x, y, comment)?);
        }
        if let Some(e) = bias.checked_sub(u64::from(f.wf) + 1) {
            tcl.add(self.case(one, f.normal(false, e, zero), "tie to even")?);
        }
        Ok(())
    }

    /// Half of the draws put both operands within a few binades of each
    /// other, where cancellation and rounding carries happen.
    fn build_random_test_case(&self, rng: &mut StdRng) -> GenResult<TestCase> {
        let f = self.format;
        let x = random_normal_float(rng, f.we, f.wf);
        let y = if rng.gen_bool(0.5) {
            let ex = f.decode(&x).exponent as i64;
            let ey = (ex + rng.gen_range(-3i64..=3)).clamp(0, f.max_exponent());
            f.normal(rng.gen_bool(0.5), ey as u64, random_bits(rng, f.wf))
        } else {
            random_normal_float(rng, f.we, f.wf)
        };
        self.case(x, y, "")
    }
}
