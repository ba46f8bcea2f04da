//! Read-out of a [`LongAcc`](crate::LongAcc) as a floating-point number.
//!
//! The carry-save pair is first resolved by an [`IntAdder`], the two's
//! complement sum is turned into sign and magnitude, and the magnitude is
//! normalized by a leading zero counter. This is the only place where the
//! accumulated sum is rounded.

use crate::float::{round_and_pack, Exn, FpFormat, Packing};
use crate::int_adder::IntAdder;
use crate::long_acc::weight_name;
use crate::lzoc::{LeadingDigit, LzocShifterSticky};
use crate::DelayMap;
use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use pipegen_common::bits::{all_ones, mask};
use pipegen_common::{intlog2, GenResult};
use pipegen_core::{
    constant, random_bits, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder,
    PortMap, TestCase, TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator};
use pipegen_target::Target;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// `R = round((A + C) * 2^lsb_acc)`, with `A + C` a `size`-bit two's
/// complement number.
#[derive(Debug, Clone)]
pub struct LongAcc2Fp {
    op: Arc<Operator>,
    format: FpFormat,
    msb_acc: i32,
    lsb_acc: i32,
}

/// Two's complement encoding of `value` on `width` bits.
fn twos_complement(value: i64, width: u32) -> u64 {
    (value as u64) & ((1u64 << width) - 1)
}

/// Bits needed for `value` as a signed number.
fn signed_width(value: i64) -> u32 {
    intlog2(value.unsigned_abs()) + 1
}

impl LongAcc2Fp {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        format: FpFormat,
        msb_acc: i32,
        lsb_acc: i32,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        format.validate()?;
        if lsb_acc >= msb_acc {
            return Err(GenError::config(
                "lsb_acc",
                format!("must be below msb_acc = {msb_acc}"),
            ));
        }
        let (we, wf) = (format.we, format.wf);
        let size = (msb_acc - lsb_acc + 1) as u32;
        let name = ctx.unique_name(&format!(
            "LongAcc2FP_{we}_{wf}_{}_{}",
            weight_name(msb_acc),
            weight_name(lsb_acc)
        ));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let a = b.add_input("A", size)?;
        let c = b.add_input("C", size)?;
        let r = b.add_fp_output("R", we, wf, 1)?;

        let adder = IntAdder::new(ctx, target, size, &DelayMap::new())?;
        let sum = b.instantiate(
            adder.operator(),
            "carryResolution",
            PortMap::new()
                .input("X", b.s(a))
                .input("Y", b.s(c))
                .input("Cin", constant(0, 1))
                .output("R", "accSum"),
        )?;
        b.sync_with(&sum)?;
        b.manage_critical_path(target.lut_delay() + target.local_wire_delay(size));
        let sign = b.define("signR", b.bit(sum[0], size - 1))?;
        let magnitude = b.instantiate(
            adder.operator(),
            "negation",
            PortMap::new()
                .input("X", b.s(sum[0]).xor(Expr::replicate(b.s(sign), size)))
                .input("Y", Expr::zeros(size))
                .input("Cin", b.s(sign))
                .output("R", "magnitude"),
        )?;
        b.sync_with(&magnitude)?;

        let lzc = LzocShifterSticky::new(
            ctx,
            target,
            size,
            wf + 2,
            LeadingDigit::Zero,
            &DelayMap::new(),
        )?;
        let mut ports = PortMap::new()
            .input("I", b.s(magnitude[0]))
            .output("Count", "nZeros")
            .output("O", "normalized");
        if lzc.has_sticky() {
            ports = ports.output("Sticky", "stickyNorm");
        }
        let norm = b.instantiate(lzc.operator(), "normalizer", ports)?;
        b.sync_with(&norm)?;
        let (n_zeros, normalized) = (norm[0], norm[1]);
        let cw = lzc.count_width();

        // the leading one at weight msb_acc - nZeros
        let top = i64::from(msb_acc) + format.bias();
        let ew = (we + 2)
            .max(signed_width(top) + 1)
            .max(signed_width(top - i64::from(size)) + 1)
            .max(cw + 2);
        b.manage_critical_path(target.adder_delay(ew));
        let exponent = b.define(
            "expPreRound",
            constant(twos_complement(top, ew), ew)
                .sub(Expr::concat(vec![Expr::zeros(ew - cw), b.s(n_zeros)])),
        )?;
        b.manage_critical_path(target.lut_delay());
        let sticky = match norm.get(2) {
            Some(&s) => b.s(s),
            None => Expr::bit(false),
        };
        let round_up = b.define(
            "roundUp",
            b.bit(normalized, 0).and(sticky.or(b.bit(normalized, 1))),
        )?;
        let fraction = b.define("fracPreRound", b.slice(normalized, wf, 1))?;
        let exn = b.declare("exnPreRound", 2)?;
        b.assign_when(
            exn,
            vec![(
                Cond::eq(b.s(n_zeros), constant(u64::from(size), cw)),
                constant(Exn::Zero.code(), 2),
            )],
            constant(Exn::Normal.code(), 2),
        )?;

        let packed = round_and_pack(
            &mut b,
            format,
            Packing {
                exn,
                sign,
                exponent,
                fraction,
                round_up,
            },
        )?;
        b.assign(r, b.s(packed))?;
        let op = b.finish(ctx)?;
        Ok(Self {
            op,
            format,
            msb_acc,
            lsb_acc,
        })
    }

    pub fn format(&self) -> FpFormat {
        self.format
    }

    pub fn size(&self) -> u32 {
        (self.msb_acc - self.lsb_acc + 1) as u32
    }

    fn case(&self, a: Natural, c: Natural, comment: &str) -> GenResult<TestCase> {
        let mut tc = self.new_test_case();
        tc.set_input("A", a)?;
        tc.set_input("C", c)?;
        tc.set_comment(comment);
        self.emulate(&mut tc)?;
        Ok(tc)
    }
}

impl ArithmeticOperator for LongAcc2Fp {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let size = self.size();
        let sum = mask(&(tc.input("A")? + tc.input("C")?), size);
        let negative = sum >= Natural::power_of_2(u64::from(size - 1));
        let magnitude = if negative {
            Natural::power_of_2(u64::from(size)) - sum
        } else {
            sum
        };
        let r = if magnitude == 0u32 {
            self.format.zero(false)
        } else {
            self.format.round(
                negative,
                &magnitude,
                i64::from(self.lsb_acc),
                false,
                crate::Rounding::NearestEven,
            )
        };
        tc.add_expected("R", r)
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let size = self.size();
        let zero = Natural::from(0u32);
        let one = Natural::from(1u32);
        let most_negative = Natural::power_of_2(u64::from(size - 1));
        let cases = [
            (zero.clone(), zero.clone(), "zero"),
            (one.clone(), zero.clone(), "least significant weight"),
            (all_ones(size), zero.clone(), "minus one unit"),
            (most_negative.clone(), zero.clone(), "most negative"),
            (&most_negative - &one, zero.clone(), "most positive"),
            (all_ones(size), one, "pending carry cancels"),
        ];
        for (a, c, comment) in cases {
            tcl.add(self.case(a, c, comment)?);
        }
        Ok(())
    }

    /// Draws the number of leading sign bits uniformly, then splits the
    /// sum between `A` and `C`.
    fn build_random_test_case(&self, rng: &mut StdRng) -> GenResult<TestCase> {
        let size = self.size();
        let significant = rng.gen_range(0..size);
        let mut sum = random_bits(rng, significant);
        if rng.gen_bool(0.5) {
            sum = Natural::power_of_2(u64::from(size)) - sum;
        }
        let modulus = Natural::power_of_2(u64::from(size));
        let sum = mask(&sum, size);
        let c = random_bits(rng, size);
        let a = mask(&(sum + &modulus - &c), size);
        self.case(a, c, "")
    }
}
