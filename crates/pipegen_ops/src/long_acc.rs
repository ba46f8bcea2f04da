//! Long fixed-point accumulator of floating-point inputs.
//!
//! Every input is shifted into a fixed-point summand spanning the weights
//! `2^lsb_acc` to `2^msb_acc` and added to a register that is wide enough
//! to hold the exact running sum, so that rounding happens only once, when
//! the sum is read out (see [`LongAcc2Fp`](crate::LongAcc2Fp)).
//!
//! The accumulation loop is a carry-save adder cut into chunks that fit in
//! one cycle: chunk `i` adds its slice of the summand and the carry-out of
//! chunk `i - 1` from the previous cycle. The outputs are the chunk sums
//! `A` and the pending carries `C`; the accumulated value is `A + C`
//! modulo `2^size`, in two's complement.
//!
//! Raising `newDataSet` together with an input starts a new sum from that
//! input and clears the flags.

use crate::int_multiplier::aligned;
use crate::shifter::{ShiftDirection, Shifter};
use crate::{DelayMap, Exn, FpFormat};
use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use pipegen_common::bits::{all_ones, mask};
use pipegen_common::{intlog2, GenResult, InternalError};
use pipegen_core::{
    constant, random_bits, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder,
    PortMap, TestCase, TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator, SignalId, SignalKind};
use pipegen_target::Target;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::{Arc, Mutex};

/// Carry-save state of the accumulator, mirrored by the model.
#[derive(Debug, Clone, Default)]
struct AccState {
    sums: Vec<Natural>,
    /// `carries[i]` enters chunk `i`; `carries[0]` is unused.
    carries: Vec<Natural>,
    overflow: bool,
    underflow: bool,
}

/// Accumulates `X` into a `msb_acc - lsb_acc + 1`-bit register.
#[derive(Debug)]
pub struct LongAcc {
    op: Arc<Operator>,
    format: FpFormat,
    msb_acc: i32,
    lsb_acc: i32,
    max_msb_in: i32,
    chunks: Vec<u32>,
    state: Mutex<AccState>,
}

/// Renders a signed weight for an entity name.
pub(crate) fn weight_name(w: i32) -> String {
    if w < 0 {
        format!("M{}", -w)
    } else {
        w.to_string()
    }
}

impl LongAcc {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        format: FpFormat,
        msb_acc: i32,
        lsb_acc: i32,
        max_msb_in: i32,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        format.validate()?;
        if !target.is_pipelined() {
            return Err(GenError::config(
                "pipeline",
                "the accumulator loop needs a pipelined target",
            ));
        }
        let bias = format.bias();
        let max_exp = (1i64 << format.we) - 1;
        if i64::from(lsb_acc) + bias < 0 {
            return Err(GenError::config(
                "lsb_acc",
                format!("must be at least {} for this exponent width", -bias),
            ));
        }
        if i64::from(max_msb_in) + bias < 0 || i64::from(max_msb_in) + bias > max_exp {
            return Err(GenError::config(
                "max_msb_in",
                format!("must be between {} and {}", -bias, max_exp - bias),
            ));
        }
        if max_msb_in > msb_acc {
            return Err(GenError::config(
                "max_msb_in",
                format!("must not exceed msb_acc = {msb_acc}"),
            ));
        }
        if lsb_acc >= max_msb_in {
            return Err(GenError::config(
                "lsb_acc",
                format!("must be below max_msb_in = {max_msb_in}"),
            ));
        }

        let (we, wf) = (format.we, format.wf);
        let size = (msb_acc - lsb_acc + 1) as u32;
        let max_shift = (max_msb_in - lsb_acc) as u32;
        let name = ctx.unique_name(&format!(
            "LongAcc_{we}_{wf}_{}_{}_{}",
            weight_name(msb_acc),
            weight_name(lsb_acc),
            weight_name(max_msb_in)
        ));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        b.set_description(format!(
            "Accumulator of weights 2^{lsb_acc} to 2^{msb_acc}, inputs up to 2^{max_msb_in}"
        ));
        let x = b.add_fp_input("X", we, wf)?;
        let nds = b.add_input("newDataSet", 1)?;
        let a_out = b.add_output("A", size)?;
        let c_out = b.add_output("C", size)?;
        let ovf_out = b.add_output("XOverflow", 1)?;
        let unf_out = b.add_output("XUnderflow", 1)?;

        // position of the leading bit of X in the accumulator
        b.manage_critical_path(target.adder_delay(we + 1));
        let shift_val = b.define(
            "shiftVal",
            Expr::concat(vec![Expr::bit(false), format.exponent_of(&b, x)])
                .sub(constant((bias + i64::from(lsb_acc)) as u64, we + 1)),
        )?;
        b.manage_critical_path(target.eq_comparator_delay(we + 1) + target.lut_delay());
        let normal = Cond::eq(format.exn_of(&b, x), constant(Exn::Normal.code(), 2));
        let neg = b.define("shiftNeg", b.bit(shift_val, we))?;
        let too_big = b.declare("shiftTooBig", 1)?;
        b.assign_when(
            too_big,
            vec![(
                Cond::gt(b.s(shift_val), constant(u64::from(max_shift), we + 1)),
                Expr::bit(true),
            )],
            Expr::bit(false),
        )?;
        let flushed = b.declare("flushed", 1)?;
        b.assign_when(
            flushed,
            vec![(
                normal
                    .clone()
                    .not()
                    .or(Cond::is_set(b.s(neg)))
                    .or(Cond::is_set(b.s(too_big))),
                Expr::bit(true),
            )],
            Expr::bit(false),
        )?;
        let ovf_cond = b.declare("xOverflowCond", 1)?;
        b.assign_when(
            ovf_cond,
            vec![
                (Cond::is_set(b.bit(x, we + wf + 2)), Expr::bit(true)),
                (
                    normal
                        .clone()
                        .and(Cond::is_set(b.s(neg)).not())
                        .and(Cond::is_set(b.s(too_big))),
                    Expr::bit(true),
                ),
            ],
            Expr::bit(false),
        )?;
        let unf_cond = b.declare("xUnderflowCond", 1)?;
        b.assign_when(
            unf_cond,
            vec![(normal.and(Cond::is_set(b.s(neg))), Expr::bit(true))],
            Expr::bit(false),
        )?;

        let sw = intlog2(u64::from(max_shift));
        let shifter = Shifter::new(
            ctx,
            target,
            wf + 1,
            max_shift,
            ShiftDirection::Left,
            &DelayMap::new(),
        )?;
        let shifted = b.instantiate(
            shifter.operator(),
            "inputShifter",
            PortMap::new()
                .input("X", format.significand_of(&b, x))
                .input("S", b.slice(shift_val, sw - 1, 0))
                .output("R", "shiftedSignificand"),
        )?;
        b.sync_with(&shifted)?;

        b.manage_critical_path(target.lut_delay() + target.local_wire_delay(size));
        let magnitude = b.define(
            "summandMagnitude",
            aligned(
                b.slice(shifted[0], wf + max_shift, wf),
                max_shift + 1,
                0,
                size,
            ),
        )?;
        let sign = format.sign_of(&b, x);
        let summand = b.declare("summand2c", size)?;
        b.assign_when(
            summand,
            vec![
                (Cond::is_set(b.s(flushed)), Expr::zeros(size)),
                (Cond::is_set(sign.clone()), b.s(magnitude).not()),
            ],
            b.s(magnitude),
        )?;
        let carry0 = b.define("carry0", sign.and(b.s(flushed).not()))?;

        let slack = target.local_wire_delay(1) + target.lut_delay();
        let chunk = target.suggest_slack_subadd_size(size, slack);
        let mut chunks = Vec::new();
        let mut low = 0;
        while low < size {
            chunks.push(chunk.min(size - low));
            low += chunk;
        }

        // the loop: registers read at cycle T, chunk sums defined at T + 1
        let mut ext: Vec<SignalId> = Vec::with_capacity(chunks.len());
        for (i, &c) in chunks.iter().enumerate() {
            ext.push(b.declare_feedback(&format!("acc{i}_ext"), c + 1)?);
        }
        let ovf_ext = b.declare_feedback("xOverflow_ext", 1)?;
        let unf_ext = b.declare_feedback("xUnderflow_ext", 1)?;

        let mut acc = Vec::with_capacity(chunks.len());
        let mut carry = Vec::with_capacity(chunks.len());
        for (i, &c) in chunks.iter().enumerate() {
            let r = b.declare_kind(&format!("acc{i}"), c, SignalKind::RegisteredWithSyncReset)?;
            b.assign(r, b.slice(ext[i], c - 1, 0))?;
            acc.push(r);
            if i > 0 {
                let prev = chunks[i - 1];
                carry.push(Some(b.define(&format!("carry{i}"), b.bit(ext[i - 1], prev))?));
            } else {
                carry.push(None);
            }
        }
        let ovf_prev = b.define("xOverflowPrev", b.s(ovf_ext))?;
        let unf_prev = b.define("xUnderflowPrev", b.s(unf_ext))?;

        b.next_cycle();
        let mut low = 0;
        for (i, &c) in chunks.iter().enumerate() {
            let kept = b.s(acc[i]).and(Expr::replicate(b.s(nds), c).not());
            let carry_in = match carry[i] {
                Some(k) => b.s(k).and(b.s(nds).not()),
                None => b.s(carry0),
            };
            b.assign(
                ext[i],
                Expr::concat(vec![Expr::bit(false), kept])
                    .add(Expr::concat(vec![Expr::bit(false), b.slice(summand, low + c - 1, low)]))
                    .add(carry_in),
            )?;
            low += c;
        }
        b.assign(
            ovf_ext,
            b.s(ovf_prev).and(b.s(nds).not()).or(b.s(ovf_cond)),
        )?;
        b.assign(
            unf_ext,
            b.s(unf_prev).and(b.s(nds).not()).or(b.s(unf_cond)),
        )?;

        let sums = chunks
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &c)| b.slice(ext[i], c - 1, 0))
            .collect();
        b.assign(a_out, Expr::concat(sums))?;
        let mut carries = Vec::new();
        for (i, &c) in chunks.iter().enumerate().rev() {
            if c > 1 {
                carries.push(Expr::zeros(c - 1));
            }
            carries.push(if i == 0 {
                Expr::bit(false)
            } else {
                b.bit(ext[i - 1], chunks[i - 1])
            });
        }
        b.assign(c_out, Expr::concat(carries))?;
        b.assign(ovf_out, b.s(ovf_ext))?;
        b.assign(unf_out, b.s(unf_ext))?;

        let op = b.finish(ctx)?;
        let state = AccState {
            sums: vec![Natural::from(0u32); chunks.len()],
            carries: vec![Natural::from(0u32); chunks.len()],
            ..AccState::default()
        };
        Ok(Self {
            op,
            format,
            msb_acc,
            lsb_acc,
            max_msb_in,
            chunks,
            state: Mutex::new(state),
        })
    }

    pub fn format(&self) -> FpFormat {
        self.format
    }

    /// Width of the accumulator.
    pub fn size(&self) -> u32 {
        (self.msb_acc - self.lsb_acc + 1) as u32
    }

    pub fn weights(&self) -> (i32, i32, i32) {
        (self.msb_acc, self.lsb_acc, self.max_msb_in)
    }

    /// Chunk widths of the carry-save loop, least significant first.
    pub fn chunks(&self) -> &[u32] {
        &self.chunks
    }

    /// The two's complement summand of `x`, its carry-in, and the
    /// overflow and underflow conditions it raises.
    fn summand(&self, x: &Natural) -> (Natural, bool, bool, bool) {
        let f = self.format;
        let v = f.decode(x);
        let shift = v.exponent as i64 - (f.bias() + i64::from(self.lsb_acc));
        let max_shift = i64::from(self.max_msb_in - self.lsb_acc);
        let normal = v.exn == Exn::Normal;
        let overflow = matches!(v.exn, Exn::Infinity | Exn::NaN) || (normal && shift > max_shift);
        let underflow = normal && shift < 0;
        if !normal || shift < 0 || shift > max_shift {
            return (Natural::from(0u32), false, overflow, underflow);
        }
        let significand = Natural::power_of_2(u64::from(f.wf)) + &v.fraction;
        let magnitude = (significand << shift as u64) >> u64::from(f.wf);
        if v.sign {
            (all_ones(self.size()) - magnitude, true, overflow, underflow)
        } else {
            (magnitude, false, overflow, underflow)
        }
    }

    fn case(&self, x: Natural, nds: bool, comment: &str) -> GenResult<TestCase> {
        let mut tc = self.new_test_case();
        tc.set_input("X", x)?;
        tc.set_input("newDataSet", Natural::from(u32::from(nds)))?;
        tc.set_comment(comment);
        self.emulate(&mut tc)?;
        Ok(tc)
    }
}

impl ArithmeticOperator for LongAcc {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    /// Advances the model by one input, exactly as the carry-save loop
    /// does; test cases must be emulated in the order they are simulated.
    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let nds = *tc.input("newDataSet")? != 0u32;
        let (summand, carry0, overflow, underflow) = self.summand(tc.input("X")?);
        let mut state = self
            .state
            .lock()
            .map_err(|_| InternalError::new("accumulator model lock poisoned"))?;
        if nds {
            state.sums.iter_mut().for_each(|s| *s = Natural::from(0u32));
            state.carries.iter_mut().for_each(|c| *c = Natural::from(0u32));
            state.overflow = false;
            state.underflow = false;
        }
        let mut a = Natural::from(0u32);
        let mut c_out = Natural::from(0u32);
        let mut next_carries = vec![Natural::from(0u32); self.chunks.len()];
        let mut low = 0u64;
        for (i, &c) in self.chunks.iter().enumerate() {
            let slice = mask(&(&summand >> low), c);
            let carry_in = if i == 0 {
                Natural::from(u32::from(carry0))
            } else {
                state.carries[i].clone()
            };
            let ext = &state.sums[i] + slice + carry_in;
            let sum = mask(&ext, c);
            let carry_out = ext >> u64::from(c);
            a += &sum << low;
            state.sums[i] = sum;
            low += u64::from(c);
            if i + 1 < self.chunks.len() {
                c_out += &carry_out << low;
                next_carries[i + 1] = carry_out;
            }
        }
        state.carries = next_carries;
        state.overflow |= overflow;
        state.underflow |= underflow;
        let (ovf, unf) = (state.overflow, state.underflow);
        drop(state);
        tc.add_expected("A", a)?;
        tc.add_expected("C", c_out)?;
        tc.add_expected("XOverflow", Natural::from(u32::from(ovf)))?;
        tc.add_expected("XUnderflow", Natural::from(u32::from(unf)))
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let f = self.format;
        let bias = f.bias();
        let zero = Natural::from(0u32);
        let top = (i64::from(self.max_msb_in) + bias) as u64;
        let bottom = (i64::from(self.lsb_acc) + bias) as u64;
        let largest = f.normal(false, top, all_ones(f.wf));
        tcl.add(self.case(largest.clone(), true, "new sum from the largest input")?);
        tcl.add(self.case(f.normal(true, top, all_ones(f.wf)), false, "cancels it")?);
        tcl.add(self.case(f.normal(true, bottom, zero.clone()), false, "least significant weight")?);
        if bottom > 0 {
            tcl.add(self.case(f.normal(false, bottom - 1, zero.clone()), false, "underflow")?);
        }
        if top < f.max_exponent() as u64 {
            tcl.add(self.case(f.normal(false, top + 1, zero.clone()), false, "overflow")?);
        }
        tcl.add(self.case(f.infinity(true), false, "infinity")?);
        tcl.add(self.case(f.zero(true), false, "zero")?);
        tcl.add(self.case(largest, true, "flags cleared by a new sum")?);
        Ok(())
    }

    /// Exponents are drawn around the accepted range, so that both flags
    /// are raised now and then; one draw in eight starts a new sum.
    fn build_random_test_case(&self, rng: &mut StdRng) -> GenResult<TestCase> {
        let f = self.format;
        let bias = f.bias();
        let nds = rng.gen_range(0..8) == 0;
        let sign = rng.gen_bool(0.5);
        let x = match rng.gen_range(0..32) {
            0 => f.infinity(sign),
            1 => f.zero(sign),
            _ => {
                let lo = (i64::from(self.lsb_acc) + bias - 2).max(0);
                let hi = (i64::from(self.max_msb_in) + bias + 1).min(f.max_exponent());
                let exponent = rng.gen_range(lo..=hi) as u64;
                f.normal(sign, exponent, random_bits(rng, f.wf))
            }
        };
        self.case(x, nds, "")
    }
}
