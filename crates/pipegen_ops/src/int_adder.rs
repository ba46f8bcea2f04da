//! Pipelined integer adder.
//!
//! The addition `X + Y + Cin` is cut into chunks that each fit in one clock
//! period on the target's carry chain. Chunk `k` is computed in cycle `k`
//! from the registered carry-out of chunk `k - 1`, so a wide adder costs one
//! register stage per extra chunk and never produces a single delay larger
//! than the period.

use crate::DelayMap;
use malachite::Natural;
use pipegen_common::bits::{all_ones, mask};
use pipegen_common::GenResult;
use pipegen_core::{
    ArithmeticOperator, GenError, GenerationContext, OperatorBuilder, TestCase, TestCaseList,
};
use pipegen_ir::{Expr, Operator};
use pipegen_target::Target;
use std::sync::Arc;

/// `R = (X + Y + Cin) mod 2^width`.
#[derive(Debug, Clone)]
pub struct IntAdder {
    op: Arc<Operator>,
    width: u32,
    chunks: Vec<u32>,
}

impl IntAdder {
    /// Generates a `width`-bit adder.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error if `width` is zero.
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        width: u32,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        if width == 0 {
            return Err(GenError::config("input_width", "an adder needs at least one bit"));
        }
        let name = ctx.unique_name(&format!("IntAdder_{width}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let chunk = target.suggest_subadd_size(width);
        b.set_description(format!("Integer adder in chunks of {chunk} bits"));

        let x = b.add_input("X", width)?;
        let y = b.add_input("Y", width)?;
        let cin = b.add_input("Cin", 1)?;
        let r = b.add_output("R", width)?;

        let mut chunks = Vec::new();
        let mut low = 0;
        while low < width {
            chunks.push(chunk.min(width - low));
            low += chunk;
        }

        let mut sums = Vec::with_capacity(chunks.len());
        let mut low = 0;
        for (k, &c) in chunks.iter().enumerate() {
            if k > 0 {
                b.next_cycle();
            }
            b.manage_critical_path(target.adder_delay(c));
            let carry = match sums.last() {
                None => b.s(cin),
                Some(&(prev, prev_width)) => b.bit(prev, prev_width),
            };
            let sum = b.define(
                &format!("sum{k}"),
                Expr::concat(vec![Expr::bit(false), b.slice(x, low + c - 1, low)])
                    .add(Expr::concat(vec![Expr::bit(false), b.slice(y, low + c - 1, low)]))
                    .add(carry),
            )?;
            sums.push((sum, c));
            low += c;
        }

        let parts = sums
            .iter()
            .rev()
            .map(|&(sum, c)| b.slice(sum, c - 1, 0))
            .collect();
        b.assign(r, Expr::concat(parts))?;
        let op = b.finish(ctx)?;
        Ok(Self { op, width, chunks })
    }

    /// Width of the operands.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Chunk widths, least significant first.
    pub fn chunks(&self) -> &[u32] {
        &self.chunks
    }
}

impl ArithmeticOperator for IntAdder {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let sum = tc.input("X")? + tc.input("Y")? + tc.input("Cin")?;
        tc.add_expected("R", mask(&sum, self.width))
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let ones = all_ones(self.width);
        let zero = Natural::from(0u32);
        let cases = [
            (ones.clone(), zero.clone(), 1u32, "carry through every chunk"),
            (ones.clone(), ones, 1, "largest operands"),
            (zero.clone(), zero, 0, "zero"),
        ];
        for (x, y, cin, comment) in cases {
            let mut tc = self.new_test_case();
            tc.set_input("X", x)?;
            tc.set_input("Y", y)?;
            tc.set_input("Cin", Natural::from(cin))?;
            tc.set_comment(comment);
            self.emulate(&mut tc)?;
            tcl.add(tc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_passed, combinatorial_target, differential, exhaustive, target};

    #[test]
    fn wide_adder_is_chunked() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let adder = IntAdder::new(&mut ctx, t.as_ref(), 200, &DelayMap::new()).unwrap();
        assert_eq!(adder.chunks(), &[67, 67, 66]);
        assert_eq!(adder.operator().pipeline_depth, 2);
        assert_eq!(adder.operator().name, "IntAdder_200_uid1");
        assert_passed(&differential(&adder, 200));
    }

    #[test]
    fn narrow_adder_is_one_chunk() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let adder = IntAdder::new(&mut ctx, t.as_ref(), 5, &DelayMap::new()).unwrap();
        assert_eq!(adder.chunks(), &[5]);
        assert_eq!(adder.operator().pipeline_depth, 0);
        assert_passed(&exhaustive(&adder));
    }

    #[test]
    fn late_inputs_push_the_adder_to_the_next_cycle() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let delays = DelayMap::from([("X".to_string(), 1.9)]);
        let adder = IntAdder::new(&mut ctx, t.as_ref(), 32, &delays).unwrap();
        assert_eq!(adder.operator().pipeline_depth, 1);
        assert_passed(&differential(&adder, 50));
    }

    #[test]
    fn combinatorial_adder_has_no_registers() {
        let t = combinatorial_target();
        let mut ctx = GenerationContext::new();
        let adder = IntAdder::new(&mut ctx, t.as_ref(), 100, &DelayMap::new()).unwrap();
        assert_eq!(adder.chunks(), &[100]);
        assert!(!adder.operator().is_sequential());
        assert_passed(&differential(&adder, 50));
    }

    #[test]
    fn emulate_wraps_around() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let adder = IntAdder::new(&mut ctx, t.as_ref(), 4, &DelayMap::new()).unwrap();
        let mut tc = adder.new_test_case();
        tc.set_input("X", Natural::from(15u32)).unwrap();
        tc.set_input("Y", Natural::from(2u32)).unwrap();
        tc.set_input("Cin", Natural::from(1u32)).unwrap();
        adder.emulate(&mut tc).unwrap();
        assert_eq!(tc.expected("R"), &[Natural::from(2u32)]);
    }

    #[test]
    fn zero_width_is_rejected() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let err = IntAdder::new(&mut ctx, t.as_ref(), 0, &DelayMap::new()).unwrap_err();
        assert!(err.is_configuration());
    }
}
