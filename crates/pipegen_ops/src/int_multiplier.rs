//! Tiled integer multiplier.
//!
//! The operands are cut into tiles the target multiplies in one go (DSP
//! blocks, or small LUT multipliers when hard multipliers are disabled).
//! The aligned tile products are then summed by a balanced tree of
//! [`IntAdder`] instances.

use crate::int_adder::IntAdder;
use crate::DelayMap;
use malachite::Natural;
use pipegen_common::bits::all_ones;
use pipegen_common::GenResult;
use pipegen_core::{
    constant, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder, PortMap, TestCase,
    TestCaseList, UseExpr,
};
use pipegen_ir::{Expr, Operator, SignalId};
use pipegen_target::Target;
use std::sync::Arc;

/// `R = X * Y`, full width.
#[derive(Debug, Clone)]
pub struct IntMultiplier {
    op: Arc<Operator>,
    wx: u32,
    wy: u32,
    tiles: usize,
}

/// Places `value` (of `width` bits) at bit `shift` of a `total`-bit vector.
pub(crate) fn aligned(value: UseExpr, width: u32, shift: u32, total: u32) -> UseExpr {
    let mut parts = Vec::with_capacity(3);
    if shift + width < total {
        parts.push(Expr::zeros(total - shift - width));
    }
    parts.push(value);
    if shift > 0 {
        parts.push(Expr::zeros(shift));
    }
    Expr::concat(parts)
}

impl IntMultiplier {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        wx: u32,
        wy: u32,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        if wx == 0 {
            return Err(GenError::config("input_width", "must be at least 1"));
        }
        if wy == 0 {
            return Err(GenError::config("input_width_y", "must be at least 1"));
        }
        let name = ctx.unique_name(&format!("IntMultiplier_{wx}x{wy}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let (tx, ty) = target.suggest_submult_size(wx, wy);
        let hard = target.use_hard_multipliers();
        b.set_description(format!(
            "{wx}x{wy} multiplier in {tx}x{ty} {} tiles",
            if hard { "DSP" } else { "logic" }
        ));
        let x = b.add_input("X", wx)?;
        let y = b.add_input("Y", wy)?;
        let r = b.add_output("R", wx + wy)?;
        let total = wx + wy;

        let tile_delay = if hard {
            target.dsp_multiplier_delay()
        } else {
            2.0 * (target.lut_delay() + target.local_wire_delay(1))
        };
        b.manage_critical_path(tile_delay);
        let mut products: Vec<SignalId> = Vec::new();
        for (i, xl) in (0..wx).step_by(tx as usize).enumerate() {
            let xw = tx.min(wx - xl);
            for (j, yl) in (0..wy).step_by(ty as usize).enumerate() {
                let yw = ty.min(wy - yl);
                let product = b.slice(x, xl + xw - 1, xl).mul(b.slice(y, yl + yw - 1, yl));
                let p = b.define(
                    &format!("tile_{i}_{j}"),
                    aligned(product, xw + yw, xl + yl, total),
                )?;
                products.push(p);
            }
        }
        let tiles = products.len();

        if tiles > 1 {
            let adder = IntAdder::new(ctx, target, total, &DelayMap::new())?;
            let mut level = products;
            let mut depth = 0;
            while level.len() > 1 {
                b.sync_with(&level)?;
                let mut next = Vec::with_capacity(level.len().div_ceil(2));
                let mut sums = Vec::new();
                for (k, pair) in level.chunks(2).enumerate() {
                    match pair {
                        [a, c] => {
                            let outs = b.instantiate(
                                adder.operator(),
                                &format!("adder_{depth}_{k}"),
                                PortMap::new()
                                    .input("X", b.s(*a))
                                    .input("Y", b.s(*c))
                                    .input("Cin", constant(0, 1))
                                    .output("R", format!("sum_{depth}_{k}")),
                            )?;
                            sums.extend_from_slice(&outs);
                            next.extend(outs);
                        }
                        [a] => next.push(*a),
                        _ => {}
                    }
                }
                b.sync_with(&sums)?;
                level = next;
                depth += 1;
            }
            products = level;
        }
        let result = products
            .first()
            .copied()
            .ok_or_else(|| GenError::internal("multiplier without tiles"))?;
        b.sync_with(&[result])?;
        b.assign(r, b.s(result))?;
        let op = b.finish(ctx)?;
        Ok(Self { op, wx, wy, tiles })
    }

    /// Number of tile products.
    pub fn tiles(&self) -> usize {
        self.tiles
    }

    pub fn widths(&self) -> (u32, u32) {
        (self.wx, self.wy)
    }
}

impl ArithmeticOperator for IntMultiplier {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let product = tc.input("X")? * tc.input("Y")?;
        tc.add_expected("R", product)
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let cases = [
            (all_ones(self.wx), all_ones(self.wy), "largest operands"),
            (Natural::from(1u32), all_ones(self.wy), "one"),
            (Natural::from(0u32), all_ones(self.wy), "zero"),
        ];
        for (x, y, comment) in cases {
            let mut tc = self.new_test_case();
            tc.set_input("X", x)?;
            tc.set_input("Y", y)?;
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
    use crate::testing::{assert_passed, differential, exhaustive, target};
    use pipegen_ir::Statement;
    use pipegen_target::{load_target, TargetOptions};

    #[test]
    fn small_product_fits_one_dsp() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let m = IntMultiplier::new(&mut ctx, t.as_ref(), 8, 6, &DelayMap::new()).unwrap();
        assert_eq!(m.tiles(), 1);
        assert!(m.operator().children().is_empty());
        assert_passed(&exhaustive(&m));
    }

    #[test]
    fn large_product_sums_dsp_tiles() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let m = IntMultiplier::new(&mut ctx, t.as_ref(), 40, 30, &DelayMap::new()).unwrap();
        assert_eq!(m.tiles(), 4);
        assert_eq!(m.operator().children().len(), 1);
        let instances = m
            .operator()
            .statements
            .iter()
            .filter(|t| matches!(t.stmt, Statement::Instance(_)))
            .count();
        assert_eq!(instances, 3);
        assert!(m.operator().pipeline_depth >= 1);
        assert_passed(&differential(&m, 200));
    }

    #[test]
    fn logic_tiles_without_dsp() {
        let options = TargetOptions {
            use_hard_multipliers: false,
            ..TargetOptions::default()
        };
        let t = load_target("xilinx", Some("virtex5"), 400.0, options).unwrap();
        let mut ctx = GenerationContext::new();
        let m = IntMultiplier::new(&mut ctx, t.as_ref(), 6, 5, &DelayMap::new()).unwrap();
        assert_eq!(m.tiles(), 4);
        assert_passed(&exhaustive(&m));
    }

    #[test]
    fn alignment_pads_both_sides() {
        let e: UseExpr = aligned(Expr::ones(3), 3, 2, 8);
        match e {
            Expr::Concat(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected a concatenation, got {other:?}"),
        }
    }
}
