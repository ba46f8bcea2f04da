//! Tabulated functions.
//!
//! The table is a selected signal assignment over every input value, which
//! synthesis maps to LUTs or block RAM.

use crate::DelayMap;
use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use pipegen_common::bits::all_ones;
use pipegen_common::{Bits, GenResult};
use pipegen_core::{
    ArithmeticOperator, GenError, GenerationContext, OperatorBuilder, TestCase, TestCaseList,
};
use pipegen_ir::{Expr, Operator, SelectArm};
use pipegen_target::Target;
use std::sync::Arc;

/// Largest input width accepted for a table.
pub const MAX_TABLE_INPUT: u32 = 16;

/// The function stored in a [`Table`], on `win`-bit inputs and `wout`-bit
/// outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableFunction {
    /// `1 / (1 + x 2^-win)` on `[1/2, 1]`, as `floor(2^(wout+win) / (2^win + x))`
    /// saturated to `wout` bits.
    Reciprocal,
    /// `(x 2^-win)^2`, truncated to `wout` fractional bits.
    Square,
}

impl TableFunction {
    /// Parses a registry name.
    pub fn from_name(name: &str) -> Option<TableFunction> {
        match name {
            "ReciprocalTable" => Some(TableFunction::Reciprocal),
            "SquareTable" => Some(TableFunction::Square),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TableFunction::Reciprocal => "ReciprocalTable",
            TableFunction::Square => "SquareTable",
        }
    }

    /// The table entry at `x`.
    pub fn eval(self, x: u64, win: u32, wout: u32) -> Natural {
        let x = Natural::from(x);
        match self {
            TableFunction::Reciprocal => {
                let q = Natural::power_of_2(u64::from(wout + win))
                    / (Natural::power_of_2(u64::from(win)) + x);
                q.min(all_ones(wout))
            }
            TableFunction::Square => {
                let sq = &x * &x;
                (sq << u64::from(wout)) >> u64::from(2 * win)
            }
        }
    }
}

/// `R = f(X)`.
#[derive(Debug, Clone)]
pub struct Table {
    op: Arc<Operator>,
    win: u32,
    wout: u32,
    function: TableFunction,
}

impl Table {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        win: u32,
        wout: u32,
        function: TableFunction,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        if win == 0 || win > MAX_TABLE_INPUT {
            return Err(GenError::config(
                "input_width",
                format!("a table takes 1 to {MAX_TABLE_INPUT} input bits, got {win}"),
            ));
        }
        if wout == 0 {
            return Err(GenError::config("output_width", "must be at least 1"));
        }
        let name = ctx.unique_name(&format!("{}_{win}_{wout}", function.name()));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        let x = b.add_input("X", win)?;
        let r = b.add_output("R", wout)?;

        let entries = 1u64 << win;
        let bits = entries * u64::from(wout);
        let delay = if win <= target.lut_inputs() {
            target.lut_delay()
        } else if bits <= target.size_of_memory_block() {
            target.ram_delay()
        } else {
            target.ram_delay() + target.distant_wire_delay(win)
        };
        b.manage_critical_path(delay);
        let entry = |v: u64| Expr::Const(Bits::new(function.eval(v, win, wout), wout));
        let arms = (0..entries - 1)
            .map(|v| SelectArm {
                choices: vec![Bits::from_u64(v, win)],
                value: entry(v),
            })
            .collect();
        let table = b.declare("TableOut", wout)?;
        b.select(table, x, arms, entry(entries - 1))?;
        b.assign(r, b.s(table))?;
        let op = b.finish(ctx)?;
        Ok(Self {
            op,
            win,
            wout,
            function,
        })
    }

    pub fn function(&self) -> TableFunction {
        self.function
    }
}

impl ArithmeticOperator for Table {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let x = u64::try_from(tc.input("X")?).unwrap_or(0);
        tc.add_expected("R", self.function.eval(x, self.win, self.wout))
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        for (x, comment) in [(0u64, "first entry"), ((1u64 << self.win) - 1, "last entry")] {
            let mut tc = self.new_test_case();
            tc.set_input("X", Natural::from(x))?;
            tc.set_comment(comment);
            self.emulate(&mut tc)?;
            tcl.add(tc);
        }
        Ok(())
    }
}
