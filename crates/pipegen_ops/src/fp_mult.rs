//! Floating-point multiplier.
//!
//! Signs are XORed, exponents added, and the significands multiplied by an
//! [`IntMultiplier`]. The product is normalized by at most one position and
//! rounded to the output fraction width: to nearest even when correctly
//! rounded, by truncation when faithful.

use crate::float::{round_and_pack, Exn, FpFormat, Packing};
use crate::int_multiplier::IntMultiplier;
use crate::DelayMap;
use malachite::Natural;
use pipegen_common::{AccuracyMode, Bits, GenResult};
use pipegen_core::{
    constant, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder, PortMap, TestCase,
    TestCaseList,
};
use pipegen_ir::{Cond, Expr, Operator, SelectArm};
use pipegen_target::Target;
use std::sync::Arc;

/// `R = X * Y` with inputs in `(we, wf)` and the result in `(we, wfout)`.
#[derive(Debug, Clone)]
pub struct FpMult {
    op: Arc<Operator>,
    input: FpFormat,
    output: FpFormat,
    accuracy: AccuracyMode,
}

/// Exception tag of a product, by concatenated input tags. Pairs not
/// listed give NaN.
const PRODUCT_EXN: [(u64, &[u64]); 3] = [
    (0b00, &[0b0000, 0b0001, 0b0100]),
    (0b01, &[0b0101]),
    (0b10, &[0b0110, 0b1001, 0b1010]),
];

impl FpMult {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        input: FpFormat,
        output: FpFormat,
        accuracy: AccuracyMode,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        input.validate()?;
        if output.we != input.we {
            return Err(GenError::config(
                "output_exponent_width",
                format!("must equal the input exponent width {}", input.we),
            ));
        }
        if output.wf == 0 || output.wf > input.wf {
            return Err(GenError::config(
                "output_mantissa_width",
                format!("must be between 1 and the input mantissa width {}", input.wf),
            ));
        }
        let (we, wf, wfout) = (input.we, input.wf, output.wf);
        let name = ctx.unique_name(&format!("FPMult_{we}_{wf}_{wfout}"));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        b.set_description(format!("Floating-point multiplier, {accuracy} rounding"));
        let x = b.add_fp_input("X", we, wf)?;
        let y = b.add_fp_input("Y", we, wf)?;
        let possible = if accuracy.is_correct() { 1 } else { 2 };
        let r = b.add_fp_output("R", we, wfout, possible)?;

        b.manage_critical_path(target.lut_delay());
        let sign = b.define("sign", input.sign_of(&b, x).xor(input.sign_of(&b, y)))?;
        let exn_xy = b.define(
            "exnXY",
            Expr::concat(vec![input.exn_of(&b, x), input.exn_of(&b, y)]),
        )?;
        let exn_sel = b.declare("exnSel", 2)?;
        let arms = PRODUCT_EXN
            .iter()
            .map(|&(value, choices)| SelectArm {
                choices: choices.iter().map(|c| Bits::from_u64(*c, 4)).collect(),
                value: constant(value, 2),
            })
            .collect();
        b.select(exn_sel, exn_xy, arms, constant(0b11, 2))?;

        b.manage_critical_path(target.adder_delay(we + 2));
        let exp_sum = b.define(
            "expSum",
            Expr::concat(vec![Expr::zeros(2), input.exponent_of(&b, x)])
                .add(Expr::concat(vec![Expr::zeros(2), input.exponent_of(&b, y)]))
                .sub(constant(input.bias() as u64, we + 2)),
        )?;

        let mult = IntMultiplier::new(ctx, target, wf + 1, wf + 1, &DelayMap::new())?;
        let prod = b.instantiate(
            mult.operator(),
            "significandMultiplier",
            PortMap::new()
                .input("X", input.significand_of(&b, x))
                .input("Y", input.significand_of(&b, y))
                .output("R", "sigProd"),
        )?;
        let sig_prod = prod[0];
        b.sync_with(&prod)?;

        b.manage_critical_path(target.lut_delay() + target.local_wire_delay(2 * wf + 1));
        let norm = b.define("norm", b.bit(sig_prod, 2 * wf + 1))?;
        let sig_ext = b.declare("sigProdExt", 2 * wf + 1)?;
        b.assign_when(
            sig_ext,
            vec![(Cond::is_set(b.s(norm)), b.slice(sig_prod, 2 * wf, 0))],
            Expr::concat(vec![b.slice(sig_prod, 2 * wf - 1, 0), Expr::bit(false)]),
        )?;
        let exp_norm = b.define("expPostNorm", b.s(exp_sum).add(b.s(norm)))?;

        let top = 2 * wf;
        let round_up = if accuracy.is_correct() {
            b.manage_critical_path(target.eq_comparator_delay(top - wfout) + target.lut_delay());
            let sticky = b.declare("sticky", 1)?;
            b.assign_when(
                sticky,
                vec![(
                    Cond::ne(b.slice(sig_ext, top - wfout - 1, 0), Expr::zeros(top - wfout)),
                    Expr::bit(true),
                )],
                Expr::bit(false),
            )?;
            let round = b.bit(sig_ext, top - wfout);
            let lsb = b.bit(sig_ext, top - wfout + 1);
            b.define("roundUp", round.and(b.s(sticky).or(lsb)))?
        } else {
            b.define("roundUp", Expr::bit(false))?
        };
        let fraction = b.define("fracPostNorm", b.slice(sig_ext, top, top - wfout + 1))?;
        let packed = round_and_pack(
            &mut b,
            output,
            Packing {
                exn: exn_sel,
                sign,
                exponent: exp_norm,
                fraction,
                round_up,
            },
        )?;
        b.assign(r, b.s(packed))?;
        let op = b.finish(ctx)?;
        Ok(Self {
            op,
            input,
            output,
            accuracy,
        })
    }

    pub fn input_format(&self) -> FpFormat {
        self.input
    }

    pub fn output_format(&self) -> FpFormat {
        self.output
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

impl ArithmeticOperator for FpMult {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let (fi, fo) = (self.input, self.output);
        let x = fi.decode(tc.input("X")?);
        let y = fi.decode(tc.input("Y")?);
        let sign = x.sign != y.sign;
        let results = match (x.exn, y.exn) {
            (Exn::NaN, _) | (_, Exn::NaN) => vec![fo.nan()],
            (Exn::Zero, Exn::Infinity) | (Exn::Infinity, Exn::Zero) => vec![fo.nan()],
            (Exn::Infinity, _) | (_, Exn::Infinity) => vec![fo.infinity(sign)],
            (Exn::Zero, _) | (_, Exn::Zero) => vec![fo.zero(sign)],
            (Exn::Normal, Exn::Normal) => {
                let (mx, ex) = fi.scaled(&x);
                let (my, ey) = fi.scaled(&y);
                fo.round_set(sign, &(mx * my), ex + ey, false, self.accuracy.is_correct())
            }
        };
        for r in results {
            tc.add_expected("R", r)?;
        }
        Ok(())
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let f = self.input;
        let zero = Natural::from(0u32);
        let max_frac = pipegen_common::bits::all_ones(f.wf);
        let largest = f.normal(false, f.max_exponent() as u64, max_frac.clone());
        let smallest = f.normal(false, 0, zero.clone());
        let one = f.one();
        let minus_one = f.normal(true, f.bias() as u64, zero.clone());
        let cases = [
            (one.clone(), minus_one, "1 * -1"),
            (f.normal(false, f.bias() as u64, max_frac.clone()), f.normal(false, f.bias() as u64, max_frac), "rounding carry"),
            (largest.clone(), largest, "overflow"),
            (smallest.clone(), smallest, "underflow"),
            (f.zero(false), f.infinity(true), "0 * inf"),
            (f.infinity(false), one.clone(), "inf * 1"),
            (f.nan(), f.zero(false), "NaN * 0"),
            (f.zero(true), one, "-0 * 1"),
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

    fn mult(input: FpFormat, wfout: u32, accuracy: AccuracyMode) -> FpMult {
        let t = target();
        let mut ctx = GenerationContext::new();
        let output = FpFormat::new(input.we, wfout);
        FpMult::new(&mut ctx, t.as_ref(), input, output, accuracy, &DelayMap::new()).unwrap()
    }

    #[test]
    fn exception_table_covers_every_pair() {
        let mut seen: Vec<u64> = PRODUCT_EXN.iter().flat_map(|(_, c)| c.iter().copied()).collect();
        seen.sort_unstable();
        seen.dedup();
        // the seven pairs listed above; the other nine give NaN
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn single_precision_specials() {
        let m = mult(FpFormat::new(8, 23), 23, AccuracyMode::CorrectlyRounded);
        let f = m.input_format();
        let mut tc = m.new_test_case();
        tc.set_input("X", f.one()).unwrap();
        tc.set_input("Y", f.one()).unwrap();
        m.emulate(&mut tc).unwrap();
        assert_eq!(tc.expected("R"), &[f.one()]);

        let mut tc = m.new_test_case();
        tc.set_input("X", f.zero(false)).unwrap();
        tc.set_input("Y", f.infinity(false)).unwrap();
        m.emulate(&mut tc).unwrap();
        assert_eq!(tc.expected("R"), &[f.nan()]);
        assert_passed(&differential(&m, 100));
    }

    #[test]
    fn correctly_rounded_multiplier() {
        let m = mult(FpFormat::new(5, 10), 10, AccuracyMode::CorrectlyRounded);
        assert_eq!(m.operator().output("R").unwrap().possible_values, 1);
        assert_passed(&differential(&m, 500));
    }

    #[test]
    fn faithful_multiplier_accepts_both_neighbours() {
        let m = mult(FpFormat::new(5, 10), 10, AccuracyMode::Faithful);
        assert_eq!(m.operator().output("R").unwrap().possible_values, 2);
        let f = m.input_format();
        let mut tc = m.new_test_case();
        // 1.5 * 1.0009765625 is not representable
        tc.set_input("X", f.normal(false, 15, Natural::from(512u32))).unwrap();
        tc.set_input("Y", f.normal(false, 15, Natural::from(1u32))).unwrap();
        m.emulate(&mut tc).unwrap();
        assert_eq!(tc.expected("R").len(), 2);
        assert_passed(&differential(&m, 500));
    }

    #[test]
    fn narrower_output_fraction() {
        let m = mult(FpFormat::new(6, 12), 7, AccuracyMode::CorrectlyRounded);
        assert_eq!(m.operator().output("R").unwrap().width, 6 + 7 + 3);
        assert_passed(&differential(&m, 500));
    }

    #[test]
    fn parameters_are_checked() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let bad_we = FpMult::new(
            &mut ctx,
            t.as_ref(),
            FpFormat::new(8, 10),
            FpFormat::new(9, 10),
            AccuracyMode::CorrectlyRounded,
            &DelayMap::new(),
        )
        .unwrap_err();
        assert!(bad_we.to_string().contains("output_exponent_width"));
        let bad_wf = FpMult::new(
            &mut ctx,
            t.as_ref(),
            FpFormat::new(8, 10),
            FpFormat::new(8, 11),
            AccuracyMode::CorrectlyRounded,
            &DelayMap::new(),
        )
        .unwrap_err();
        assert!(bad_wf.is_configuration());
    }
}
