//! Fixed-point polynomial evaluation by the Horner scheme.
//!
//! `R ≈ a0 + a1·y + ... + ad·y^d` for `y = Y·2^-wy` in `[0, 1)` and signed
//! coefficients sharing one fixed-point format. Each step multiplies the
//! running sum by `y` with an [`IntMultiplier`], truncates the product to
//! the internal precision and adds the next coefficient with an
//! [`IntAdder`]. This is the evaluation stage of a function approximated
//! piecewise: the top bits of the argument select the coefficients (a
//! [`Table`](crate::Table)) and the low bits are `Y`.
//!
//! Every truncation rounds toward minus infinity and loses less than one
//! unit of the internal precision, which sits `g` bits below the output
//! LSB. With at most `2d + 1` truncations and `2^(g-1) >= 2d + 1`, the
//! accumulated error stays below half an output ulp, so rounding the last
//! sum to nearest gives a faithful result.

use crate::int_adder::IntAdder;
use crate::int_multiplier::IntMultiplier;
use crate::long_acc::weight_name;
use crate::DelayMap;
use malachite::base::num::arithmetic::traits::{PowerOf2, UnsignedAbs};
use malachite::base::num::basic::traits::Zero;
use malachite::base::num::logic::traits::{BitAccess, SignificantBits};
use malachite::{Integer, Natural};
use pipegen_common::bits::all_ones;
use pipegen_common::{ceil_log2, GenResult};
use pipegen_core::{
    constant, random_bits, ArithmeticOperator, GenError, GenerationContext, OperatorBuilder,
    PortMap, TestCase, TestCaseList, UseExpr,
};
use pipegen_ir::{Expr, Operator, SignalId};
use pipegen_target::Target;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Largest supported degree.
pub const MAX_DEGREE: u32 = 8;

/// Shape of the polynomial and of its fixed-point formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolynomialFormat {
    /// Degree `d`; the coefficients are `a0` to `ad`.
    pub degree: u32,
    /// Width of `Y`, whose LSB weighs `2^-y_width`.
    pub y_width: u32,
    /// Width of every coefficient, sign included.
    pub coefficient_width: u32,
    /// Weight exponent of the coefficient LSB.
    pub coefficient_lsb: i32,
    /// Weight exponent of the output LSB.
    pub output_lsb: i32,
}

impl PolynomialFormat {
    fn validate(&self) -> Result<(), GenError> {
        if self.degree == 0 || self.degree > MAX_DEGREE {
            return Err(GenError::config(
                "degree",
                format!("must be between 1 and {MAX_DEGREE}, got {}", self.degree),
            ));
        }
        if self.y_width == 0 {
            return Err(GenError::config("input_width", "must be at least 1"));
        }
        if self.coefficient_width < 2 {
            return Err(GenError::config(
                "coefficient_width",
                "must be at least 2 (sign included)",
            ));
        }
        Ok(())
    }

    /// Guard bits kept below the output LSB.
    fn guard_bits(&self) -> u32 {
        ceil_log2(u64::from(2 * self.degree + 1)) + 1
    }

    /// Left shift aligning a coefficient on the internal LSB (negative when
    /// its low bits are truncated).
    fn coefficient_shift(&self) -> i64 {
        i64::from(self.coefficient_lsb) - (i64::from(self.output_lsb) - i64::from(self.guard_bits()))
    }

    /// Width of the running sums: the largest aligned coefficient times
    /// `d + 1`, plus the rounding constant and a sign bit.
    fn sum_width(&self) -> u32 {
        let shift = self.coefficient_shift();
        let top = i64::from(self.coefficient_width) - 1 + shift;
        let largest = if top >= 0 {
            Natural::power_of_2(top as u64)
        } else {
            Natural::from(1u32)
        };
        let bound = largest * Natural::from(self.degree + 1)
            + Natural::power_of_2(u64::from(self.guard_bits()));
        bound.significant_bits() as u32 + 1
    }

    /// Width of `R`.
    pub fn output_width(&self) -> u32 {
        self.sum_width() - self.guard_bits()
    }
}

/// Sign-extends the coefficient `a` and aligns it on the internal LSB.
fn aligned_coefficient(
    b: &OperatorBuilder<'_>,
    a: SignalId,
    width: u32,
    shift: i64,
    total: u32,
) -> UseExpr {
    let sign = || b.bit(a, width - 1);
    let mut parts = Vec::with_capacity(3);
    let (body, low) = if shift >= 0 {
        (Some((b.s(a), width)), shift as u32)
    } else if (-shift) < i64::from(width) {
        let cut = (-shift) as u32;
        (Some((b.slice(a, width - 1, cut), width - cut)), 0)
    } else {
        (None, 0)
    };
    let used = body.as_ref().map_or(0, |(_, w)| *w) + low;
    if total > used {
        parts.push(Expr::replicate(sign(), total - used));
    }
    if let Some((value, _)) = body {
        parts.push(value);
    }
    if low > 0 {
        parts.push(Expr::zeros(low));
    }
    Expr::concat(parts)
}

/// Two's complement value of a `width`-bit pattern.
fn signed_value(bits: &Natural, width: u32) -> Integer {
    let value = Integer::from(bits.clone());
    if bits.get_bit(u64::from(width - 1)) {
        value - Integer::from(Natural::power_of_2(u64::from(width)))
    } else {
        value
    }
}

/// Two's complement pattern of `value` on `width` bits.
fn encode_signed(value: &Integer, width: u32) -> Natural {
    let magnitude = value.unsigned_abs();
    if *value < Integer::ZERO {
        Natural::power_of_2(u64::from(width)) - magnitude
    } else {
        magnitude
    }
}

/// Faithful fixed-point evaluation of a polynomial with run-time
/// coefficients.
///
/// Ports: `Y` (`y_width`, unsigned), `a0` to `ad` (`coefficient_width`,
/// signed), and `R` (signed, LSB weight `2^output_lsb`).
#[derive(Debug, Clone)]
pub struct PolynomialEvaluator {
    op: Arc<Operator>,
    format: PolynomialFormat,
}

impl PolynomialEvaluator {
    pub fn new(
        ctx: &mut GenerationContext,
        target: &dyn Target,
        format: PolynomialFormat,
        delays: &DelayMap,
    ) -> Result<Self, GenError> {
        format.validate()?;
        let d = format.degree;
        let (wy, wc) = (format.y_width, format.coefficient_width);
        let g = format.guard_bits();
        let shift = format.coefficient_shift();
        let ws = format.sum_width();
        let name = ctx.unique_name(&format!(
            "PolynomialEvaluator_degree{d}_{wy}_{}",
            weight_name(format.output_lsb)
        ));
        let mut b = OperatorBuilder::new(name, target).with_input_delays(delays);
        b.set_description(format!("Horner evaluation with {g} guard bits"));
        let y = b.add_input("Y", wy)?;
        let coefficients = (0..=d)
            .map(|i| b.add_input(&format!("a{i}"), wc))
            .collect::<Result<Vec<_>, _>>()?;
        let r = b.add_output_values("R", ws - g, 2)?;

        let mult = IntMultiplier::new(ctx, target, wy, ws, &DelayMap::new())?;
        let adder = IntAdder::new(ctx, target, ws, &DelayMap::new())?;

        b.manage_critical_path(target.local_wire_delay(ws));
        let mut sigma = b.define(
            &format!("sigma{d}"),
            aligned_coefficient(&b, coefficients[d as usize], wc, shift, ws),
        )?;
        for i in (0..d).rev() {
            let product = b.instantiate(
                mult.operator(),
                &format!("product_{i}"),
                PortMap::new()
                    .input("X", b.s(y))
                    .input("Y", b.s(sigma))
                    .output("R", format!("uP{i}")),
            )?;
            b.sync_with(&product)?;
            // the multiplier is unsigned: remove Y·2^ws when the sum is negative
            b.manage_critical_path(target.adder_delay(wy + ws));
            let full = b.define(
                &format!("sP{i}"),
                b.s(product[0]).sub(Expr::concat(vec![
                    b.s(y).and(Expr::replicate(b.bit(sigma, ws - 1), wy)),
                    Expr::zeros(ws),
                ])),
            )?;
            let truncated = b.define(&format!("piP{i}"), b.slice(full, wy + ws - 1, wy))?;
            let sum = b.instantiate(
                adder.operator(),
                &format!("sum_{i}"),
                PortMap::new()
                    .input("X", aligned_coefficient(&b, coefficients[i as usize], wc, shift, ws))
                    .input("Y", b.s(truncated))
                    .input("Cin", constant(0, 1))
                    .output("R", format!("sigma{i}")),
            )?;
            b.sync_with(&sum)?;
            sigma = sum[0];
        }

        b.manage_critical_path(target.adder_delay(ws));
        let rounded = b.define(
            "rounded",
            b.s(sigma).add(constant(1u64 << (g - 1), ws)),
        )?;
        b.assign(r, b.slice(rounded, ws - 1, g))?;
        let op = b.finish(ctx)?;
        Ok(Self { op, format })
    }

    pub fn format(&self) -> PolynomialFormat {
        self.format
    }

    fn case(&self, y: Natural, coefficients: &[Natural], comment: &str) -> GenResult<TestCase> {
        let mut tc = self.new_test_case();
        tc.set_input("Y", y)?;
        for (i, a) in coefficients.iter().enumerate() {
            tc.set_input(&format!("a{i}"), a.clone())?;
        }
        tc.set_comment(comment);
        self.emulate(&mut tc)?;
        Ok(tc)
    }
}

impl ArithmeticOperator for PolynomialEvaluator {
    fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    /// Evaluates the polynomial exactly, scaled to an integer, and accepts
    /// both neighbours of the exact value on the output grid.
    fn emulate(&self, tc: &mut TestCase) -> GenResult<()> {
        let f = self.format;
        let (d, wy) = (f.degree, u64::from(f.y_width));
        let y = Integer::from(tc.input("Y")?.clone());
        // sum of a_i·Y^i·2^((d-i)·wy), i.e. the value times 2^(d·wy - coefficient_lsb)
        let mut scaled = Integer::ZERO;
        let mut power = Integer::from(1u32);
        for i in 0..=d {
            let a = signed_value(tc.input(&format!("a{i}"))?, f.coefficient_width);
            scaled += a * &power << (u64::from(d - i) * wy);
            power *= &y;
        }
        let k = i64::from(f.output_lsb) + i64::from(d) * wy as i64 - i64::from(f.coefficient_lsb);
        let width = f.output_width();
        if k <= 0 {
            return tc.add_expected("R", encode_signed(&(scaled << ((-k) as u64)), width));
        }
        let low = scaled.clone() >> (k as u64);
        tc.add_expected("R", encode_signed(&low, width))?;
        if (low.clone() << (k as u64)) != scaled {
            tc.add_expected("R", encode_signed(&(low + Integer::from(1u32)), width))?;
        }
        Ok(())
    }

    fn build_standard_test_cases(&self, tcl: &mut TestCaseList) -> GenResult<()> {
        let f = self.format;
        let n = (f.degree + 1) as usize;
        let wc = f.coefficient_width;
        let most_negative = Natural::power_of_2(u64::from(wc - 1));
        let most_positive = &most_negative - Natural::from(1u32);
        let y_max = all_ones(f.y_width);
        let zero = Natural::from(0u32);
        let mut alternating = vec![most_positive.clone(); n];
        for a in alternating.iter_mut().skip(1).step_by(2) {
            *a = most_negative.clone();
        }
        let cases = [
            (zero.clone(), vec![most_positive.clone(); n], "y = 0 gives a0"),
            (y_max.clone(), vec![most_positive; n], "largest positive sum"),
            (y_max.clone(), vec![most_negative; n], "largest negative sum"),
            (y_max, alternating, "alternating signs"),
            (zero.clone(), vec![zero; n], "zero polynomial"),
        ];
        for (y, coefficients, comment) in cases {
            tcl.add(self.case(y, &coefficients, comment)?);
        }
        Ok(())
    }

    fn build_random_test_case(&self, rng: &mut StdRng) -> GenResult<TestCase> {
        let f = self.format;
        let y = random_bits(rng, f.y_width);
        let coefficients: Vec<Natural> = (0..=f.degree)
            .map(|_| random_bits(rng, f.coefficient_width))
            .collect();
        self.case(y, &coefficients, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_passed, differential, exhaustive, run_cases, target};

    fn evaluator(
        degree: u32,
        y_width: u32,
        wc: u32,
        coefficient_lsb: i32,
        output_lsb: i32,
    ) -> PolynomialEvaluator {
        let t = target();
        let mut ctx = GenerationContext::new();
        let format = PolynomialFormat {
            degree,
            y_width,
            coefficient_width: wc,
            coefficient_lsb,
            output_lsb,
        };
        PolynomialEvaluator::new(&mut ctx, t.as_ref(), format, &DelayMap::new()).unwrap()
    }

    fn n(v: u64) -> Natural {
        Natural::from(v)
    }

    #[test]
    fn widths_follow_the_error_budget() {
        let p = evaluator(2, 10, 12, -11, -10);
        let f = p.format();
        // 2^(g-1) >= 2d + 1 = 5
        assert_eq!(f.guard_bits(), 4);
        assert_eq!(p.operator().input("a2").unwrap().width, 12);
        assert_eq!(p.operator().output("R").unwrap().width, f.output_width());
        assert_eq!(p.operator().output("R").unwrap().possible_values, 2);
    }

    #[test]
    fn model_values() {
        // coefficients with LSB 2^-4, y with LSB 2^-4, output LSB 2^-4
        let p = evaluator(1, 4, 8, -4, -4);
        let w = p.format().output_width();
        // 1 + 1·0.5 = 1.5: exact
        let tc = p.case(n(8), &[n(16), n(16)], "").unwrap();
        assert_eq!(tc.expected("R"), &[n(24)]);
        // 1/16 · 1/16 is between 0 and one output ulp
        let tc = p.case(n(1), &[n(0), n(1)], "").unwrap();
        assert_eq!(tc.expected("R"), &[n(0), n(1)]);
        // -1 + 0 = -1
        let tc = p.case(n(3), &[all_ones(8) - n(15), n(0)], "").unwrap();
        assert_eq!(tc.expected("R"), &[all_ones(w) - n(15)]);
    }

    #[test]
    fn linear_exhaustive() {
        // 3 + 3 + 3 input bits
        assert_passed(&exhaustive(&evaluator(1, 3, 3, 0, -2)));
    }

    #[test]
    fn quadratic_matches_model() {
        assert_passed(&differential(&evaluator(2, 10, 12, -11, -10), 400));
    }

    #[test]
    fn cubic_with_truncated_coefficients() {
        // coefficient LSBs sit below the internal precision
        assert_passed(&differential(&evaluator(3, 5, 10, -20, -6), 400));
    }

    #[test]
    fn coarse_output_with_wide_coefficients() {
        assert_passed(&differential(&evaluator(4, 8, 9, -8, -3), 300));
    }

    #[test]
    fn extreme_sums_in_hardware() {
        let p = evaluator(3, 12, 16, -14, -12);
        let mut tests = TestCaseList::new();
        p.build_standard_test_cases(&mut tests).unwrap();
        assert_eq!(tests.len(), 5);
        assert_passed(&run_cases(&p, &tests));
    }

    #[test]
    fn degree_is_checked() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let format = PolynomialFormat {
            degree: 0,
            y_width: 8,
            coefficient_width: 8,
            coefficient_lsb: -7,
            output_lsb: -8,
        };
        let err = PolynomialEvaluator::new(&mut ctx, t.as_ref(), format, &DelayMap::new())
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("degree"));
    }

    #[test]
    fn sums_are_signed_twos_complement() {
        assert_eq!(signed_value(&n(0b1111), 4), Integer::from(-1));
        assert_eq!(encode_signed(&Integer::from(-3), 5), n(0b11101));
        assert_eq!(encode_signed(&Integer::from(6), 5), n(6));
    }
}
