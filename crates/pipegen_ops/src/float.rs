//! The exception-tagged floating-point format.
//!
//! A number is `exn(2) & sign & exponent(we) & fraction(wf)`. The exception
//! tag tells zeros, normal numbers, infinities and NaNs apart; only normal
//! numbers use the exponent and fraction fields. There are no subnormals:
//! every exponent field value is a normal number, and results below the
//! smallest one flush to zero.
//!
//! This module holds both sides of the format: the exact encoder, decoder
//! and rounding used by the models, and the field accessors and final
//! rounding stage shared by the floating-point operators.

use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::base::num::basic::traits::One;
use malachite::base::num::logic::traits::{BitAccess, SignificantBits};
use malachite::Natural;
use pipegen_common::bits::mask;
use pipegen_common::Bits;
use pipegen_core::{constant, GenError, OperatorBuilder, UseExpr};
use pipegen_ir::{Cond, Expr, SignalId};

/// The exception tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exn {
    Zero,
    Normal,
    Infinity,
    NaN,
}

impl Exn {
    /// Returns the two-bit code of the tag.
    pub fn code(self) -> u64 {
        match self {
            Exn::Zero => 0b00,
            Exn::Normal => 0b01,
            Exn::Infinity => 0b10,
            Exn::NaN => 0b11,
        }
    }

    /// Decodes the low two bits of `code`.
    pub fn from_code(code: u64) -> Exn {
        match code & 0b11 {
            0b00 => Exn::Zero,
            0b01 => Exn::Normal,
            0b10 => Exn::Infinity,
            _ => Exn::NaN,
        }
    }
}

/// Rounding direction of [`FpFormat::round`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// To nearest, ties to even.
    NearestEven,
    /// Toward zero (truncation of the magnitude).
    TowardZero,
    /// Away from zero.
    AwayFromZero,
}

/// A decoded number. `exponent` and `fraction` are meaningful only for
/// normal numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpValue {
    pub exn: Exn,
    pub sign: bool,
    pub exponent: u64,
    pub fraction: Natural,
}

impl FpValue {
    pub fn is_normal(&self) -> bool {
        self.exn == Exn::Normal
    }
}

/// Exponent and fraction widths of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FpFormat {
    pub we: u32,
    pub wf: u32,
}

impl FpFormat {
    pub fn new(we: u32, wf: u32) -> Self {
        Self { we, wf }
    }

    /// Total width: tag, sign, exponent and fraction.
    pub fn width(self) -> u32 {
        self.we + self.wf + 3
    }

    pub fn bias(self) -> i64 {
        (1i64 << (self.we - 1)) - 1
    }

    /// Largest exponent field value.
    pub fn max_exponent(self) -> i64 {
        (1i64 << self.we) - 1
    }

    /// Checks the widths an operator can be generated for.
    pub fn validate(self) -> Result<(), GenError> {
        if self.we < 3 {
            return Err(GenError::config(
                "exponent_width",
                format!("must be at least 3, got {}", self.we),
            ));
        }
        if self.we > 30 {
            return Err(GenError::config(
                "exponent_width",
                format!("must be at most 30, got {}", self.we),
            ));
        }
        if self.wf == 0 {
            return Err(GenError::config("mantissa_width", "must be at least 1"));
        }
        Ok(())
    }

    pub fn encode(self, v: &FpValue) -> Natural {
        let head = (v.exn.code() << 1) | u64::from(v.sign);
        let exponent = mask(&Natural::from(v.exponent), self.we);
        let fraction = mask(&v.fraction, self.wf);
        (((Natural::from(head) << u64::from(self.we)) + exponent) << u64::from(self.wf)) + fraction
    }

    pub fn decode(self, bits: &Natural) -> FpValue {
        let wf = u64::from(self.wf);
        let we = u64::from(self.we);
        let fraction = mask(bits, self.wf);
        let exponent = mask(&(bits >> wf), self.we);
        let exn = mask(&(bits >> (wf + we + 1)), 2);
        FpValue {
            exn: Exn::from_code(u64::try_from(&exn).unwrap_or(0)),
            sign: bits.get_bit(wf + we),
            exponent: u64::try_from(&exponent).unwrap_or(0),
            fraction,
        }
    }

    pub fn zero(self, sign: bool) -> Natural {
        self.special(Exn::Zero, sign)
    }

    pub fn infinity(self, sign: bool) -> Natural {
        self.special(Exn::Infinity, sign)
    }

    pub fn nan(self) -> Natural {
        self.special(Exn::NaN, false)
    }

    fn special(self, exn: Exn, sign: bool) -> Natural {
        self.encode(&FpValue {
            exn,
            sign,
            exponent: 0,
            fraction: Natural::from(0u32),
        })
    }

    /// Encodes a normal number from its fields.
    pub fn normal(self, sign: bool, exponent: u64, fraction: Natural) -> Natural {
        self.encode(&FpValue {
            exn: Exn::Normal,
            sign,
            exponent,
            fraction,
        })
    }

    /// `+1.0`.
    pub fn one(self) -> Natural {
        self.normal(false, self.bias() as u64, Natural::from(0u32))
    }

    /// Returns `(significand, e)` such that the normal number `v` is
    /// `significand * 2^e`.
    pub fn scaled(self, v: &FpValue) -> (Natural, i64) {
        let significand = Natural::power_of_2(u64::from(self.wf)) + &v.fraction;
        (significand, v.exponent as i64 - self.bias() - i64::from(self.wf))
    }

    /// Rounds `mant * 2^exp` (plus a nonzero tail below `mant` when
    /// `sticky` is set) to the format.
    ///
    /// Results above the largest normal number become infinities, results
    /// below the smallest become zeros, both carrying `sign`. When `sticky`
    /// is set, `mant` must have at least `wf + 2` significant bits.
    pub fn round(self, sign: bool, mant: &Natural, exp: i64, sticky: bool, mode: Rounding) -> Natural {
        if *mant == 0u32 {
            return self.zero(sign);
        }
        let keep = u64::from(self.wf) + 1;
        let n = mant.significant_bits();
        let (mut q, mut e, up) = if n > keep {
            let shift = n - keep;
            let q = mant >> shift;
            let rem = mant - (&q << shift);
            let half = Natural::power_of_2(shift - 1);
            let up = match mode {
                Rounding::NearestEven => rem > half || (rem == half && (sticky || q.get_bit(0))),
                Rounding::TowardZero => false,
                Rounding::AwayFromZero => rem != 0u32 || sticky,
            };
            (q, exp + shift as i64, up)
        } else {
            let shift = keep - n;
            let up = mode == Rounding::AwayFromZero && sticky;
            (mant << shift, exp - shift as i64, up)
        };
        if up {
            q += Natural::ONE;
            if q.significant_bits() > keep {
                q >>= 1u64;
                e += 1;
            }
        }
        let biased = e + i64::from(self.wf) + self.bias();
        if biased > self.max_exponent() {
            self.infinity(sign)
        } else if biased < 0 {
            self.zero(sign)
        } else {
            let fraction = q - Natural::power_of_2(u64::from(self.wf));
            self.normal(sign, biased as u64, fraction)
        }
    }

    /// The acceptable results of rounding `mant * 2^exp`: one value when
    /// `correct`, else both faithful neighbours.
    pub fn round_set(self, sign: bool, mant: &Natural, exp: i64, sticky: bool, correct: bool) -> Vec<Natural> {
        if correct {
            vec![self.round(sign, mant, exp, sticky, Rounding::NearestEven)]
        } else {
            vec![
                self.round(sign, mant, exp, sticky, Rounding::TowardZero),
                self.round(sign, mant, exp, sticky, Rounding::AwayFromZero),
            ]
        }
    }

    // ----- hardware field accessors -----

    pub fn exn_of(self, b: &OperatorBuilder<'_>, id: SignalId) -> UseExpr {
        b.slice(id, self.we + self.wf + 2, self.we + self.wf + 1)
    }

    pub fn sign_of(self, b: &OperatorBuilder<'_>, id: SignalId) -> UseExpr {
        b.bit(id, self.we + self.wf)
    }

    pub fn exponent_of(self, b: &OperatorBuilder<'_>, id: SignalId) -> UseExpr {
        b.slice(id, self.we + self.wf - 1, self.wf)
    }

    pub fn fraction_of(self, b: &OperatorBuilder<'_>, id: SignalId) -> UseExpr {
        b.slice(id, self.wf - 1, 0)
    }

    /// `'1' & fraction`.
    pub fn significand_of(self, b: &OperatorBuilder<'_>, id: SignalId) -> UseExpr {
        Expr::concat(vec![Expr::bit(true), self.fraction_of(b, id)])
    }
}

/// Signals entering the final rounding stage of a floating-point operator.
pub(crate) struct Packing {
    /// Two-bit exception tag before overflow and underflow are known.
    pub exn: SignalId,
    /// Result sign.
    pub sign: SignalId,
    /// Two's complement biased exponent, at least `we + 2` bits.
    pub exponent: SignalId,
    /// The `wf` kept fraction bits.
    pub fraction: SignalId,
    /// One bit, added at the last place.
    pub round_up: SignalId,
}

/// Adds the rounding bit to `exponent & fraction` and derives the final
/// tag: a normal result with a negative exponent underflows to zero, one
/// above `2^we - 1` overflows to infinity.
///
/// Returns the packed result, `exn & sign & exponent(we) & fraction(wf)`.
pub(crate) fn round_and_pack(
    b: &mut OperatorBuilder<'_>,
    fmt: FpFormat,
    p: Packing,
) -> Result<SignalId, GenError> {
    let (we, wf) = (fmt.we, fmt.wf);
    let ew = b.width(p.exponent);
    if ew < we + 2 {
        return Err(GenError::internal(format!(
            "exponent of {ew} bits is too narrow for overflow detection"
        )));
    }
    let target = b.target();
    b.manage_critical_path(target.adder_delay(ew + wf));
    let exp_sig = b.define(
        "expSigPostRound",
        Expr::concat(vec![b.s(p.exponent), b.s(p.fraction)]).add(b.s(p.round_up)),
    )?;

    b.manage_critical_path(target.lut_delay() + target.local_wire_delay(1));
    let top = ew + wf - 1;
    let normal = Cond::eq(b.s(p.exn), constant(0b01, 2));
    let exn = b.declare("finalExn", 2)?;
    b.assign_when(
        exn,
        vec![
            (normal.clone().and(Cond::is_set(b.bit(exp_sig, top))), constant(0b00, 2)),
            (
                normal.and(Cond::ne(
                    b.slice(exp_sig, top - 1, we + wf),
                    Expr::zeros(ew - 1 - we),
                )),
                constant(0b10, 2),
            ),
        ],
        b.s(p.exn),
    )?;
    b.define(
        "packed",
        Expr::concat(vec![b.s(exn), b.s(p.sign), b.slice(exp_sig, we + wf - 1, 0)]),
    )
}

/// A `width`-bit constant from a natural.
pub(crate) fn constant_natural(value: &Natural, width: u32) -> UseExpr {
    Expr::Const(Bits::new(value.clone(), width))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: FpFormat = FpFormat { we: 8, wf: 23 };

    fn n(v: u64) -> Natural {
        Natural::from(v)
    }

    #[test]
    fn one_has_bias_exponent() {
        assert_eq!(SINGLE.one(), n(0b01_0_01111111 << 23));
        let v = SINGLE.decode(&SINGLE.one());
        assert_eq!(v.exn, Exn::Normal);
        assert_eq!(v.exponent, 127);
        assert_eq!(SINGLE.scaled(&v), (n(1 << 23), -23));
    }

    #[test]
    fn decode_reads_every_field() {
        let fmt = FpFormat::new(3, 2);
        let v = fmt.decode(&n(0b10_1_110_01));
        assert_eq!(v.exn, Exn::Infinity);
        assert!(v.sign);
        assert_eq!(v.exponent, 0b110);
        assert_eq!(v.fraction, n(1));
        assert_eq!(fmt.encode(&v), n(0b10_1_110_01));
    }

    #[test]
    fn exact_values_are_unchanged() {
        let fmt = FpFormat::new(4, 3);
        // 1.101b * 2^0
        let r = fmt.round(false, &n(0b1101), -3, false, Rounding::NearestEven);
        assert_eq!(r, fmt.normal(false, 7, n(0b101)));
        // a short mantissa is widened
        let r = fmt.round(true, &n(0b11), 0, false, Rounding::NearestEven);
        assert_eq!(r, fmt.normal(true, 8, n(0b100)));
    }

    #[test]
    fn ties_go_to_even() {
        let fmt = FpFormat::new(4, 3);
        // 1.0011b: tie, lsb 1 -> up
        let up = fmt.round(false, &n(0b10011), -4, false, Rounding::NearestEven);
        assert_eq!(up, fmt.normal(false, 7, n(0b010)));
        // 1.0001b: tie, lsb 0 -> down
        let down = fmt.round(false, &n(0b10001), -4, false, Rounding::NearestEven);
        assert_eq!(down, fmt.normal(false, 7, n(0b000)));
        // the sticky tail breaks the tie
        let up = fmt.round(false, &n(0b10001), -4, true, Rounding::NearestEven);
        assert_eq!(up, fmt.normal(false, 7, n(0b001)));
    }

    #[test]
    fn carry_renormalizes() {
        let fmt = FpFormat::new(4, 3);
        let r = fmt.round(false, &n(0b11111), -4, false, Rounding::NearestEven);
        assert_eq!(r, fmt.normal(false, 8, n(0)));
    }

    #[test]
    fn directed_modes_bracket_the_value() {
        let fmt = FpFormat::new(4, 3);
        let set = fmt.round_set(false, &n(0b10011), -4, false, false);
        assert_eq!(set, vec![fmt.normal(false, 7, n(0b001)), fmt.normal(false, 7, n(0b010))]);
        let exact = fmt.round_set(false, &n(0b1000), -3, false, false);
        assert_eq!(exact[0], exact[1]);
    }

    #[test]
    fn range_limits() {
        let fmt = FpFormat::new(3, 2);
        // largest normal is 1.11b * 2^4
        assert_eq!(fmt.round(true, &n(1), 5, false, Rounding::NearestEven), fmt.infinity(true));
        assert_eq!(fmt.round(false, &n(1), -3, false, Rounding::NearestEven), fmt.normal(false, 0, n(0)));
        assert_eq!(fmt.round(true, &n(1), -4, false, Rounding::NearestEven), fmt.zero(true));
    }

    #[test]
    fn narrow_exponent_is_rejected() {
        let err = FpFormat::new(2, 10).validate().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "invalid parameter 'exponent_width': must be at least 3, got 2"
        );
    }
}
