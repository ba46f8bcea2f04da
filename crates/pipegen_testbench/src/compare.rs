//! Output comparison that understands floating-point encodings.
//!
//! In the exception-tagged format several bit patterns denote the same
//! value: any NaN is a NaN, and the exponent and fraction fields of a zero
//! or an infinity are don't-cares. IEEE NaNs likewise differ only in their
//! payload.

use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::base::num::logic::traits::BitAccess;
use malachite::Natural;
use pipegen_common::bits::{all_ones, mask};
use pipegen_ir::NumericFormat;

/// Compares two exception-tagged floats.
///
/// NaNs compare on the exception tag alone, zeros and infinities on tag and
/// sign, and normal numbers on every bit.
pub fn fp_equal(we: u32, wf: u32, actual: &Natural, expected: &Natural) -> bool {
    let tag_shift = u64::from(we + wf + 1);
    let (ta, te) = (actual >> tag_shift, expected >> tag_shift);
    if ta != te {
        return false;
    }
    match u64::try_from(&te) {
        Ok(3) => true,
        Ok(1) => actual == expected,
        _ => {
            let sign = u64::from(we + wf);
            actual.get_bit(sign) == expected.get_bit(sign)
        }
    }
}

fn ieee_is_nan(we: u32, wf: u32, v: &Natural) -> bool {
    let exponent = mask(&(v >> u64::from(wf)), we);
    let fraction = v % Natural::power_of_2(u64::from(wf));
    exponent == all_ones(we) && fraction != 0u32
}

/// Compares two IEEE-754 encodings; all NaNs are equal.
pub fn fp_equal_ieee(we: u32, wf: u32, actual: &Natural, expected: &Natural) -> bool {
    if ieee_is_nan(we, wf, expected) {
        ieee_is_nan(we, wf, actual)
    } else {
        actual == expected
    }
}

/// Returns `true` if `actual` matches one of the acceptable values of an
/// output with the given numeric format.
pub fn output_matches(format: NumericFormat, actual: &Natural, expected: &[Natural]) -> bool {
    expected.iter().any(|e| match format {
        NumericFormat::Bits => actual == e,
        NumericFormat::TaggedFloat { we, wf } => fp_equal(we, wf, actual, e),
        NumericFormat::IeeeFloat { we, wf } => fp_equal_ieee(we, wf, actual, e),
    })
}
