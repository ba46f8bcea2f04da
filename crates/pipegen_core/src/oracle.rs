//! The contract between a generated operator and its exact-arithmetic model.

use crate::testcase::{TestCase, TestCaseList};
use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use pipegen_common::bits::mask;
use pipegen_common::GenResult;
use pipegen_ir::{NumericFormat, Operator};
use rand::rngs::StdRng;
use rand::RngCore;
use std::sync::Arc;

/// Returns a uniformly random `width`-bit value.
pub fn random_bits(rng: &mut StdRng, width: u32) -> Natural {
    let mut value = Natural::from(0u32);
    let mut filled = 0;
    while filled < width {
        value = (value << 64u64) + Natural::from(rng.next_u64());
        filled += 64;
    }
    mask(&value, width)
}

/// Returns a random normal number in the exception-tagged format.
pub fn random_normal_float(rng: &mut StdRng, we: u32, wf: u32) -> Natural {
    Natural::power_of_2(u64::from(we + wf + 1)) + random_bits(rng, we + wf + 1)
}

/// A generated operator together with its reference model.
///
/// [`emulate`](ArithmeticOperator::emulate) defines what the operator
/// computes: given the inputs of a test case, it fills in every acceptable
/// output computed with exact arithmetic, independently of the hardware.
pub trait ArithmeticOperator: Send + Sync {
    /// Returns the generated hardware.
    fn operator(&self) -> &Arc<Operator>;

    /// Fills the expected outputs of `tc` from its inputs.
    fn emulate(&self, tc: &mut TestCase) -> GenResult<()>;

    /// Appends hand-picked corner cases, with expected outputs filled in.
    ///
    /// The default adds none.
    fn build_standard_test_cases(&self, _tcl: &mut TestCaseList) -> GenResult<()> {
        Ok(())
    }

    /// Draws one random test case, with expected outputs filled in.
    ///
    /// The default draws each input uniformly, except that floating-point
    /// inputs are always normal numbers.
    fn build_random_test_case(&self, rng: &mut StdRng) -> GenResult<TestCase> {
        let op = self.operator();
        let mut tc = TestCase::new(op);
        for signal in op.input_signals() {
            let value = match signal.numeric {
                NumericFormat::TaggedFloat { we, wf } => random_normal_float(rng, we, wf),
                _ => random_bits(rng, signal.width),
            };
            tc.set_input(&signal.name, value)?;
        }
        self.emulate(&mut tc)?;
        Ok(tc)
    }

    /// Creates an empty test case for this operator's ports.
    fn new_test_case(&self) -> TestCase {
        TestCase::new(self.operator())
    }
}
