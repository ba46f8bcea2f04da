//! The `test.input` stimulus file read by file-based testbenches.
//!
//! One line per test case: the input values as bit strings, in port order,
//! then for each output the number of acceptable values followed by the
//! values themselves. Fields are separated by single spaces so that VHDL
//! `textio` can read them back with plain `read` calls.

use pipegen_common::Bits;
use pipegen_core::TestCaseList;

/// Returns the text of the stimulus file for `tests`.
pub fn test_input(tests: &TestCaseList) -> String {
    let mut out = String::new();
    for tc in tests {
        let mut fields: Vec<String> = tc
            .inputs()
            .map(|(_, width, value)| match value {
                Some(v) => Bits::new(v.clone(), width).to_string(),
                None => Bits::zero(width).to_string(),
            })
            .collect();
        for (_, width, values) in tc.outputs() {
            fields.push(values.len().to_string());
            fields.extend(values.iter().map(|v| Bits::new(v.clone(), width).to_string()));
        }
        out.push_str(&fields.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Adder3;
    use malachite::Natural;
    use pipegen_core::{ArithmeticOperator, GenerationContext};

    #[test]
    fn one_line_per_case() {
        let mut ctx = GenerationContext::new();
        let model = Adder3::new(&mut ctx, 0, false);
        let mut tests = TestCaseList::new();
        let mut tc = model.new_test_case();
        tc.set_input("X", Natural::from(6u32)).unwrap();
        tc.set_input("Y", Natural::from(3u32)).unwrap();
        model.emulate(&mut tc).unwrap();
        tests.add(tc);
        assert_eq!(test_input(&tests), "110 011 1 001\n");
    }

    #[test]
    fn several_acceptable_values_are_counted() {
        let mut ctx = GenerationContext::new();
        let model = Adder3::new(&mut ctx, 0, false);
        let mut tests = TestCaseList::new();
        let mut tc = model.new_test_case();
        tc.set_input("X", Natural::from(1u32)).unwrap();
        tc.set_input("Y", Natural::from(1u32)).unwrap();
        tc.add_expected("R", Natural::from(2u32)).unwrap();
        tc.add_expected("R", Natural::from(3u32)).unwrap();
        tests.add(tc);
        assert_eq!(test_input(&tests), "001 001 2 010 011\n");
    }
}
