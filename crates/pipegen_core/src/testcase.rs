//! Test vectors: input stimuli and the set of acceptable outputs.

use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use pipegen_common::{GenResult, InternalError};
use pipegen_ir::Operator;

#[derive(Debug, Clone, PartialEq)]
struct InputSlot {
    name: String,
    width: u32,
    value: Option<Natural>,
}

#[derive(Debug, Clone, PartialEq)]
struct OutputSlot {
    name: String,
    width: u32,
    values: Vec<Natural>,
}

/// One test vector of an operator.
///
/// Inputs and outputs follow the operator's port order. Every input holds
/// exactly one value; every output holds the list of values the hardware may
/// legally produce (more than one only for faithfully rounded results).
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    inputs: Vec<InputSlot>,
    outputs: Vec<OutputSlot>,
    comment: String,
}

impl TestCase {
    /// Creates an empty test case for the ports of `op`.
    pub fn new(op: &Operator) -> Self {
        Self {
            inputs: op
                .input_signals()
                .map(|s| InputSlot {
                    name: s.name.clone(),
                    width: s.width,
                    value: None,
                })
                .collect(),
            outputs: op
                .output_signals()
                .map(|s| OutputSlot {
                    name: s.name.clone(),
                    width: s.width,
                    values: Vec::new(),
                })
                .collect(),
            comment: String::new(),
        }
    }

    /// Sets the value of an input port.
    ///
    /// # Errors
    ///
    /// Fails for an unknown port or a value wider than the port.
    pub fn set_input(&mut self, name: &str, value: Natural) -> GenResult<()> {
        let slot = self
            .inputs
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| InternalError::new(format!("test case has no input '{name}'")))?;
        if value >= Natural::power_of_2(u64::from(slot.width)) {
            return Err(InternalError::new(format!(
                "value {value} does not fit the {} bits of input '{name}'",
                slot.width
            )));
        }
        slot.value = Some(value);
        Ok(())
    }

    /// Returns the value of an input port.
    pub fn input(&self, name: &str) -> GenResult<&Natural> {
        self.inputs
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.value.as_ref())
            .ok_or_else(|| InternalError::new(format!("input '{name}' has no value")))
    }

    /// Adds an acceptable value for an output port; duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Fails for an unknown port or a value wider than the port.
    pub fn add_expected(&mut self, name: &str, value: Natural) -> GenResult<()> {
        let slot = self
            .outputs
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| InternalError::new(format!("test case has no output '{name}'")))?;
        if value >= Natural::power_of_2(u64::from(slot.width)) {
            return Err(InternalError::new(format!(
                "expected value {value} does not fit the {} bits of output '{name}'",
                slot.width
            )));
        }
        if !slot.values.contains(&value) {
            slot.values.push(value);
        }
        Ok(())
    }

    /// Returns the acceptable values of an output port.
    pub fn expected(&self, name: &str) -> &[Natural] {
        self.outputs
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.values.as_slice())
            .unwrap_or(&[])
    }

    /// Forgets every expected value.
    pub fn clear_expected(&mut self) {
        for slot in &mut self.outputs {
            slot.values.clear();
        }
    }

    /// Iterates over `(name, width, value)` of the inputs.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, u32, Option<&Natural>)> {
        self.inputs
            .iter()
            .map(|s| (s.name.as_str(), s.width, s.value.as_ref()))
    }

    /// Iterates over `(name, width, acceptable values)` of the outputs.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, u32, &[Natural])> {
        self.outputs
            .iter()
            .map(|s| (s.name.as_str(), s.width, s.values.as_slice()))
    }

    /// Returns `true` once every input has a value and every output at
    /// least one expected value.
    pub fn is_complete(&self) -> bool {
        self.inputs.iter().all(|s| s.value.is_some())
            && self.outputs.iter().all(|s| !s.values.is_empty())
    }

    /// Sets the free-text comment.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Returns the free-text comment.
    pub fn comment(&self) -> &str {
        &self.comment
    }
}

/// An ordered list of test cases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCaseList {
    cases: Vec<TestCase>,
}

impl TestCaseList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a test case.
    pub fn add(&mut self, tc: TestCase) {
        self.cases.push(tc);
    }

    /// Returns the number of test cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Returns a test case by index.
    pub fn get(&self, index: usize) -> Option<&TestCase> {
        self.cases.get(index)
    }

    /// Iterates over the test cases.
    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }

    /// Iterates mutably over the test cases.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TestCase> {
        self.cases.iter_mut()
    }

    /// Appends every case of `other`.
    pub fn extend(&mut self, other: TestCaseList) {
        self.cases.extend(other.cases);
    }
}

impl<'a> IntoIterator for &'a TestCaseList {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}
