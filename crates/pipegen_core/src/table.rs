//! Ownership of an operator's declared signals.

use crate::error::GenError;
use pipegen_ir::{Arena, Signal, SignalId, SignalKind};
use std::collections::HashMap;

/// The declared signals of one operator under construction.
///
/// Names are unique. Ports are additionally listed in declaration order so
/// the generated interface keeps the order the author chose.
#[derive(Debug, Default)]
pub struct SignalTable {
    signals: Arena<SignalId, Signal>,
    by_name: HashMap<String, SignalId>,
    inputs: Vec<SignalId>,
    outputs: Vec<SignalId>,
}

impl SignalTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::DuplicateSignal`] if the name is taken.
    pub fn declare(&mut self, signal: Signal) -> Result<SignalId, GenError> {
        if self.by_name.contains_key(&signal.name) {
            return Err(GenError::DuplicateSignal(signal.name));
        }
        let name = signal.name.clone();
        let kind = signal.kind;
        let id = self.signals.alloc(signal);
        self.by_name.insert(name, id);
        match kind {
            SignalKind::Input => self.inputs.push(id),
            SignalKind::Output => self.outputs.push(id),
            _ => {}
        }
        Ok(id)
    }

    /// Looks a signal up by name.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UndeclaredSignal`] if no signal has this name.
    pub fn lookup(&self, name: &str) -> Result<SignalId, GenError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GenError::UndeclaredSignal(name.to_string()))
    }

    /// Returns `true` if a signal has this name.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Returns a signal, or `None` for an ID from another table.
    pub fn try_get(&self, id: SignalId) -> Option<&Signal> {
        self.signals.try_get(id)
    }

    /// Returns a signal.
    pub fn get(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }

    /// Returns a signal mutably.
    pub fn get_mut(&mut self, id: SignalId) -> &mut Signal {
        &mut self.signals[id]
    }

    /// Returns the input ports in declaration order.
    pub fn inputs(&self) -> &[SignalId] {
        &self.inputs
    }

    /// Returns the output ports in declaration order.
    pub fn outputs(&self) -> &[SignalId] {
        &self.outputs
    }

    /// Returns the number of signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if no signal is declared.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Iterates over `(id, signal)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &Signal)> {
        self.signals.iter()
    }

    /// Consumes the table, returning the arena and the port lists.
    pub fn into_parts(self) -> (Arena<SignalId, Signal>, Vec<SignalId>, Vec<SignalId>) {
        (self.signals, self.inputs, self.outputs)
    }
}
