//! The resolved operator: signals, ports, cycle-tagged body, timing.

use crate::arena::Arena;
use crate::ids::SignalId;
use crate::signal::Signal;
use crate::stmt::{Statement, Tagged};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A signal read at an absolute cycle, as recorded while an operator is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalUse {
    /// The signal read.
    pub signal: SignalId,
    /// The cycle at which the value is needed.
    pub cycle: u32,
}

/// A signal read through a fixed number of pipeline registers.
///
/// `delay == 0` is the signal itself; `delay == k` is the `k`-th register of
/// its chain, named `<name>_d<k>` in the generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tap {
    /// The signal read.
    pub signal: SignalId,
    /// Number of registers between the definition and the read.
    pub delay: u32,
}

impl Tap {
    /// An undelayed read.
    pub fn direct(signal: SignalId) -> Self {
        Self { signal, delay: 0 }
    }
}

/// Clocking interface of a generated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Clocking {
    /// The entity has `clk` and `rst` ports and register processes.
    pub sequential: bool,
    /// Registers are guarded by a `ce` input.
    pub clock_enable: bool,
    /// Registers are guarded by a `stall_s` input.
    pub recirculation: bool,
}

/// A synthesis attribute attached to an object of the architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, e.g. `rom_style`.
    pub name: String,
    /// Attribute type, e.g. `string`.
    pub type_name: String,
    /// The decorated object, e.g. `MyTable: component`.
    pub object: String,
    /// Attribute value, unquoted.
    pub value: String,
}

/// A fully built and resolved operator.
///
/// Every read in the body is a [`Tap`], so back ends can name each value
/// without any further timing analysis.
#[derive(Debug, Clone)]
pub struct Operator {
    /// Entity name, unique within a generation run.
    pub name: String,
    /// Copyright line of the generated header.
    pub copyright: String,
    /// One-line description of what the operator computes.
    pub description: String,
    /// All signals, ports included, in declaration order.
    pub signals: Arena<SignalId, Signal>,
    /// Input ports, in interface order.
    pub inputs: Vec<SignalId>,
    /// Output ports, in interface order.
    pub outputs: Vec<SignalId>,
    /// The body, in emission order.
    pub statements: Vec<Tagged<Tap>>,
    /// Synthesis attributes.
    pub attributes: Vec<Attribute>,
    /// Cycles from inputs to outputs.
    pub pipeline_depth: u32,
    /// Arrival delay (ns) of each input port.
    pub input_delays: BTreeMap<String, f64>,
    /// Combinational delay (ns) remaining at each output port.
    pub output_delays: BTreeMap<String, f64>,
    /// Clocking interface.
    pub clocking: Clocking,
}

impl Operator {
    /// Returns the signal with the given ID.
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }

    /// Returns `true` if the entity has a clock.
    pub fn is_sequential(&self) -> bool {
        self.clocking.sequential
    }

    /// Looks up a port by name.
    pub fn port(&self, name: &str) -> Option<SignalId> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .copied()
            .find(|id| self.signals[*id].name == name)
    }

    /// Looks up an input port by name.
    pub fn input(&self, name: &str) -> Option<&Signal> {
        self.inputs
            .iter()
            .map(|id| &self.signals[*id])
            .find(|s| s.name == name)
    }

    /// Looks up an output port by name.
    pub fn output(&self, name: &str) -> Option<&Signal> {
        self.outputs
            .iter()
            .map(|id| &self.signals[*id])
            .find(|s| s.name == name)
    }

    /// Iterates over the input port signals.
    pub fn input_signals(&self) -> impl Iterator<Item = &Signal> {
        self.inputs.iter().map(|id| &self.signals[*id])
    }

    /// Iterates over the output port signals.
    pub fn output_signals(&self) -> impl Iterator<Item = &Signal> {
        self.outputs.iter().map(|id| &self.signals[*id])
    }

    /// Returns the combinational delay at an output port (0 if unknown).
    pub fn output_delay(&self, port: &str) -> f64 {
        self.output_delays.get(port).copied().unwrap_or(0.0)
    }

    /// Returns the largest input arrival delay.
    pub fn max_input_delay(&self) -> f64 {
        self.input_delays.values().copied().fold(0.0, f64::max)
    }

    /// Returns the total width of all inputs.
    pub fn total_input_width(&self) -> u32 {
        self.input_signals().map(|s| s.width).sum()
    }

    /// Returns the distinct child operators, in first-instantiation order.
    pub fn children(&self) -> Vec<&Arc<Operator>> {
        let mut seen: Vec<&Arc<Operator>> = Vec::new();
        for tagged in &self.statements {
            if let Statement::Instance(inst) = &tagged.stmt {
                if !seen.iter().any(|c| c.name == inst.child.name) {
                    seen.push(&inst.child);
                }
            }
        }
        seen
    }

    /// Returns the number of registers instantiated for signal lifespans.
    pub fn register_count(&self) -> u32 {
        self.signals.values().map(|s| s.lifespan).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::signal::SignalKind;
    use crate::stmt::Instance;

    fn leaf(name: &str, depth: u32) -> Operator {
        let mut signals = Arena::new();
        let x = signals.alloc(Signal::new("X", 4, SignalKind::Input, 0));
        let r = signals.alloc(Signal::new("R", 4, SignalKind::Output, depth));
        Operator {
            name: name.to_string(),
            copyright: String::new(),
            description: String::new(),
            signals,
            inputs: vec![x],
            outputs: vec![r],
            statements: vec![Tagged {
                cycle: depth,
                stmt: Statement::Assign {
                    target: r,
                    value: Expr::Signal(Tap { signal: x, delay: depth }),
                },
            }],
            attributes: Vec::new(),
            pipeline_depth: depth,
            input_delays: BTreeMap::from([("X".to_string(), 0.5)]),
            output_delays: BTreeMap::from([("R".to_string(), 0.25)]),
            clocking: Clocking {
                sequential: depth > 0,
                ..Clocking::default()
            },
        }
    }

    #[test]
    fn port_lookup_and_delays() {
        let op = leaf("Delay_uid1", 2);
        assert_eq!(op.port("R"), Some(SignalId::from_raw(1)));
        assert!(op.port("Y").is_none());
        assert_eq!(op.input("X").map(|s| s.width), Some(4));
        assert_eq!(op.output_delay("R"), 0.25);
        assert_eq!(op.output_delay("S"), 0.0);
        assert_eq!(op.max_input_delay(), 0.5);
        assert_eq!(op.total_input_width(), 4);
        assert!(op.is_sequential());
    }

    #[test]
    fn children_are_deduplicated() {
        let child = Arc::new(leaf("Delay_uid1", 1));
        let mut parent = leaf("Top_uid2", 0);
        for label in ["a", "b"] {
            parent.statements.push(Tagged {
                cycle: 0,
                stmt: Statement::Instance(Instance {
                    name: label.to_string(),
                    child: Arc::clone(&child),
                    inputs: Vec::new(),
                    outputs: Vec::new(),
                }),
            });
        }
        let children = parent.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "Delay_uid1");
    }
}
