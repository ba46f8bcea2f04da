//! State shared by every operator of one generation run.
//!
//! [`GenerationContext`] replaces process-wide globals: it hands out unique
//! ids for entity names, collects diagnostics, and owns the flat list of
//! every operator built so far together with the instantiation hierarchy.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use pipegen_diagnostics::DiagnosticSink;
use pipegen_ir::Operator;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

/// Mutable state threaded through every operator constructor.
#[derive(Debug, Default)]
pub struct GenerationContext {
    next_uid: u32,
    sink: DiagnosticSink,
    operators: Vec<Arc<Operator>>,
    hierarchy: DiGraph<Arc<Operator>, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl GenerationContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id.
    pub fn new_uid(&mut self) -> u32 {
        self.next_uid += 1;
        self.next_uid
    }

    /// Returns `base` suffixed with a fresh id, e.g. `IntAdder_32_uid4`.
    pub fn unique_name(&mut self, base: &str) -> String {
        let uid = self.new_uid();
        format!("{base}_uid{uid}")
    }

    /// Returns the diagnostic sink.
    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// Records a finished operator and its instantiation edges.
    pub fn register(&mut self, operator: Operator) -> Arc<Operator> {
        let operator = Arc::new(operator);
        let node = self.node_for(&operator);
        for child in operator.children() {
            let child_node = self.node_for(child);
            self.hierarchy.add_edge(node, child_node, ());
        }
        self.operators.push(Arc::clone(&operator));
        operator
    }

    fn node_for(&mut self, operator: &Arc<Operator>) -> NodeIndex {
        if let Some(node) = self.nodes.get(&operator.name) {
            return *node;
        }
        let node = self.hierarchy.add_node(Arc::clone(operator));
        self.nodes.insert(operator.name.clone(), node);
        node
    }

    /// Returns every registered operator in registration order.
    pub fn operators(&self) -> &[Arc<Operator>] {
        &self.operators
    }

    /// Looks a registered operator up by entity name.
    pub fn operator(&self, name: &str) -> Option<&Arc<Operator>> {
        self.operators.iter().find(|op| op.name == name)
    }

    /// Returns the operators reachable from `top`, children before parents,
    /// each once. This is the order in which entities must be emitted.
    pub fn design_order(&self, top: &Operator) -> Vec<Arc<Operator>> {
        let Some(start) = self.nodes.get(&top.name) else {
            return Vec::new();
        };
        let mut order = Vec::new();
        let mut dfs = DfsPostOrder::new(&self.hierarchy, *start);
        while let Some(node) = dfs.next(&self.hierarchy) {
            order.push(Arc::clone(&self.hierarchy[node]));
        }
        order
    }

    /// Renders the entity tree below `top`, children first, with the
    /// pipeline depth of each entity.
    pub fn final_report(&self, top: &Operator) -> String {
        let mut out = String::new();
        report_entity(&mut out, top, 0);
        out
    }
}

fn report_entity(out: &mut String, op: &Operator, level: usize) {
    for child in op.children() {
        report_entity(out, child, level + 1);
    }
    let mut tabs = String::new();
    let mut ctabs = String::new();
    for _ in 1..level {
        tabs.push_str("|   ");
        ctabs.push_str("|   ");
    }
    if level > 0 {
        tabs.push_str("|---");
        ctabs.push_str("|   ");
    }
    let _ = writeln!(out, "{tabs}Entity {}", op.name);
    if op.pipeline_depth != 0 {
        let _ = writeln!(out, "{ctabs}   Pipeline depth = {}", op.pipeline_depth);
    } else {
        let _ = writeln!(out, "{ctabs}   Not pipelined");
    }
}
