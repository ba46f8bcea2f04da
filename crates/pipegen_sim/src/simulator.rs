//! The cycle-accurate simulation of one resolved operator.
//!
//! Each clock period is simulated in two phases. [`Simulator::settle`]
//! evaluates every concurrent statement once, in an order where each
//! undelayed read comes after its driver. [`Simulator::clock`] then shifts
//! every register chain by one. Child instances are simulated by nested
//! simulators that settle and clock with their parent.

use crate::error::SimError;
use crate::evaluator::{eval_cond, eval_expr, TapSource};
use malachite::base::num::arithmetic::traits::PowerOf2;
use malachite::Natural;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use pipegen_common::Bits;
use pipegen_ir::{Instance, Operator, SignalId, Statement, Tap};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct SignalState {
    current: Bits,
    /// `chain[k]` is the value `k + 1` cycles ago.
    chain: VecDeque<Bits>,
    lifespan: u32,
}

#[derive(Debug)]
struct Values<'a> {
    op: &'a Operator,
    state: &'a [SignalState],
}

impl TapSource for Values<'_> {
    fn tap(&self, tap: &Tap) -> Result<&Bits, SimError> {
        let s = &self.state[tap.signal.as_raw() as usize];
        if tap.delay == 0 {
            return Ok(&s.current);
        }
        s.chain
            .get(tap.delay as usize - 1)
            .ok_or_else(|| SimError::TapOutOfRange {
                signal: self.op.signal(tap.signal).name.clone(),
                delay: tap.delay,
                lifespan: s.lifespan,
            })
    }
}

/// Simulator of one operator and, recursively, its children.
#[derive(Debug)]
pub struct Simulator {
    op: Arc<Operator>,
    state: Vec<SignalState>,
    order: Vec<usize>,
    children: HashMap<usize, Simulator>,
    cycles: u64,
}

impl Simulator {
    /// Prepares a simulation with every signal and register at zero.
    ///
    /// # Errors
    ///
    /// Fails if undelayed reads form a loop, in this operator or a child.
    pub fn new(op: &Arc<Operator>) -> Result<Self, SimError> {
        let state = op
            .signals
            .values()
            .map(|s| SignalState {
                current: Bits::zero(s.width),
                chain: (0..s.lifespan).map(|_| Bits::zero(s.width)).collect(),
                lifespan: s.lifespan,
            })
            .collect();
        let mut children = HashMap::new();
        for (index, tagged) in op.statements.iter().enumerate() {
            if let Statement::Instance(inst) = &tagged.stmt {
                children.insert(index, Simulator::new(&inst.child)?);
            }
        }
        Ok(Self {
            order: evaluation_order(op)?,
            op: Arc::clone(op),
            state,
            children,
            cycles: 0,
        })
    }

    /// Returns the simulated operator.
    pub fn operator(&self) -> &Arc<Operator> {
        &self.op
    }

    /// Returns the number of clock edges so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn port(&self, name: &str) -> Result<SignalId, SimError> {
        self.op.port(name).ok_or_else(|| SimError::UnknownPort {
            operator: self.op.name.clone(),
            port: name.to_string(),
        })
    }

    /// Drives an input port for the current cycle.
    pub fn set_input(&mut self, name: &str, value: &Natural) -> Result<(), SimError> {
        let id = self.port(name)?;
        let width = self.op.signal(id).width;
        if *value >= Natural::power_of_2(u64::from(width)) {
            return Err(SimError::ValueTooWide {
                port: name.to_string(),
                width,
                value: value.to_string(),
            });
        }
        self.state[id.as_raw() as usize].current = Bits::new(value.clone(), width);
        Ok(())
    }

    /// Returns the settled value of a port.
    pub fn output(&self, name: &str) -> Result<&Bits, SimError> {
        let id = self.port(name)?;
        Ok(&self.state[id.as_raw() as usize].current)
    }

    /// Returns the settled values of every output port.
    pub fn outputs(&self) -> BTreeMap<String, Natural> {
        self.op
            .outputs
            .iter()
            .map(|id| {
                let name = self.op.signal(*id).name.clone();
                (name, self.state[id.as_raw() as usize].current.value().clone())
            })
            .collect()
    }

    /// Evaluates every concurrent statement of the current cycle.
    pub fn settle(&mut self) -> Result<(), SimError> {
        for i in 0..self.order.len() {
            let index = self.order[i];
            self.execute(index)?;
        }
        Ok(())
    }

    fn execute(&mut self, index: usize) -> Result<(), SimError> {
        let op = Arc::clone(&self.op);
        let values = Values {
            op: &op,
            state: &self.state,
        };
        let (target, value) = match &op.statements[index].stmt {
            Statement::Assign { target, value } => (*target, eval_expr(&values, value)?),
            Statement::Conditional {
                target,
                arms,
                otherwise,
            } => {
                let mut chosen = otherwise;
                for (cond, value) in arms {
                    if eval_cond(&values, cond)? {
                        chosen = value;
                        break;
                    }
                }
                (*target, eval_expr(&values, chosen)?)
            }
            Statement::Select {
                target,
                selector,
                arms,
                otherwise,
            } => {
                let sel = values.tap(selector)?;
                let chosen = arms
                    .iter()
                    .find(|arm| arm.choices.iter().any(|c| c == sel))
                    .map_or(otherwise, |arm| &arm.value);
                (*target, eval_expr(&values, chosen)?)
            }
            Statement::Instance(inst) => return self.execute_instance(index, inst),
            Statement::Comment(_) | Statement::Barrier(_) => return Ok(()),
        };
        self.state[target.as_raw() as usize].current = value;
        Ok(())
    }

    fn execute_instance(&mut self, index: usize, inst: &Instance<Tap>) -> Result<(), SimError> {
        let values = Values {
            op: &self.op,
            state: &self.state,
        };
        let actuals = inst
            .inputs
            .iter()
            .map(|(port, e)| Ok((port.as_str(), eval_expr(&values, e)?)))
            .collect::<Result<Vec<_>, SimError>>()?;
        let child = self.children.get_mut(&index).ok_or_else(|| {
            pipegen_common::InternalError::new(format!("no simulator for instance '{}'", inst.name))
        })?;
        for (port, value) in &actuals {
            child.set_input(port, value.value())?;
        }
        child.settle()?;
        let mut results = Vec::with_capacity(inst.outputs.len());
        for (port, id) in &inst.outputs {
            results.push((*id, child.output(port)?.clone()));
        }
        for (id, value) in results {
            self.state[id.as_raw() as usize].current = value;
        }
        Ok(())
    }

    /// Applies one rising clock edge: every register chain shifts by one.
    pub fn clock(&mut self) {
        for s in &mut self.state {
            if s.lifespan > 0 {
                s.chain.push_front(s.current.clone());
                s.chain.truncate(s.lifespan as usize);
            }
        }
        for child in self.children.values_mut() {
            child.clock();
        }
        self.cycles += 1;
    }

    /// Drives the inputs, settles, samples the outputs and clocks.
    pub fn step(
        &mut self,
        inputs: &BTreeMap<String, Natural>,
    ) -> Result<BTreeMap<String, Natural>, SimError> {
        for (name, value) in inputs {
            self.set_input(name, value)?;
        }
        self.settle()?;
        let outputs = self.outputs();
        self.clock();
        Ok(outputs)
    }
}

/// Orders the statements so that every undelayed read follows its driver.
fn evaluation_order(op: &Operator) -> Result<Vec<usize>, SimError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();
    let mut drivers: HashMap<SignalId, NodeIndex> = HashMap::new();
    for (index, tagged) in op.statements.iter().enumerate() {
        let targets = tagged.stmt.targets();
        if targets.is_empty() {
            continue;
        }
        let node = graph.add_node(index);
        nodes.insert(index, node);
        for target in targets {
            drivers.insert(target, node);
        }
    }
    for (index, tagged) in op.statements.iter().enumerate() {
        let Some(&node) = nodes.get(&index) else {
            continue;
        };
        tagged.stmt.for_each_leaf(&mut |tap: &Tap| {
            if tap.delay == 0 {
                if let Some(&driver) = drivers.get(&tap.signal) {
                    graph.add_edge(driver, node, ());
                }
            }
        });
    }
    let sorted = toposort(&graph, None).map_err(|cycle| {
        let index = graph[cycle.node_id()];
        let signal = op.statements[index]
            .stmt
            .targets()
            .first()
            .map(|id| op.signal(*id).name.clone())
            .unwrap_or_default();
        SimError::CombinationalLoop {
            operator: op.name.clone(),
            signal,
        }
    })?;
    Ok(sorted.into_iter().map(|n| graph[n]).collect())
}

/// Streams one input vector per cycle through `op` and returns, for each,
/// the outputs sampled `pipeline_depth` cycles later.
///
/// After the last vector, the inputs are held for the drain cycles.
pub fn run_vectors(
    op: &Arc<Operator>,
    vectors: &[BTreeMap<String, Natural>],
) -> Result<Vec<BTreeMap<String, Natural>>, SimError> {
    let mut sim = Simulator::new(op)?;
    let depth = op.pipeline_depth as usize;
    let mut results = Vec::with_capacity(vectors.len());
    let empty = BTreeMap::new();
    for cycle in 0..vectors.len() + depth {
        let inputs = vectors.get(cycle).unwrap_or(&empty);
        let outputs = sim.step(inputs)?;
        if cycle >= depth {
            results.push(outputs);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_core::{GenerationContext, OperatorBuilder, PortMap};
    use pipegen_target::{load_target, Target, TargetOptions};

    fn target() -> Box<dyn Target> {
        load_target("xilinx", Some("virtex5"), 400.0, TargetOptions::default()).unwrap()
    }

    fn inputs(pairs: &[(&str, u64)]) -> BTreeMap<String, Natural> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), Natural::from(*v)))
            .collect()
    }

    fn adder(ctx: &mut GenerationContext, t: &dyn Target) -> Arc<Operator> {
        let mut b = OperatorBuilder::new(ctx.unique_name("Add2"), t);
        let x = b.add_input("X", 8).unwrap();
        let y = b.add_input("Y", 8).unwrap();
        let r = b.add_output("R", 8).unwrap();
        let sum = b.define("sum", b.s(x).add(b.s(y))).unwrap();
        b.next_cycle();
        let twice = b.define("twice", b.s(sum).add(b.s(x))).unwrap();
        b.next_cycle();
        b.assign(r, b.s(twice)).unwrap();
        b.finish(ctx).unwrap()
    }

    #[test]
    fn pipeline_latency_is_respected() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let op = adder(&mut ctx, t.as_ref());
        assert_eq!(op.pipeline_depth, 2);
        let vectors: Vec<_> = (0..5u64)
            .map(|i| inputs(&[("X", i * 10), ("Y", i + 1)]))
            .collect();
        let out = run_vectors(&op, &vectors).unwrap();
        assert_eq!(out.len(), 5);
        for (i, o) in out.iter().enumerate() {
            let i = i as u64;
            assert_eq!(o["R"], Natural::from((2 * i * 10 + i + 1) % 256));
        }
    }

    #[test]
    fn child_instances_are_simulated() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let child = adder(&mut ctx, t.as_ref());
        let mut b = OperatorBuilder::new(ctx.unique_name("Wrap"), t.as_ref());
        let a = b.add_input("A", 8).unwrap();
        let r = b.add_output("R", 8).unwrap();
        let outs = b
            .instantiate(
                &child,
                "inner",
                PortMap::new()
                    .input("X", b.s(a))
                    .input("Y", b.s(a).not())
                    .output("R", "inner_r"),
            )
            .unwrap();
        b.sync_with(&outs).unwrap();
        b.assign(r, b.s(outs[0]).xor(b.s(a))).unwrap();
        let top = b.finish(&mut ctx).unwrap();
        assert_eq!(top.pipeline_depth, 2);

        let vectors: Vec<_> = [3u64, 200, 77].iter().map(|v| inputs(&[("A", *v)])).collect();
        let out = run_vectors(&top, &vectors).unwrap();
        for (v, o) in [3u64, 200, 77].iter().zip(&out) {
            let inner = (2 * v + (255 - v)) % 256;
            assert_eq!(o["R"], Natural::from(inner ^ v));
        }
    }

    #[test]
    fn feedback_accumulates() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let mut b = OperatorBuilder::new("Acc", t.as_ref());
        let x = b.add_input("X", 8).unwrap();
        let r = b.add_output("R", 8).unwrap();
        let ext = b.declare_feedback("acc_ext", 8).unwrap();
        let acc = b.define("acc", b.s(ext)).unwrap();
        b.next_cycle();
        b.assign(ext, b.s(acc).add(b.s(x))).unwrap();
        b.assign(r, b.s(ext)).unwrap();
        let op = b.finish(&mut ctx).unwrap();

        let mut sim = Simulator::new(&op).unwrap();
        let mut seen = Vec::new();
        for v in [1u64, 2, 3, 4] {
            seen.push(sim.step(&inputs(&[("X", v)])).unwrap()["R"].clone());
        }
        // R(t) = sum of X up to t - 1
        let expected: Vec<Natural> = [0u64, 1, 3, 6].iter().map(|v| Natural::from(*v)).collect();
        assert_eq!(seen, expected);
        assert_eq!(sim.cycles(), 4);
    }

    #[test]
    fn rejects_bad_ports_and_values() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let op = adder(&mut ctx, t.as_ref());
        let mut sim = Simulator::new(&op).unwrap();
        assert!(matches!(
            sim.set_input("Q", &Natural::from(1u32)),
            Err(SimError::UnknownPort { .. })
        ));
        assert!(matches!(
            sim.set_input("X", &Natural::from(256u32)),
            Err(SimError::ValueTooWide { width: 8, .. })
        ));
    }
}
