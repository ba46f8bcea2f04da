//! The second pass: turning cycle-stamped reads into register taps.
//!
//! During construction every read records the absolute cycle at which the
//! value is needed. Once all statements are known, each read of a signal
//! defined at cycle `d` and used at cycle `u` becomes a tap `u - d` registers
//! down the signal's chain, and the signal's lifespan grows to cover it.

use crate::error::GenError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use pipegen_ir::{Arena, Signal, SignalId, SignalKind, SignalUse, Tagged, Tap};
use std::collections::{HashMap, HashSet};

/// Resolves one read, updating the signal's lifespan.
///
/// A feedback signal may be read exactly one cycle before its definition;
/// that read sees the undelayed value. Any other read before the definition
/// is an ordering error.
pub fn resolve_use(signals: &mut Arena<SignalId, Signal>, u: &SignalUse) -> Result<Tap, GenError> {
    let signal = &mut signals[u.signal];
    let decl = signal
        .cycle
        .ok_or_else(|| GenError::UnresolvedSignal(signal.name.clone()))?;
    if u.cycle >= decl {
        signal.note_use(u.cycle);
        return Ok(Tap {
            signal: u.signal,
            delay: u.cycle - decl,
        });
    }
    if signal.feedback {
        if decl - u.cycle == 1 {
            Ok(Tap::direct(u.signal))
        } else {
            Err(GenError::FeedbackDistance {
                signal: signal.name.clone(),
                use_cycle: u.cycle,
                decl_cycle: decl,
            })
        }
    } else {
        Err(GenError::PipelineOrdering {
            signal: signal.name.clone(),
            use_cycle: u.cycle,
            decl_cycle: decl,
        })
    }
}

/// Resolves every statement and checks the result.
///
/// # Errors
///
/// Fails on ordering violations, on reads of signals that nothing drives,
/// and on combinational loops between undelayed reads.
pub fn resolve(
    signals: &mut Arena<SignalId, Signal>,
    statements: &[Tagged<SignalUse>],
) -> Result<Vec<Tagged<Tap>>, GenError> {
    let mut resolved = Vec::with_capacity(statements.len());
    for tagged in statements {
        let stmt = tagged
            .stmt
            .try_map_leaves(&mut |u: &SignalUse| resolve_use(signals, u))?;
        resolved.push(Tagged {
            cycle: tagged.cycle,
            stmt,
        });
    }
    check_drivers(signals, &resolved)?;
    check_combinational_loops(signals, &resolved)?;
    Ok(resolved)
}

fn check_drivers(
    signals: &Arena<SignalId, Signal>,
    statements: &[Tagged<Tap>],
) -> Result<(), GenError> {
    let mut driven: HashSet<SignalId> = signals
        .iter()
        .filter(|(_, s)| s.kind == SignalKind::Input)
        .map(|(id, _)| id)
        .collect();
    for tagged in statements {
        driven.extend(tagged.stmt.targets());
    }
    for tagged in statements {
        let mut missing = None;
        tagged.stmt.for_each_leaf(&mut |tap| {
            if missing.is_none() && !driven.contains(&tap.signal) {
                missing = Some(tap.signal);
            }
        });
        if let Some(id) = missing {
            return Err(GenError::UnresolvedSignal(signals[id].name.clone()));
        }
    }
    Ok(())
}

fn check_combinational_loops(
    signals: &Arena<SignalId, Signal>,
    statements: &[Tagged<Tap>],
) -> Result<(), GenError> {
    let mut graph: DiGraph<SignalId, ()> = DiGraph::new();
    let mut nodes: HashMap<SignalId, NodeIndex> = HashMap::new();
    let mut node = |graph: &mut DiGraph<SignalId, ()>, id: SignalId| {
        *nodes.entry(id).or_insert_with(|| graph.add_node(id))
    };
    // Instance outputs count as depending on every undelayed input,
    // whatever the child's latency.
    for tagged in statements {
        let targets = tagged.stmt.targets();
        if targets.is_empty() {
            continue;
        }
        let mut sources = Vec::new();
        tagged.stmt.for_each_leaf(&mut |tap| {
            if tap.delay == 0 {
                sources.push(tap.signal);
            }
        });
        for target in &targets {
            let to = node(&mut graph, *target);
            for source in &sources {
                let from = node(&mut graph, *source);
                graph.add_edge(from, to, ());
            }
        }
    }
    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| GenError::AssignmentCycle(signals[graph[cycle.node_id()]].name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_ir::{Expr, Statement};

    fn use_at(signal: SignalId, cycle: u32) -> Expr<SignalUse> {
        Expr::Signal(SignalUse { signal, cycle })
    }

    fn assign(cycle: u32, target: SignalId, value: Expr<SignalUse>) -> Tagged<SignalUse> {
        Tagged {
            cycle,
            stmt: Statement::Assign { target, value },
        }
    }

    #[test]
    fn delays_and_lifespans() {
        let mut signals = Arena::new();
        let x = signals.alloc(Signal::new("X", 4, SignalKind::Input, 0));
        let a = signals.alloc(Signal::new("a", 4, SignalKind::Wire, 1));
        let r = signals.alloc(Signal::new("R", 4, SignalKind::Output, 3));
        let stmts = vec![
            assign(1, a, use_at(x, 1)),
            assign(3, r, use_at(a, 3).add(use_at(x, 3))),
        ];
        let out = resolve(&mut signals, &stmts).unwrap();
        let mut taps = Vec::new();
        out[1].stmt.for_each_leaf(&mut |t| taps.push(*t));
        assert_eq!(
            taps,
            vec![Tap { signal: a, delay: 2 }, Tap { signal: x, delay: 3 }]
        );
        assert_eq!(signals[x].lifespan, 3);
        assert_eq!(signals[a].lifespan, 2);
        assert_eq!(signals[r].lifespan, 0);
    }

    #[test]
    fn read_before_definition_is_rejected() {
        let mut signals = Arena::new();
        let a = signals.alloc(Signal::new("a", 4, SignalKind::Wire, 2));
        let b = signals.alloc(Signal::new("b", 4, SignalKind::Wire, 1));
        let stmts = vec![assign(2, a, Expr::zeros(4)), assign(1, b, use_at(a, 1))];
        let err = resolve(&mut signals, &stmts).unwrap_err();
        assert_eq!(
            err,
            GenError::PipelineOrdering {
                signal: "a".into(),
                use_cycle: 1,
                decl_cycle: 2
            }
        );
    }

    #[test]
    fn feedback_one_cycle_back_is_undelayed() {
        let mut signals = Arena::new();
        let x = signals.alloc(Signal::new("X", 8, SignalKind::Input, 0));
        let acc = signals.alloc(Signal::new("acc", 8, SignalKind::Wire, 1));
        let mut ext = Signal::new("acc_ext", 8, SignalKind::Wire, 2);
        ext.feedback = true;
        let ext = signals.alloc(ext);
        let stmts = vec![
            assign(1, acc, use_at(ext, 1)),
            assign(2, ext, use_at(acc, 2).add(use_at(x, 2))),
        ];
        let out = resolve(&mut signals, &stmts).unwrap();
        let mut taps = Vec::new();
        out[0].stmt.for_each_leaf(&mut |t| taps.push(*t));
        assert_eq!(taps, vec![Tap::direct(ext)]);
        assert_eq!(signals[acc].lifespan, 1);
        assert_eq!(signals[ext].lifespan, 0);
    }

    #[test]
    fn feedback_two_cycles_back_is_rejected() {
        let mut signals = Arena::new();
        let acc = signals.alloc(Signal::new("acc", 8, SignalKind::Wire, 0));
        let mut ext = Signal::new("acc_ext", 8, SignalKind::Wire, 2);
        ext.feedback = true;
        let ext = signals.alloc(ext);
        let stmts = vec![
            assign(0, acc, use_at(ext, 0)),
            assign(2, ext, use_at(acc, 2)),
        ];
        assert!(matches!(
            resolve(&mut signals, &stmts),
            Err(GenError::FeedbackDistance { .. })
        ));
    }

    #[test]
    fn undefined_forward_declaration() {
        let mut signals = Arena::new();
        let mut pending = Signal::new("later", 2, SignalKind::Wire, 0);
        pending.cycle = None;
        pending.feedback = true;
        let pending = signals.alloc(pending);
        let a = signals.alloc(Signal::new("a", 2, SignalKind::Wire, 0));
        let stmts = vec![assign(0, a, use_at(pending, 0))];
        assert_eq!(
            resolve(&mut signals, &stmts).unwrap_err(),
            GenError::UnresolvedSignal("later".into())
        );
    }

    #[test]
    fn undriven_wire_is_rejected() {
        let mut signals = Arena::new();
        let a = signals.alloc(Signal::new("a", 2, SignalKind::Wire, 0));
        let b = signals.alloc(Signal::new("b", 2, SignalKind::Wire, 0));
        let stmts = vec![assign(0, b, use_at(a, 0))];
        assert_eq!(
            resolve(&mut signals, &stmts).unwrap_err(),
            GenError::UnresolvedSignal("a".into())
        );
    }

    #[test]
    fn combinational_loop_is_rejected() {
        let mut signals = Arena::new();
        let a = signals.alloc(Signal::new("a", 2, SignalKind::Wire, 0));
        let b = signals.alloc(Signal::new("b", 2, SignalKind::Wire, 0));
        let stmts = vec![assign(0, a, use_at(b, 0)), assign(0, b, use_at(a, 0).not())];
        assert!(matches!(
            resolve(&mut signals, &stmts),
            Err(GenError::AssignmentCycle(_))
        ));
    }

    #[test]
    fn registered_loop_is_fine() {
        let mut signals = Arena::new();
        let a = signals.alloc(Signal::new("a", 2, SignalKind::Wire, 0));
        let b = signals.alloc(Signal::new("b", 2, SignalKind::Wire, 1));
        let mut ext = Signal::new("c", 2, SignalKind::Wire, 1);
        ext.feedback = true;
        let c = signals.alloc(ext);
        let stmts = vec![
            assign(0, a, use_at(c, 0)),
            assign(1, b, use_at(a, 1)),
            assign(1, c, use_at(b, 1)),
        ];
        assert!(resolve(&mut signals, &stmts).is_ok());
    }
}
