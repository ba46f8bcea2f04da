//! The append-only statement log of an operator under construction.

use pipegen_ir::{SignalUse, Statement, Tagged};

/// Append-only log of cycle-tagged statements.
///
/// Program order is preserved: back ends emit statements in exactly the
/// order they were pushed. Only the cycle tag of a statement may change
/// after the fact, when outputs are aligned to the final pipeline depth.
#[derive(Debug, Default)]
pub struct IrBuilder {
    statements: Vec<Tagged<SignalUse>>,
}

impl IrBuilder {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement executing at `cycle` and returns its index.
    pub fn push(&mut self, cycle: u32, stmt: Statement<SignalUse>) -> usize {
        self.statements.push(Tagged { cycle, stmt });
        self.statements.len() - 1
    }

    /// Appends a comment.
    pub fn comment(&mut self, cycle: u32, text: impl Into<String>) {
        self.push(cycle, Statement::Comment(text.into()));
    }

    /// Appends a synchronization barrier for entering `cycle`.
    pub fn barrier(&mut self, cycle: u32) {
        self.push(cycle, Statement::Barrier(cycle));
    }

    /// Moves the statement at `index` from its cycle to `cycle`, shifting
    /// every read it performs by the same amount.
    pub fn retag(&mut self, index: usize, cycle: u32) {
        if let Some(tagged) = self.statements.get_mut(index) {
            let shift = cycle.saturating_sub(tagged.cycle);
            tagged.cycle = cycle;
            tagged.stmt.for_each_leaf_mut(&mut |u| u.cycle += shift);
        }
    }

    /// Returns the statements.
    pub fn statements(&self) -> &[Tagged<SignalUse>] {
        &self.statements
    }

    /// Returns the number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns `true` if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Consumes the log.
    pub fn into_statements(self) -> Vec<Tagged<SignalUse>> {
        self.statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_ir::{Expr, SignalId};

    fn read(n: u32, cycle: u32) -> Expr<SignalUse> {
        Expr::Signal(SignalUse {
            signal: SignalId::from_raw(n),
            cycle,
        })
    }

    #[test]
    fn program_order_is_kept() {
        let mut ir = IrBuilder::new();
        ir.comment(0, "first");
        ir.barrier(1);
        let idx = ir.push(
            1,
            Statement::Assign {
                target: SignalId::from_raw(2),
                value: read(0, 1),
            },
        );
        assert_eq!(idx, 2);
        assert_eq!(ir.len(), 3);
        assert!(matches!(ir.statements()[1].stmt, Statement::Barrier(1)));
    }

    #[test]
    fn retag_shifts_reads() {
        let mut ir = IrBuilder::new();
        let idx = ir.push(
            1,
            Statement::Assign {
                target: SignalId::from_raw(2),
                value: read(0, 1).add(read(1, 2)),
            },
        );
        ir.retag(idx, 4);
        let stmt = &ir.statements()[idx];
        assert_eq!(stmt.cycle, 4);
        let mut cycles = Vec::new();
        stmt.stmt.for_each_leaf(&mut |u| cycles.push(u.cycle));
        assert_eq!(cycles, vec![4, 5]);
    }
}
