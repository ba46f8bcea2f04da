//! VHDL back end for resolved operators.
//!
//! Every read of a resolved [`Operator`] is already a register tap, so the
//! emitter is a straight walk over the IR: banner, latency line, library
//! clauses, entity, and an architecture holding component declarations,
//! signal declarations (one name per register of each chain), attributes,
//! the register processes, and the concurrent statements in program order.
//!
//! [`emit_design`] writes a whole design, children before their parents, as
//! a single compilable file.

#![warn(missing_docs)]

pub mod architecture;
pub mod entity;
pub mod expr;

pub use entity::vhdl_type;
pub use expr::ExprPrinter;

use pipegen_ir::Operator;
use std::fmt;
use std::sync::Arc;

/// [`Display`](fmt::Display) adapter writing one operator as VHDL.
#[derive(Debug, Clone, Copy)]
pub struct OperatorVhdl<'a>(pub &'a Operator);

impl fmt::Display for OperatorVhdl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.0;
        entity::licence(f, op)?;
        entity::pipeline_info(f, op)?;
        entity::std_libs(f)?;
        entity::entity(f, op)?;
        writeln!(f, "architecture arch of {} is", op.name)?;
        architecture::component_declarations(f, op)?;
        architecture::signal_declarations(f, op)?;
        architecture::attributes(f, op)?;
        writeln!(f, "begin")?;
        architecture::registers(f, op)?;
        architecture::body(f, op)?;
        writeln!(f, "end architecture;")?;
        writeln!(f)
    }
}

/// Returns the VHDL text of one operator.
pub fn emit_operator(op: &Operator) -> String {
    OperatorVhdl(op).to_string()
}

/// Returns the VHDL text of a design given in emission order (children
/// first, as returned by `GenerationContext::design_order`).
pub fn emit_design(operators: &[Arc<Operator>]) -> String {
    operators
        .iter()
        .map(|op| emit_operator(op))
        .collect::<Vec<_>>()
        .concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_core::{GenerationContext, OperatorBuilder, PortMap};
    use pipegen_target::{load_target, Target, TargetOptions};

    fn target() -> Box<dyn Target> {
        load_target("xilinx", Some("virtex5"), 400.0, TargetOptions::default()).unwrap()
    }

    fn delay_line(ctx: &mut GenerationContext, t: &dyn Target) -> Arc<Operator> {
        let name = ctx.unique_name("DelayLine");
        let mut b = OperatorBuilder::new(name, t);
        let x = b.add_input("X", 4).unwrap();
        let r = b.add_output("R", 4).unwrap();
        b.next_cycle();
        b.next_cycle();
        b.assign(r, b.s(x)).unwrap();
        b.finish(ctx).unwrap()
    }

    #[test]
    fn operator_sections_in_order() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let op = delay_line(&mut ctx, t.as_ref());
        let text = emit_operator(&op);
        let order = [
            "-- Pipeline depth: 2 cycles",
            "library ieee;",
            "entity DelayLine_uid1 is",
            "architecture arch of DelayLine_uid1 is",
            "signal X_d1, X_d2 :  std_logic_vector(3 downto 0);",
            "begin",
            "process(clk)",
            "X_d2 <=  X_d1;",
            "R <= X_d2;",
            "end architecture;",
        ];
        let mut at = 0;
        for needle in order {
            let pos = text[at..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing or misplaced: {needle}\n{text}"));
            at += pos;
        }
    }

    #[test]
    fn design_lists_children_first() {
        let t = target();
        let mut ctx = GenerationContext::new();
        let child = delay_line(&mut ctx, t.as_ref());
        let name = ctx.unique_name("Top");
        let mut b = OperatorBuilder::new(name, t.as_ref());
        let a = b.add_input("A", 4).unwrap();
        let r = b.add_output("R", 4).unwrap();
        let outs = b
            .instantiate(
                &child,
                "line",
                PortMap::new().input("X", b.s(a)).output("R", "lined"),
            )
            .unwrap();
        b.sync_with(&outs).unwrap();
        b.assign(r, b.s(outs[0])).unwrap();
        let top = b.finish(&mut ctx).unwrap();

        let text = emit_design(&ctx.design_order(&top));
        let child_at = text.find("entity DelayLine_uid1 is").unwrap();
        let top_at = text.find("entity Top_uid2 is").unwrap();
        assert!(child_at < top_at);
        assert!(text.contains("   component DelayLine_uid1 is\n"));
        assert!(text.contains(
            "   line: DelayLine_uid1  -- pipelineDepth=2 maxInDelay=0\n      port map ( clk  => clk,\n                 rst  => rst,\n                 X => A,\n                 R => lined);\n"
        ));
        assert!(text.contains("entering cycle 2"));
    }
}
