//! The architecture body: declarations, register processes, statements.

use crate::entity::{component, vhdl_type, TAB};
use crate::expr::ExprPrinter;
use pipegen_ir::{Instance, Operator, ResetStyle, SelectArm, Signal, SignalKind, Statement, Tap};
use std::fmt::{self, Write};

/// Writes one component declaration per distinct child.
pub fn component_declarations(out: &mut impl Write, op: &Operator) -> fmt::Result {
    for child in op.children() {
        component(out, child)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the signal declarations, register copies included.
///
/// Ports are declared by the entity; only their delayed copies appear here.
pub fn signal_declarations(out: &mut impl Write, op: &Operator) -> fmt::Result {
    let internal = op.signals.values().filter(|s| !s.kind.is_port());
    let ports = op.signals.values().filter(|s| s.kind.is_port() && s.lifespan > 0);
    for signal in internal.chain(ports) {
        let first = if signal.kind.is_port() { 1 } else { 0 };
        let names: Vec<String> = (first..=signal.lifespan)
            .map(|d| signal.delayed_name(d))
            .collect();
        let init = if signal.kind == SignalKind::RegisteredWithZeroInit {
            if signal.is_std_logic() {
                " := '0'"
            } else {
                " := (others => '0')"
            }
        } else {
            ""
        };
        writeln!(
            out,
            "signal {} :  {}{init};",
            names.join(", "),
            vhdl_type(signal)
        )?;
    }
    Ok(())
}

/// Writes attribute declarations, then their values.
pub fn attributes(out: &mut impl Write, op: &Operator) -> fmt::Result {
    let mut declared: Vec<&str> = Vec::new();
    for attr in &op.attributes {
        if !declared.contains(&attr.name.as_str()) {
            declared.push(&attr.name);
            writeln!(out, "attribute {}: {};", attr.name, attr.type_name)?;
        }
    }
    for attr in &op.attributes {
        let value = if attr.type_name == "string" {
            format!("\"{}\"", attr.value)
        } else {
            attr.value.clone()
        };
        writeln!(out, "attribute {} of {} is {value};", attr.name, attr.object)?;
    }
    Ok(())
}

fn chains(op: &Operator, style: ResetStyle) -> Vec<&Signal> {
    op.signals
        .values()
        .filter(|s| s.lifespan > 0 && s.kind.reset_style() == style)
        .collect()
}

fn shift_lines(out: &mut impl Write, signals: &[&Signal], indent: &str) -> fmt::Result {
    for s in signals {
        for d in 1..=s.lifespan {
            writeln!(out, "{indent}{} <=  {};", s.delayed_name(d), s.delayed_name(d - 1))?;
        }
    }
    Ok(())
}

fn clear_lines(out: &mut impl Write, signals: &[&Signal], indent: &str) -> fmt::Result {
    for s in signals {
        let zero = if s.is_std_logic() {
            "'0'"
        } else {
            "(others => '0')"
        };
        for d in 1..=s.lifespan {
            writeln!(out, "{indent}{} <=  {zero};", s.delayed_name(d))?;
        }
    }
    Ok(())
}

fn guard(op: &Operator) -> Option<&'static str> {
    if op.clocking.recirculation {
        Some("if stall_s = '0' then")
    } else if op.clocking.clock_enable {
        Some("if ce = '1' then")
    } else {
        None
    }
}

/// Writes the guarded shift of `signals` at `indent`.
fn guarded_shift(
    out: &mut impl Write,
    op: &Operator,
    signals: &[&Signal],
    indent: &str,
) -> fmt::Result {
    match guard(op) {
        Some(test) => {
            writeln!(out, "{indent}{test}")?;
            shift_lines(out, signals, &format!("{indent}{TAB}"))?;
            writeln!(out, "{indent}end if;")
        }
        None => shift_lines(out, signals, indent),
    }
}

/// Writes the register processes: one without reset, one with asynchronous
/// reset and one with synchronous reset, each only if it has registers.
pub fn registers(out: &mut impl Write, op: &Operator) -> fmt::Result {
    if !op.is_sequential() {
        return Ok(());
    }
    let t2 = TAB.repeat(2);
    let t3 = TAB.repeat(3);
    let t4 = TAB.repeat(4);
    let t5 = TAB.repeat(5);

    let plain = chains(op, ResetStyle::None);
    writeln!(out, "{TAB}process(clk)")?;
    writeln!(out, "{t2}begin")?;
    writeln!(out, "{t3}if clk'event and clk = '1' then")?;
    guarded_shift(out, op, &plain, &t4)?;
    writeln!(out, "{t3}end if;")?;
    writeln!(out, "{t2}end process;")?;

    let async_regs = chains(op, ResetStyle::Async);
    if !async_regs.is_empty() {
        writeln!(out, "{TAB}process(clk, rst)")?;
        writeln!(out, "{t2}begin")?;
        writeln!(out, "{t3}if rst = '1' then")?;
        clear_lines(out, &async_regs, &t4)?;
        writeln!(out, "{t3}elsif clk'event and clk = '1' then")?;
        guarded_shift(out, op, &async_regs, &t4)?;
        writeln!(out, "{t3}end if;")?;
        writeln!(out, "{t2}end process;")?;
    }

    let sync_regs = chains(op, ResetStyle::Sync);
    if !sync_regs.is_empty() {
        writeln!(out, "{TAB}process(clk, rst)")?;
        writeln!(out, "{t2}begin")?;
        writeln!(out, "{t3}if clk'event and clk = '1' then")?;
        writeln!(out, "{t4}if rst = '1' then")?;
        clear_lines(out, &sync_regs, &t5)?;
        writeln!(out, "{t4}else")?;
        guarded_shift(out, op, &sync_regs, &t5)?;
        writeln!(out, "{t4}end if;")?;
        writeln!(out, "{t3}end if;")?;
        writeln!(out, "{t2}end process;")?;
    }
    Ok(())
}

fn select_arm(p: &ExprPrinter<'_>, arm: &SelectArm<Tap>, sel_scalar: bool, scalar: bool) -> String {
    let choices: Vec<String> = arm
        .choices
        .iter()
        .map(|c| ExprPrinter::literal(c, sel_scalar))
        .collect();
    format!("{} when {}", p.expr(&arm.value, scalar), choices.join(" | "))
}

fn instance(out: &mut impl Write, p: &ExprPrinter<'_>, op: &Operator, inst: &Instance<Tap>) -> fmt::Result {
    let child = &inst.child;
    write!(out, "{TAB}{}: {}", inst.name, child.name)?;
    if child.is_sequential() {
        write!(
            out,
            "  -- pipelineDepth={} maxInDelay={}",
            child.pipeline_depth,
            child.max_input_delay()
        )?;
    }
    writeln!(out)?;
    let mut maps: Vec<String> = Vec::new();
    if child.is_sequential() {
        maps.push("clk  => clk".into());
        maps.push("rst  => rst".into());
        if child.clocking.recirculation {
            maps.push("stall_s => stall_s".into());
        }
        if child.clocking.clock_enable {
            maps.push("ce => ce".into());
        }
    }
    for (port, actual) in &inst.inputs {
        let scalar = child.input(port).is_some_and(Signal::is_std_logic);
        maps.push(format!("{port} => {}", p.expr(actual, scalar)));
    }
    for (port, id) in &inst.outputs {
        maps.push(format!("{port} => {}", op.signal(*id).name));
    }
    let sep = format!(",\n{TAB}{TAB}           ");
    writeln!(out, "{TAB}{TAB}port map ( {});", maps.join(&sep))
}

/// Writes the concurrent statements of the body in program order.
pub fn body(out: &mut impl Write, op: &Operator) -> fmt::Result {
    let p = ExprPrinter::new(op);
    for tagged in &op.statements {
        match &tagged.stmt {
            Statement::Assign { target, value } => {
                let t = op.signal(*target);
                writeln!(out, "{TAB}{} <= {};", t.name, p.expr(value, t.is_std_logic()))?;
            }
            Statement::Conditional {
                target,
                arms,
                otherwise,
            } => {
                let t = op.signal(*target);
                let scalar = t.is_std_logic();
                write!(out, "{TAB}{} <= ", t.name)?;
                for (cond, value) in arms {
                    write!(out, "{} when {} else\n{TAB}{TAB}", p.expr(value, scalar), p.cond(cond))?;
                }
                writeln!(out, "{};", p.expr(otherwise, scalar))?;
            }
            Statement::Select {
                target,
                selector,
                arms,
                otherwise,
            } => {
                let t = op.signal(*target);
                let scalar = t.is_std_logic();
                let sel_scalar = op.signal(selector.signal).is_std_logic();
                writeln!(out, "{TAB}with {} select {} <= ", p.tap(selector), t.name)?;
                for arm in arms {
                    writeln!(out, "{TAB}{TAB}{},", select_arm(&p, arm, sel_scalar, scalar))?;
                }
                writeln!(out, "{TAB}{TAB}{} when others;", p.expr(otherwise, scalar))?;
            }
            Statement::Instance(inst) => instance(out, &p, op, inst)?,
            Statement::Comment(text) => writeln!(out, "{TAB}-- {text}")?,
            Statement::Barrier(cycle) => writeln!(
                out,
                "{TAB}----------------Synchro barrier, entering cycle {cycle}----------------"
            )?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_ir::{Arena, Attribute, Clocking, Expr, SignalId, Tagged};
    use std::collections::BTreeMap;

    fn op(clocking: Clocking) -> Operator {
        let mut signals = Arena::new();
        let x = signals.alloc(Signal::new("X", 4, SignalKind::Input, 0));
        let r = signals.alloc(Signal::new("R", 4, SignalKind::Output, 2));
        let mut a = Signal::new("a", 4, SignalKind::RegisteredWithAsyncReset, 0);
        a.lifespan = 2;
        let a = signals.alloc(a);
        let mut z = Signal::new("z", 1, SignalKind::RegisteredWithZeroInit, 0);
        z.lifespan = 1;
        signals.alloc(z);
        signals[x].lifespan = 1;
        Operator {
            name: "Regs".into(),
            copyright: String::new(),
            description: String::new(),
            signals,
            inputs: vec![x],
            outputs: vec![r],
            statements: vec![
                Tagged {
                    cycle: 0,
                    stmt: Statement::Assign {
                        target: a,
                        value: Expr::Signal(Tap::direct(x)).not(),
                    },
                },
                Tagged {
                    cycle: 1,
                    stmt: Statement::Barrier(1),
                },
                Tagged {
                    cycle: 2,
                    stmt: Statement::Assign {
                        target: r,
                        value: Expr::Signal(Tap { signal: a, delay: 2 }),
                    },
                },
            ],
            attributes: Vec::new(),
            pipeline_depth: 2,
            input_delays: BTreeMap::new(),
            output_delays: BTreeMap::new(),
            clocking,
        }
    }

    fn seq() -> Clocking {
        Clocking {
            sequential: true,
            ..Clocking::default()
        }
    }

    #[test]
    fn declarations_include_register_copies() {
        let mut text = String::new();
        signal_declarations(&mut text, &op(seq())).unwrap();
        assert_eq!(
            text,
            "signal a, a_d1, a_d2 :  std_logic_vector(3 downto 0);\n\
             signal z, z_d1 :  std_logic := '0';\n\
             signal X_d1 :  std_logic_vector(3 downto 0);\n"
        );
    }

    #[test]
    fn register_processes_by_reset_style() {
        let mut text = String::new();
        registers(&mut text, &op(seq())).unwrap();
        assert!(text.contains("   process(clk)\n"));
        assert!(text.contains("            X_d1 <=  X;\n"));
        assert!(text.contains("            z_d1 <=  z;\n"));
        assert!(text.contains("   process(clk, rst)\n"));
        assert!(text.contains("            a_d2 <=  (others => '0');\n"));
        assert!(text.contains("         elsif clk'event and clk = '1' then\n"));
        assert!(text.contains("            a_d2 <=  a_d1;\n"));
        assert!(!text.contains("if rst = '1' then\n               "));
    }

    #[test]
    fn clock_enable_guards_registers() {
        let clocking = Clocking {
            sequential: true,
            clock_enable: true,
            recirculation: false,
        };
        let mut text = String::new();
        registers(&mut text, &op(clocking)).unwrap();
        assert!(text.contains("            if ce = '1' then\n               X_d1 <=  X;\n"));
    }

    #[test]
    fn combinatorial_has_no_process() {
        let mut text = String::new();
        registers(&mut text, &op(Clocking::default())).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn body_in_program_order() {
        let mut text = String::new();
        body(&mut text, &op(seq())).unwrap();
        assert_eq!(
            text,
            "   a <= (not X);\n   \
             ----------------Synchro barrier, entering cycle 1----------------\n   \
             R <= a_d2;\n"
        );
    }

    #[test]
    fn attribute_text() {
        let mut o = op(seq());
        for (name, value) in [("rom_extract", "yes"), ("rom_style", "block")] {
            o.attributes.push(Attribute {
                name: name.into(),
                type_name: "string".into(),
                object: "T_uid3: component".into(),
                value: value.into(),
            });
        }
        let mut text = String::new();
        attributes(&mut text, &o).unwrap();
        assert!(text.starts_with("attribute rom_extract: string;\nattribute rom_style: string;\n"));
        assert!(text.contains("attribute rom_style of T_uid3: component is \"block\";\n"));
    }

    #[test]
    fn select_statement() {
        let mut o = op(seq());
        let sel = SignalId::from_raw(0);
        let r = SignalId::from_raw(1);
        o.statements = vec![Tagged {
            cycle: 0,
            stmt: Statement::Select {
                target: r,
                selector: Tap::direct(sel),
                arms: vec![SelectArm {
                    choices: vec![
                        pipegen_common::Bits::from_u64(0, 4),
                        pipegen_common::Bits::from_u64(1, 4),
                    ],
                    value: Expr::constant(9, 4),
                }],
                otherwise: Expr::zeros(4),
            },
        }];
        let mut text = String::new();
        body(&mut text, &o).unwrap();
        assert_eq!(
            text,
            "   with X select R <= \n      \"1001\" when \"0000\" | \"0001\",\n      \"0000\" when others;\n"
        );
    }
}
