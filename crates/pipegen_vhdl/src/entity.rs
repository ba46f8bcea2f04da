//! File header, library clauses, entity and component declarations.

use pipegen_ir::{Operator, Signal, SignalKind};
use std::fmt::{self, Write};

pub(crate) const TAB: &str = "   ";
const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Returns the VHDL type of a signal.
pub fn vhdl_type(signal: &Signal) -> String {
    if signal.is_std_logic() {
        "std_logic".to_string()
    } else {
        format!("std_logic_vector({} downto 0)", signal.width - 1)
    }
}

fn port_declaration(signal: &Signal) -> String {
    let dir = if signal.kind == SignalKind::Input {
        "in "
    } else {
        "out"
    };
    format!("{} : {dir} {}", signal.name, vhdl_type(signal))
}

fn clock_ports(op: &Operator) -> String {
    let mut names = vec!["clk", "rst"];
    if op.clocking.clock_enable {
        names.push("ce");
    }
    if op.clocking.recirculation {
        names.push("stall_s");
    }
    format!("{} : in std_logic;", names.join(", "))
}

/// Writes a `port ( ... );` clause at the given indentation.
fn port_clause(out: &mut impl Write, op: &Operator, indent: &str) -> fmt::Result {
    let ports: Vec<&Signal> = op.input_signals().chain(op.output_signals()).collect();
    if ports.is_empty() && !op.is_sequential() {
        return Ok(());
    }
    write!(out, "{indent}{TAB}port ( ")?;
    let mut first = true;
    if op.is_sequential() {
        write!(out, "{}", clock_ports(op))?;
        first = false;
    }
    for (i, port) in ports.iter().enumerate() {
        if !first {
            write!(out, "\n{indent}          ")?;
        }
        first = false;
        write!(out, "{}", port_declaration(port))?;
        if i + 1 < ports.len() {
            out.write_char(';')?;
        }
    }
    writeln!(out)?;
    writeln!(out, "{indent}{TAB});")
}

/// Writes the boxed banner with the entity name and authors.
pub fn licence(out: &mut impl Write, op: &Operator) -> fmt::Result {
    writeln!(out, "{RULE}")?;
    let pad = 76usize.saturating_sub(op.name.len()) / 2;
    writeln!(out, "--{}{}", " ".repeat(pad), op.name)?;
    if !op.description.is_empty() {
        writeln!(out, "-- {}", op.description)?;
    }
    writeln!(out, "-- This operator is part of the pipegen arithmetic operator library")?;
    if !op.copyright.is_empty() {
        writeln!(out, "-- Authors: {}", op.copyright)?;
    }
    writeln!(out, "{RULE}")
}

/// Writes the latency line.
pub fn pipeline_info(out: &mut impl Write, op: &Operator) -> fmt::Result {
    if op.is_sequential() {
        writeln!(out, "-- Pipeline depth: {} cycles", op.pipeline_depth)?;
    } else {
        writeln!(out, "-- combinatorial")?;
    }
    writeln!(out)
}

/// Writes the library and use clauses.
pub fn std_libs(out: &mut impl Write) -> fmt::Result {
    writeln!(out, "library ieee;")?;
    writeln!(out, "use ieee.std_logic_1164.all;")?;
    writeln!(out, "use ieee.std_logic_arith.all;")?;
    writeln!(out, "use ieee.std_logic_unsigned.all;")?;
    writeln!(out, "library std;")?;
    writeln!(out, "use std.textio.all;")?;
    writeln!(out, "library work;")?;
    writeln!(out)
}

/// Writes the entity declaration.
pub fn entity(out: &mut impl Write, op: &Operator) -> fmt::Result {
    writeln!(out, "entity {} is", op.name)?;
    port_clause(out, op, "")?;
    writeln!(out, "end entity;")?;
    writeln!(out)
}

/// Writes the component declaration of `op`, for use in a parent.
pub fn component(out: &mut impl Write, op: &Operator) -> fmt::Result {
    writeln!(out, "{TAB}component {} is", op.name)?;
    port_clause(out, op, TAB)?;
    writeln!(out, "{TAB}end component;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_ir::{Arena, Clocking};
    use std::collections::BTreeMap;

    fn op(sequential: bool) -> Operator {
        let mut signals = Arena::new();
        let x = signals.alloc(Signal::new("X", 8, SignalKind::Input, 0));
        let c = signals.alloc(Signal::new("Cin", 1, SignalKind::Input, 0));
        let r = signals.alloc(Signal::new("R", 8, SignalKind::Output, 1));
        Operator {
            name: "IntAdder_8_uid2".into(),
            copyright: "the pipegen authors".into(),
            description: String::new(),
            signals,
            inputs: vec![x, c],
            outputs: vec![r],
            statements: Vec::new(),
            attributes: Vec::new(),
            pipeline_depth: u32::from(sequential),
            input_delays: BTreeMap::new(),
            output_delays: BTreeMap::new(),
            clocking: Clocking {
                sequential,
                clock_enable: sequential,
                recirculation: false,
            },
        }
    }

    #[test]
    fn sequential_entity_has_clock_ports() {
        let mut text = String::new();
        entity(&mut text, &op(true)).unwrap();
        assert_eq!(
            text,
            "entity IntAdder_8_uid2 is\n   port ( clk, rst, ce : in std_logic;\n          X : in  std_logic_vector(7 downto 0);\n          Cin : in  std_logic;\n          R : out std_logic_vector(7 downto 0)\n   );\nend entity;\n\n"
        );
    }

    #[test]
    fn combinatorial_entity() {
        let mut text = String::new();
        entity(&mut text, &op(false)).unwrap();
        assert!(text.starts_with("entity IntAdder_8_uid2 is\n   port ( X : in "));
        pipeline_info(&mut text, &op(false)).unwrap();
        assert!(text.contains("-- combinatorial\n"));
    }

    #[test]
    fn component_is_indented() {
        let mut text = String::new();
        component(&mut text, &op(true)).unwrap();
        assert!(text.starts_with("   component IntAdder_8_uid2 is\n      port ( clk"));
        assert!(text.ends_with("   end component;\n"));
    }

    #[test]
    fn banner_centers_name() {
        let mut text = String::new();
        licence(&mut text, &op(true)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0].len(), 80);
        assert_eq!(lines[1], format!("--{}IntAdder_8_uid2", " ".repeat(30)));
        assert!(lines.iter().any(|l| *l == "-- Authors: the pipegen authors"));
    }
}
