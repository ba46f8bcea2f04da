//! The self-checking VHDL testbench.
//!
//! The bench instantiates the operator under test, ticks a 10 ns clock,
//! applies one test case per cycle after a one-cycle reset, and checks the
//! outputs of case `i` in the middle of cycle `i + pipeline_depth`. A wrong
//! output increments an error counter and is reported with its test index;
//! the run ends with the counter and a failure-severity "End of simulation"
//! report that stops the simulator.

use pipegen_common::Bits;
use pipegen_config::BenchMode;
use pipegen_core::TestCaseList;
use pipegen_ir::{NumericFormat, Operator, Signal};
use pipegen_vhdl::{entity, vhdl_type};
use malachite::Natural;
use std::fmt::{self, Write};

const TAB: &str = "   ";
const PERIOD_NS: u32 = 10;
/// Outputs are sampled this long after time zero, plus one period per
/// pipeline stage: after the first rising edge at 5 ns, before the next.
const FIRST_CHECK_NS: u32 = 12;

const HELPERS: &str = r#"   -- FP compare function (found vs. expected)
   function fp_equal(a : std_logic_vector; b : std_logic_vector) return boolean is
      alias na : std_logic_vector(a'length-1 downto 0) is a;
      alias nb : std_logic_vector(b'length-1 downto 0) is b;
      constant t : integer := b'length-1;
   begin
      if nb(t downto t-1) = "11" then
         return na(t downto t-1) = "11";
      elsif nb(t downto t-1) = "01" then
         return na = nb;
      else
         return na(t downto t-2) = nb(t downto t-2);
      end if;
   end;

   function ieee_nan(v : std_logic_vector; we : integer; wf : integer) return boolean is
      alias nv : std_logic_vector(v'length-1 downto 0) is v;
      variable exp_ones : boolean := true;
      variable frac_zero : boolean := true;
   begin
      for i in wf to wf+we-1 loop
         if nv(i) /= '1' then
            exp_ones := false;
         end if;
      end loop;
      for i in 0 to wf-1 loop
         if nv(i) /= '0' then
            frac_zero := false;
         end if;
      end loop;
      return exp_ones and not frac_zero;
   end;

   -- IEEE compare function (found vs. expected), all NaNs are equal
   function fp_equal_ieee(a : std_logic_vector; b : std_logic_vector; we : integer; wf : integer) return boolean is
   begin
      if ieee_nan(b, we, wf) then
         return ieee_nan(a, we, wf);
      end if;
      return a = b;
   end;

   -- String conversion for reports
   function str(v : std_logic_vector) return string is
      alias nv : std_logic_vector(1 to v'length) is v;
      variable s : string(1 to v'length);
   begin
      for i in nv'range loop
         s(i) := std_logic'image(nv(i))(2);
      end loop;
      return s;
   end;

   function str(b : std_logic) return string is
   begin
      return std_logic'image(b)(2 to 2);
   end;
"#;

/// [`Display`](fmt::Display) adapter writing the testbench of an operator.
#[derive(Debug, Clone, Copy)]
pub struct TestBenchVhdl<'a> {
    op: &'a Operator,
    tests: &'a TestCaseList,
    mode: BenchMode,
    input_file: &'a str,
}

impl<'a> TestBenchVhdl<'a> {
    /// Creates the testbench of `op` running `tests`.
    ///
    /// File-based benches read `test.input` unless
    /// [`with_input_file`](Self::with_input_file) says otherwise.
    pub fn new(op: &'a Operator, tests: &'a TestCaseList, mode: BenchMode) -> Self {
        Self {
            op,
            tests,
            mode,
            input_file: "test.input",
        }
    }

    /// Sets the stimulus file path written into file-based benches.
    pub fn with_input_file(mut self, path: &'a str) -> Self {
        self.input_file = path;
        self
    }

    /// Returns the entity name of the testbench.
    pub fn entity_name(&self) -> String {
        format!("TestBench_{}", self.op.name)
    }

    fn clock_names(&self) -> Vec<&'static str> {
        if !self.op.is_sequential() {
            return Vec::new();
        }
        let mut names = vec!["clk", "rst"];
        if self.op.clocking.clock_enable {
            names.push("ce");
        }
        if self.op.clocking.recirculation {
            names.push("stall_s");
        }
        names
    }

    fn first_check_ns(&self) -> u32 {
        FIRST_CHECK_NS + PERIOD_NS * self.op.pipeline_depth
    }
}

fn literal(signal: &Signal, value: &Natural) -> String {
    let bits = Bits::new(value.clone(), signal.width);
    if signal.is_std_logic() {
        format!("'{bits}'")
    } else {
        format!("\"{bits}\"")
    }
}

/// The test that output `signal` equals `expected` (a literal or a variable).
fn matches(signal: &Signal, expected: &str) -> String {
    match signal.numeric {
        NumericFormat::TaggedFloat { .. } => format!("fp_equal({}, {expected})", signal.name),
        NumericFormat::IeeeFloat { we, wf } => {
            format!("fp_equal_ieee({}, {expected}, {we}, {wf})", signal.name)
        }
        NumericFormat::Bits => format!("{} = {expected}", signal.name),
    }
}

fn variable_decl(out: &mut impl Write, prefix: &str, signal: &Signal) -> fmt::Result {
    writeln!(
        out,
        "{TAB}{TAB}variable {prefix}_{} : {};",
        signal.name,
        vhdl_type(signal)
    )
}

impl TestBenchVhdl<'_> {
    fn header(&self, out: &mut impl Write) -> fmt::Result {
        entity::licence(out, self.op)?;
        writeln!(
            out,
            "-- Testbench for {}: {} test cases, {}",
            self.op.name,
            self.tests.len(),
            match self.mode {
                BenchMode::Inline => "inline stimuli".to_string(),
                BenchMode::File => format!("stimuli read from {}", self.input_file),
            }
        )?;
        writeln!(out)?;
        writeln!(out, "library ieee;")?;
        writeln!(out, "use ieee.std_logic_1164.all;")?;
        writeln!(out, "use ieee.std_logic_textio.all;")?;
        writeln!(out, "library std;")?;
        writeln!(out, "use std.textio.all;")?;
        writeln!(out, "library work;")?;
        writeln!(out)
    }

    fn signals(&self, out: &mut impl Write) -> fmt::Result {
        for signal in self.op.input_signals().chain(self.op.output_signals()) {
            writeln!(out, "{TAB}signal {} :  {};", signal.name, vhdl_type(signal))?;
        }
        for name in self.clock_names() {
            let init = if name == "ce" { '1' } else { '0' };
            writeln!(out, "{TAB}signal {name} : std_logic := '{init}';")?;
        }
        writeln!(out)
    }

    fn unit_under_test(&self, out: &mut impl Write) -> fmt::Result {
        let names: Vec<&str> = self
            .clock_names()
            .into_iter()
            .chain(self.op.input_signals().map(|s| s.name.as_str()))
            .chain(self.op.output_signals().map(|s| s.name.as_str()))
            .collect();
        writeln!(out, "{TAB}test: {}", self.op.name)?;
        let assoc: Vec<String> = names.iter().map(|n| format!("{n} => {n}")).collect();
        writeln!(
            out,
            "{TAB}{TAB}port map ( {});",
            assoc.join(&format!(",\n{TAB}{TAB}           "))
        )?;
        writeln!(out)?;
        if self.op.is_sequential() {
            writeln!(out, "{TAB}-- Ticking clock signal")?;
            writeln!(out, "{TAB}process")?;
            writeln!(out, "{TAB}begin")?;
            writeln!(out, "{TAB}{TAB}clk <= '0';")?;
            writeln!(out, "{TAB}{TAB}wait for {} ns;", PERIOD_NS / 2)?;
            writeln!(out, "{TAB}{TAB}clk <= '1';")?;
            writeln!(out, "{TAB}{TAB}wait for {} ns;", PERIOD_NS / 2)?;
            writeln!(out, "{TAB}end process;")?;
            writeln!(out)?;
        }
        Ok(())
    }

    fn reset(&self, out: &mut impl Write) -> fmt::Result {
        if self.op.is_sequential() {
            writeln!(out, "{TAB}{TAB}-- Send reset")?;
            writeln!(out, "{TAB}{TAB}rst <= '1';")?;
            writeln!(out, "{TAB}{TAB}wait for {PERIOD_NS} ns;")?;
            writeln!(out, "{TAB}{TAB}rst <= '0';")
        } else {
            writeln!(out, "{TAB}{TAB}wait for {PERIOD_NS} ns;")
        }
    }

    fn end_of_simulation(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(
            out,
            "{TAB}{TAB}report integer'image(errorCounter) & \" error(s) encountered.\" severity note;"
        )?;
        writeln!(out, "{TAB}{TAB}report \"End of simulation\" severity failure;")?;
        writeln!(out, "{TAB}end process;")
    }

    fn inline_stimuli(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{TAB}-- Setting the inputs")?;
        writeln!(out, "{TAB}process")?;
        writeln!(out, "{TAB}begin")?;
        self.reset(out)?;
        for (index, tc) in self.tests.iter().enumerate() {
            if tc.comment().is_empty() {
                writeln!(out, "{TAB}{TAB}-- Test case {index}")?;
            } else {
                writeln!(out, "{TAB}{TAB}-- Test case {index}: {}", tc.comment())?;
            }
            for (signal, (_, _, value)) in self.op.input_signals().zip(tc.inputs()) {
                let zero = Natural::from(0u32);
                let value = value.unwrap_or(&zero);
                writeln!(out, "{TAB}{TAB}{} <= {};", signal.name, literal(signal, value))?;
            }
            writeln!(out, "{TAB}{TAB}wait for {PERIOD_NS} ns;")?;
        }
        writeln!(out, "{TAB}{TAB}wait;")?;
        writeln!(out, "{TAB}end process;")?;
        writeln!(out)
    }

    fn inline_checks(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{TAB}-- Checking the outputs")?;
        writeln!(out, "{TAB}process")?;
        writeln!(out, "{TAB}{TAB}variable errorCounter : integer := 0;")?;
        writeln!(out, "{TAB}begin")?;
        writeln!(
            out,
            "{TAB}{TAB}wait for {} ns; -- reset, then {} pipeline cycles",
            self.first_check_ns(),
            self.op.pipeline_depth
        )?;
        for (index, tc) in self.tests.iter().enumerate() {
            writeln!(out, "{TAB}{TAB}-- Test case {index}")?;
            for (signal, (_, _, expected)) in self.op.output_signals().zip(tc.outputs()) {
                if expected.is_empty() {
                    continue;
                }
                let test = expected
                    .iter()
                    .map(|v| format!("({})", matches(signal, &literal(signal, v))))
                    .collect::<Vec<_>>()
                    .join(" or ");
                let shown = expected
                    .iter()
                    .map(|v| Bits::new(v.clone(), signal.width).to_string())
                    .collect::<Vec<_>>()
                    .join(" or ");
                writeln!(out, "{TAB}{TAB}if not ({test}) then")?;
                writeln!(out, "{TAB}{TAB}{TAB}errorCounter := errorCounter + 1;")?;
                writeln!(
                    out,
                    "{TAB}{TAB}{TAB}report \"Incorrect output value for {}, test case {index}: expected {shown}, got \" & str({}) severity error;",
                    signal.name, signal.name
                )?;
                writeln!(out, "{TAB}{TAB}end if;")?;
            }
            writeln!(out, "{TAB}{TAB}wait for {PERIOD_NS} ns;")?;
        }
        self.end_of_simulation(out)?;
        writeln!(out)
    }

    fn file_stimuli(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{TAB}-- Reading the inputs from {}", self.input_file)?;
        writeln!(out, "{TAB}process")?;
        writeln!(out, "{TAB}{TAB}variable inline : line;")?;
        for signal in self.op.input_signals() {
            variable_decl(out, "V", signal)?;
        }
        writeln!(
            out,
            "{TAB}{TAB}file inputsFile : text open read_mode is \"{}\";",
            self.input_file
        )?;
        writeln!(out, "{TAB}begin")?;
        self.reset(out)?;
        writeln!(out, "{TAB}{TAB}while not endfile(inputsFile) loop")?;
        writeln!(out, "{TAB}{TAB}{TAB}readline(inputsFile, inline);")?;
        for signal in self.op.input_signals() {
            writeln!(out, "{TAB}{TAB}{TAB}read(inline, V_{});", signal.name)?;
            writeln!(out, "{TAB}{TAB}{TAB}{} <= V_{};", signal.name, signal.name)?;
        }
        writeln!(out, "{TAB}{TAB}{TAB}wait for {PERIOD_NS} ns;")?;
        writeln!(out, "{TAB}{TAB}end loop;")?;
        writeln!(out, "{TAB}{TAB}wait;")?;
        writeln!(out, "{TAB}end process;")?;
        writeln!(out)
    }

    fn file_checks(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{TAB}-- Checking the outputs against {}", self.input_file)?;
        writeln!(out, "{TAB}process")?;
        writeln!(out, "{TAB}{TAB}variable inline : line;")?;
        writeln!(out, "{TAB}{TAB}variable errorCounter : integer := 0;")?;
        writeln!(out, "{TAB}{TAB}variable testCounter : integer := 0;")?;
        writeln!(out, "{TAB}{TAB}variable count : integer;")?;
        writeln!(out, "{TAB}{TAB}variable matched : boolean;")?;
        for signal in self.op.input_signals() {
            variable_decl(out, "V", signal)?;
        }
        for signal in self.op.output_signals() {
            variable_decl(out, "E", signal)?;
        }
        writeln!(
            out,
            "{TAB}{TAB}file inputsFile : text open read_mode is \"{}\";",
            self.input_file
        )?;
        writeln!(out, "{TAB}begin")?;
        writeln!(
            out,
            "{TAB}{TAB}wait for {} ns; -- reset, then {} pipeline cycles",
            self.first_check_ns(),
            self.op.pipeline_depth
        )?;
        writeln!(out, "{TAB}{TAB}while not endfile(inputsFile) loop")?;
        writeln!(out, "{TAB}{TAB}{TAB}readline(inputsFile, inline);")?;
        for signal in self.op.input_signals() {
            writeln!(out, "{TAB}{TAB}{TAB}read(inline, V_{});", signal.name)?;
        }
        for signal in self.op.output_signals() {
            let name = &signal.name;
            writeln!(out, "{TAB}{TAB}{TAB}read(inline, count);")?;
            writeln!(out, "{TAB}{TAB}{TAB}matched := false;")?;
            writeln!(out, "{TAB}{TAB}{TAB}for k in 1 to count loop")?;
            writeln!(out, "{TAB}{TAB}{TAB}{TAB}read(inline, E_{name});")?;
            writeln!(
                out,
                "{TAB}{TAB}{TAB}{TAB}if {} then",
                matches(signal, &format!("E_{name}"))
            )?;
            writeln!(out, "{TAB}{TAB}{TAB}{TAB}{TAB}matched := true;")?;
            writeln!(out, "{TAB}{TAB}{TAB}{TAB}end if;")?;
            writeln!(out, "{TAB}{TAB}{TAB}end loop;")?;
            writeln!(out, "{TAB}{TAB}{TAB}if not matched then")?;
            writeln!(out, "{TAB}{TAB}{TAB}{TAB}errorCounter := errorCounter + 1;")?;
            writeln!(
                out,
                "{TAB}{TAB}{TAB}{TAB}report \"Incorrect output value for {name}, test case \" & integer'image(testCounter) & \": got \" & str({name}) severity error;"
            )?;
            writeln!(out, "{TAB}{TAB}{TAB}end if;")?;
        }
        writeln!(out, "{TAB}{TAB}{TAB}testCounter := testCounter + 1;")?;
        writeln!(out, "{TAB}{TAB}{TAB}wait for {PERIOD_NS} ns;")?;
        writeln!(out, "{TAB}{TAB}end loop;")?;
        self.end_of_simulation(out)?;
        writeln!(out)
    }
}

impl fmt::Display for TestBenchVhdl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tb = self.entity_name();
        self.header(f)?;
        writeln!(f, "entity {tb} is")?;
        writeln!(f, "end entity;")?;
        writeln!(f)?;
        writeln!(f, "architecture behavorial of {tb} is")?;
        entity::component(f, self.op)?;
        writeln!(f)?;
        self.signals(f)?;
        f.write_str(HELPERS)?;
        writeln!(f, "begin")?;
        self.unit_under_test(f)?;
        match self.mode {
            BenchMode::Inline => {
                self.inline_stimuli(f)?;
                self.inline_checks(f)?;
            }
            BenchMode::File => {
                self.file_stimuli(f)?;
                self.file_checks(f)?;
            }
        }
        writeln!(f, "end architecture;")
    }
}
