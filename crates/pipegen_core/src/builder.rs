//! Construction of one operator: ports, signals, statements, schedule.
//!
//! [`OperatorBuilder`] composes the three collaborators of operator
//! construction: a [`SignalTable`] of declared signals, a
//! [`SchedulingContext`] holding the cycle/critical-path cursor, and an
//! [`IrBuilder`] statement log. Operator generators are plain functions that
//! drive a builder and call [`finish`](OperatorBuilder::finish), which runs
//! the resolution pass and registers the result in the
//! [`GenerationContext`].
//!
//! Every read goes through [`s`](OperatorBuilder::s) and friends, which stamp
//! the signal with the current cycle; statements are validated for widths
//! and timing as they are appended.

use crate::context::GenerationContext;
use crate::error::GenError;
use crate::ir_builder::IrBuilder;
use crate::resolve::resolve;
use crate::schedule::SchedulingContext;
use crate::table::SignalTable;
use pipegen_common::Bits;
use pipegen_diagnostics::{Diagnostic, DiagnosticCode};
use pipegen_ir::{
    Attribute, BinaryOp, Clocking, Cond, Expr, Instance, NumericFormat, Operator, SelectArm,
    Signal, SignalId, SignalKind, SignalUse, Statement,
};
use pipegen_target::{Target, Vendor};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// An expression over cycle-stamped reads.
pub type UseExpr = Expr<SignalUse>;

/// A condition over cycle-stamped reads.
pub type UseCond = Cond<SignalUse>;

/// Port connections of a child instance.
#[derive(Debug, Clone, Default)]
pub struct PortMap {
    inputs: Vec<(String, UseExpr)>,
    outputs: Vec<(String, String)>,
}

impl PortMap {
    /// Creates an empty port map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a child input port to an expression of the parent.
    pub fn input(mut self, port: impl Into<String>, actual: UseExpr) -> Self {
        self.inputs.push((port.into(), actual));
        self
    }

    /// Connects a child output port to a new parent signal named `actual`.
    pub fn output(mut self, port: impl Into<String>, actual: impl Into<String>) -> Self {
        self.outputs.push((port.into(), actual.into()));
        self
    }
}

#[derive(Debug)]
struct DeferredOutput {
    signal: SignalId,
    index: usize,
    cycle: u32,
    delay: f64,
}

/// Builder of one operator.
#[derive(Debug)]
pub struct OperatorBuilder<'t> {
    name: String,
    target: &'t dyn Target,
    table: SignalTable,
    sched: SchedulingContext,
    ir: IrBuilder,
    attributes: Vec<Attribute>,
    input_delays: BTreeMap<String, f64>,
    copyright: String,
    description: String,
    deferred: Vec<DeferredOutput>,
    drivers: HashSet<SignalId>,
    instance_names: HashSet<String>,
}

impl<'t> OperatorBuilder<'t> {
    /// Starts an operator named `name` (already made unique) for `target`.
    pub fn new(name: impl Into<String>, target: &'t dyn Target) -> Self {
        Self {
            name: name.into(),
            target,
            table: SignalTable::new(),
            sched: SchedulingContext::for_target(target),
            ir: IrBuilder::new(),
            attributes: Vec::new(),
            input_delays: BTreeMap::new(),
            copyright: String::new(),
            description: String::new(),
            deferred: Vec::new(),
            drivers: HashSet::new(),
            instance_names: HashSet::new(),
        }
    }

    /// Sets the arrival delay of input ports; the schedule starts from the
    /// largest of them.
    pub fn with_input_delays(mut self, delays: &BTreeMap<String, f64>) -> Self {
        self.input_delays = delays.clone();
        let max = delays.values().copied().fold(0.0, f64::max);
        self.sched.set_critical_path(max);
        self
    }

    /// Sets the copyright line of the generated header.
    pub fn set_copyright(&mut self, text: impl Into<String>) {
        self.copyright = text.into();
    }

    /// Sets the one-line description of the operator.
    pub fn set_description(&mut self, text: impl Into<String>) {
        self.description = text.into();
    }

    /// Returns the operator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target.
    pub fn target(&self) -> &'t dyn Target {
        self.target
    }

    /// Returns a declared signal.
    pub fn signal(&self, id: SignalId) -> &Signal {
        self.table.get(id)
    }

    /// Returns the width of a declared signal.
    pub fn width(&self, id: SignalId) -> u32 {
        self.table.get(id).width
    }

    /// Looks a signal up by name.
    pub fn signal_id(&self, name: &str) -> Result<SignalId, GenError> {
        self.table.lookup(name)
    }

    // ----- ports -----

    fn add_port(&mut self, mut signal: Signal) -> Result<SignalId, GenError> {
        if signal.kind == SignalKind::Input {
            signal.delay = self.input_delays.get(&signal.name).copied().unwrap_or(0.0);
        }
        self.table.declare(signal)
    }

    /// Declares an input port of `width` bits.
    pub fn add_input(&mut self, name: &str, width: u32) -> Result<SignalId, GenError> {
        self.add_port(Signal::new(name, width, SignalKind::Input, 0))
    }

    /// Declares a one-bit input that is a one-element vector.
    pub fn add_input_bus(&mut self, name: &str, width: u32) -> Result<SignalId, GenError> {
        self.add_port(Signal::new(name, width, SignalKind::Input, 0).with_bus(true))
    }

    /// Declares an exception-tagged floating-point input.
    pub fn add_fp_input(&mut self, name: &str, we: u32, wf: u32) -> Result<SignalId, GenError> {
        let format = NumericFormat::TaggedFloat { we, wf };
        self.add_port(Signal::new(name, we + wf + 3, SignalKind::Input, 0).with_numeric(format))
    }

    /// Declares an IEEE-754 floating-point input.
    pub fn add_ieee_input(&mut self, name: &str, we: u32, wf: u32) -> Result<SignalId, GenError> {
        let format = NumericFormat::IeeeFloat { we, wf };
        self.add_port(Signal::new(name, we + wf + 1, SignalKind::Input, 0).with_numeric(format))
    }

    /// Declares an output port of `width` bits.
    pub fn add_output(&mut self, name: &str, width: u32) -> Result<SignalId, GenError> {
        self.add_port(Signal::new(name, width, SignalKind::Output, 0))
    }

    /// Declares an output that may legally take `possible_values` values for
    /// one input (e.g. 2 for faithful rounding).
    pub fn add_output_values(
        &mut self,
        name: &str,
        width: u32,
        possible_values: u32,
    ) -> Result<SignalId, GenError> {
        let mut signal = Signal::new(name, width, SignalKind::Output, 0);
        signal.possible_values = possible_values.max(1);
        self.add_port(signal)
    }

    /// Declares an exception-tagged floating-point output.
    pub fn add_fp_output(
        &mut self,
        name: &str,
        we: u32,
        wf: u32,
        possible_values: u32,
    ) -> Result<SignalId, GenError> {
        let mut signal = Signal::new(name, we + wf + 3, SignalKind::Output, 0)
            .with_numeric(NumericFormat::TaggedFloat { we, wf });
        signal.possible_values = possible_values.max(1);
        self.add_port(signal)
    }

    /// Declares an IEEE-754 floating-point output.
    pub fn add_ieee_output(&mut self, name: &str, we: u32, wf: u32) -> Result<SignalId, GenError> {
        let format = NumericFormat::IeeeFloat { we, wf };
        self.add_port(Signal::new(name, we + wf + 1, SignalKind::Output, 0).with_numeric(format))
    }

    // ----- internal signals -----

    /// Declares a wire at the current cycle.
    pub fn declare(&mut self, name: &str, width: u32) -> Result<SignalId, GenError> {
        self.declare_kind(name, width, SignalKind::Wire)
    }

    /// Declares a one-element vector wire (`std_logic_vector(0 downto 0)`).
    pub fn declare_bus(&mut self, name: &str, width: u32) -> Result<SignalId, GenError> {
        let signal = Signal::new(name, width, SignalKind::Wire, self.sched.cycle()).with_bus(true);
        self.table.declare(signal)
    }

    /// Declares a signal whose register chain uses the reset style of `kind`.
    pub fn declare_kind(
        &mut self,
        name: &str,
        width: u32,
        kind: SignalKind,
    ) -> Result<SignalId, GenError> {
        if kind.is_port() {
            return Err(GenError::internal(format!("'{name}' must be declared as a port, not as an internal signal")));
        }
        self.table
            .declare(Signal::new(name, width, kind, self.sched.cycle()))
    }

    /// Declares an exception-tagged floating-point wire.
    pub fn declare_fp(&mut self, name: &str, we: u32, wf: u32) -> Result<SignalId, GenError> {
        let signal = Signal::new(name, we + wf + 3, SignalKind::Wire, self.sched.cycle())
            .with_numeric(NumericFormat::TaggedFloat { we, wf });
        self.table.declare(signal)
    }

    /// Declares a signal that is read one cycle before it is defined.
    ///
    /// Its cycle is fixed by the statement that later drives it, which must
    /// execute exactly one cycle after every early read.
    pub fn declare_feedback(&mut self, name: &str, width: u32) -> Result<SignalId, GenError> {
        let mut signal = Signal::new(name, width, SignalKind::Wire, 0);
        signal.cycle = None;
        signal.feedback = true;
        self.table.declare(signal)
    }

    // ----- reads -----

    /// Reads a signal at the current cycle.
    pub fn read(&self, id: SignalId) -> SignalUse {
        SignalUse {
            signal: id,
            cycle: self.sched.cycle(),
        }
    }

    /// A whole signal as seen at the current cycle.
    pub fn s(&self, id: SignalId) -> UseExpr {
        Expr::Signal(self.read(id))
    }

    /// One bit of a signal as seen at the current cycle.
    pub fn bit(&self, id: SignalId, index: u32) -> UseExpr {
        Expr::bit_of(self.read(id), index)
    }

    /// A slice of a signal as seen at the current cycle.
    pub fn slice(&self, id: SignalId, high: u32, low: u32) -> UseExpr {
        Expr::slice(self.read(id), high, low)
    }

    /// A signal as seen `extra` cycles after the current one, i.e. through
    /// `extra` more registers.
    pub fn delayed(&self, id: SignalId, extra: u32) -> UseExpr {
        Expr::Signal(SignalUse {
            signal: id,
            cycle: self.sched.cycle() + extra,
        })
    }

    /// Reads a signal by name at the current cycle.
    pub fn use_signal(&self, name: &str) -> Result<UseExpr, GenError> {
        Ok(self.s(self.table.lookup(name)?))
    }

    fn check_read(&self, u: &SignalUse) -> Result<&Signal, GenError> {
        let signal = self.table.try_get(u.signal).ok_or_else(|| {
            GenError::internal(format!("signal id {:?} does not belong to '{}'", u.signal, self.name))
        })?;
        if signal.kind == SignalKind::Output {
            return Err(GenError::internal(format!("output port '{}' cannot be read", signal.name)));
        }
        if let Some(decl) = signal.cycle {
            if u.cycle < decl && !signal.feedback {
                return Err(GenError::BackwardsTime {
                    signal: signal.name.clone(),
                    use_cycle: u.cycle,
                    decl_cycle: decl,
                });
            }
        }
        Ok(signal)
    }

    /// Validates an expression and returns its width.
    pub fn check_expr(&self, e: &UseExpr) -> Result<u32, GenError> {
        match e {
            Expr::Signal(u) => Ok(self.check_read(u)?.width),
            Expr::Const(bits) => Ok(bits.width()),
            Expr::Slice { signal, high, low } => {
                let s = self.check_read(signal)?;
                if high < low || *high >= s.width {
                    return Err(GenError::SliceOutOfRange {
                        signal: s.name.clone(),
                        high: *high,
                        low: *low,
                        width: s.width,
                    });
                }
                Ok(high - low + 1)
            }
            Expr::Concat(parts) => {
                if parts.is_empty() {
                    return Err(GenError::internal("empty concatenation"));
                }
                let mut width = 0;
                for part in parts {
                    width += self.check_expr(part)?;
                }
                Ok(width)
            }
            Expr::Replicate { bit, count } => {
                let w = self.check_expr(bit)?;
                if w != 1 {
                    return Err(GenError::WidthMismatch {
                        context: "replicated bit".into(),
                        expected: 1,
                        found: w,
                    });
                }
                if *count == 0 {
                    return Err(GenError::internal("replication count is zero"));
                }
                Ok(*count)
            }
            Expr::Not(inner) => self.check_expr(inner),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.check_expr(lhs)?;
                let r = self.check_expr(rhs)?;
                match op {
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Xor if l != r => {
                        Err(GenError::WidthMismatch {
                            context: format!("{op:?} operands"),
                            expected: l,
                            found: r,
                        })
                    }
                    BinaryOp::Add | BinaryOp::Sub if r > l => Err(GenError::WidthMismatch {
                        context: format!("{op:?} right operand"),
                        expected: l,
                        found: r,
                    }),
                    BinaryOp::Mul => Ok(l + r),
                    _ => Ok(l),
                }
            }
        }
    }

    fn check_cond(&self, c: &UseCond) -> Result<(), GenError> {
        match c {
            Cond::Cmp { lhs, rhs, .. } => {
                let l = self.check_expr(lhs)?;
                let r = self.check_expr(rhs)?;
                if l != r {
                    return Err(GenError::WidthMismatch {
                        context: "comparison".into(),
                        expected: l,
                        found: r,
                    });
                }
                Ok(())
            }
            Cond::And(a, b) | Cond::Or(a, b) => {
                self.check_cond(a)?;
                self.check_cond(b)
            }
            Cond::Not(inner) => self.check_cond(inner),
        }
    }

    // ----- statements -----

    /// Claims `target` as driven by a statement of width `width` at the
    /// current cycle.
    fn drive(&mut self, target: SignalId, width: u32) -> Result<(), GenError> {
        let cycle = self.sched.cycle();
        let delay = self.sched.critical_path();
        let signal = self.table.try_get(target).ok_or_else(|| {
            GenError::internal(format!("target id {target:?} does not belong to '{}'", self.name))
        })?;
        if signal.kind == SignalKind::Input {
            return Err(GenError::internal(format!("input port '{}' cannot be driven", signal.name)));
        }
        if signal.width != width {
            return Err(GenError::WidthMismatch {
                context: format!("assignment to '{}'", signal.name),
                expected: signal.width,
                found: width,
            });
        }
        if !self.drivers.insert(target) {
            return Err(GenError::MultipleDrivers(signal.name.clone()));
        }
        let signal = self.table.get_mut(target);
        if signal.kind != SignalKind::Output {
            signal.cycle = Some(cycle);
            signal.delay = delay;
        }
        Ok(())
    }

    fn push_driving(&mut self, target: SignalId, stmt: Statement<SignalUse>) {
        let cycle = self.sched.cycle();
        let index = self.ir.push(cycle, stmt);
        if self.table.get(target).kind == SignalKind::Output {
            self.deferred.push(DeferredOutput {
                signal: target,
                index,
                cycle,
                delay: self.sched.critical_path(),
            });
        }
    }

    /// `target <= value` at the current cycle.
    ///
    /// Outputs are not driven here but at the last cycle of the operator, so
    /// that every output is valid exactly `pipeline_depth` cycles after the
    /// inputs.
    pub fn assign(&mut self, target: SignalId, value: UseExpr) -> Result<(), GenError> {
        let width = self.check_expr(&value)?;
        self.drive(target, width)?;
        self.push_driving(target, Statement::Assign { target, value });
        Ok(())
    }

    /// Declares a wire and assigns it in one step.
    pub fn define(&mut self, name: &str, value: UseExpr) -> Result<SignalId, GenError> {
        let width = self.check_expr(&value)?;
        let id = self.declare(name, width)?;
        self.assign(id, value)?;
        Ok(id)
    }

    /// `target <= v1 when c1 else ... else otherwise`.
    pub fn assign_when(
        &mut self,
        target: SignalId,
        arms: Vec<(UseCond, UseExpr)>,
        otherwise: UseExpr,
    ) -> Result<(), GenError> {
        let width = self.check_expr(&otherwise)?;
        for (cond, value) in &arms {
            self.check_cond(cond)?;
            let w = self.check_expr(value)?;
            if w != width {
                return Err(GenError::WidthMismatch {
                    context: format!("conditional assignment to '{}'", self.signal(target).name),
                    expected: width,
                    found: w,
                });
            }
        }
        self.drive(target, width)?;
        self.push_driving(
            target,
            Statement::Conditional {
                target,
                arms,
                otherwise,
            },
        );
        Ok(())
    }

    /// `with selector select target <= ...`.
    pub fn select(
        &mut self,
        target: SignalId,
        selector: SignalId,
        arms: Vec<SelectArm<SignalUse>>,
        otherwise: UseExpr,
    ) -> Result<(), GenError> {
        let selector = self.read(selector);
        let sel_width = self.check_read(&selector)?.width;
        let width = self.check_expr(&otherwise)?;
        for arm in &arms {
            for choice in &arm.choices {
                if choice.width() != sel_width {
                    return Err(GenError::WidthMismatch {
                        context: "select choice".into(),
                        expected: sel_width,
                        found: choice.width(),
                    });
                }
            }
            let w = self.check_expr(&arm.value)?;
            if w != width {
                return Err(GenError::WidthMismatch {
                    context: format!("selected assignment to '{}'", self.signal(target).name),
                    expected: width,
                    found: w,
                });
            }
        }
        self.drive(target, width)?;
        self.push_driving(
            target,
            Statement::Select {
                target,
                selector,
                arms,
                otherwise,
            },
        );
        Ok(())
    }

    /// Appends a comment line.
    pub fn comment(&mut self, text: impl Into<String>) {
        self.ir.comment(self.sched.cycle(), text);
    }

    /// Instantiates `child` at the current cycle.
    ///
    /// Every child port must be connected. Input actuals that are not a
    /// signal, slice or constant are first assigned to a wire named
    /// `<label>_<port>`. Each output actual is declared as a new signal
    /// defined `child.pipeline_depth` cycles after the current one, with the
    /// child's output delay; the returned IDs follow the order of
    /// [`PortMap::output`] calls. To continue after the child, synchronize on
    /// its outputs.
    pub fn instantiate(
        &mut self,
        child: &Arc<Operator>,
        label: &str,
        ports: PortMap,
    ) -> Result<Vec<SignalId>, GenError> {
        if !self.instance_names.insert(label.to_string()) {
            return Err(GenError::DuplicateSignal(label.to_string()));
        }
        for (port, _) in &ports.inputs {
            if child.input(port).is_none() {
                return Err(GenError::UnknownPort {
                    operator: child.name.clone(),
                    port: port.clone(),
                });
            }
        }
        for (port, _) in &ports.outputs {
            if child.output(port).is_none() {
                return Err(GenError::UnknownPort {
                    operator: child.name.clone(),
                    port: port.clone(),
                });
            }
        }

        let mut pending = ports.inputs;
        let mut inputs = Vec::with_capacity(child.inputs.len());
        for formal in child.input_signals() {
            let pos = pending
                .iter()
                .position(|(p, _)| *p == formal.name)
                .ok_or_else(|| GenError::UnmappedPort {
                    instance: label.to_string(),
                    port: formal.name.clone(),
                })?;
            let (port, actual) = pending.swap_remove(pos);
            let width = self.check_expr(&actual)?;
            if width != formal.width {
                return Err(GenError::WidthMismatch {
                    context: format!("port '{port}' of instance '{label}'"),
                    expected: formal.width,
                    found: width,
                });
            }
            let actual = if actual.is_port_actual() {
                actual
            } else {
                let wire = self.define(&format!("{label}_{port}"), actual)?;
                self.s(wire)
            };
            inputs.push((port, actual));
        }

        let out_cycle = self.sched.cycle() + child.pipeline_depth;
        let mut outputs = Vec::with_capacity(child.outputs.len());
        let mut ids = Vec::with_capacity(ports.outputs.len());
        for formal in child.output_signals() {
            let (_, actual) = ports
                .outputs
                .iter()
                .find(|(p, _)| *p == formal.name)
                .ok_or_else(|| GenError::UnmappedPort {
                    instance: label.to_string(),
                    port: formal.name.clone(),
                })?;
            let mut signal = Signal::new(actual.as_str(), formal.width, SignalKind::Wire, out_cycle)
                .with_bus(formal.is_bus)
                .with_numeric(formal.numeric);
            signal.delay = child.output_delay(&formal.name);
            let id = self.table.declare(signal)?;
            self.drivers.insert(id);
            outputs.push((formal.name.clone(), id));
        }
        for (port, _) in &ports.outputs {
            if let Some((_, id)) = outputs.iter().find(|(p, _)| p == port) {
                ids.push(*id);
            }
        }

        self.ir.push(
            self.sched.cycle(),
            Statement::Instance(Instance {
                name: label.to_string(),
                child: Arc::clone(child),
                inputs,
                outputs,
            }),
        );
        Ok(ids)
    }

    /// Attaches a synthesis attribute.
    pub fn add_attribute(&mut self, name: &str, type_name: &str, object: &str, value: &str) {
        self.attributes.push(Attribute {
            name: name.to_string(),
            type_name: type_name.to_string(),
            object: object.to_string(),
            value: value.to_string(),
        });
    }

    /// Asks synthesis to map a table component to block RAM.
    pub fn use_hard_ram(&mut self, table: &Operator) {
        self.ram_attributes(table, "block", "ON");
    }

    /// Asks synthesis to map a table component to logic.
    pub fn use_soft_ram(&mut self, table: &Operator) {
        self.ram_attributes(table, "distributed", "OFF");
    }

    fn ram_attributes(&mut self, table: &Operator, style: &str, recognition: &str) {
        let object = format!("{}: component", table.name);
        match self.target.vendor() {
            Vendor::Xilinx => {
                self.add_attribute("rom_extract", "string", &object, "yes");
                self.add_attribute("rom_style", "string", &object, style);
            }
            Vendor::Intel => self.add_attribute(
                "altera_attribute",
                "string",
                &object,
                &format!("-name ALLOW_ANY_ROM_SIZE_FOR_RECOGNITION {recognition}"),
            ),
        }
    }

    // ----- scheduling -----

    fn enter(&mut self, entered: Option<u32>) -> bool {
        match entered {
            Some(cycle) => {
                self.ir.barrier(cycle);
                true
            }
            None => false,
        }
    }

    /// Returns the current cycle.
    pub fn cycle(&self) -> u32 {
        self.sched.cycle()
    }

    /// Returns the delay accumulated in the current cycle.
    pub fn critical_path(&self) -> f64 {
        self.sched.critical_path()
    }

    /// Overrides the delay accumulated in the current cycle.
    pub fn set_critical_path(&mut self, delay: f64) {
        self.sched.set_critical_path(delay);
    }

    /// Returns the largest cycle reached so far.
    pub fn pipeline_depth(&self) -> u32 {
        self.sched.pipeline_depth()
    }

    /// Enters the next cycle.
    pub fn next_cycle(&mut self) {
        let entered = self.sched.next_cycle();
        self.enter(entered);
    }

    /// Jumps to `cycle`.
    pub fn set_cycle(&mut self, cycle: u32) {
        let entered = self.sched.set_cycle(cycle);
        self.enter(entered);
    }

    /// Adds `delay` to the current stage, inserting a register stage first if
    /// it would not fit. Returns whether a stage was inserted.
    pub fn manage_critical_path(&mut self, delay: f64) -> bool {
        let entered = self.sched.manage_critical_path(delay);
        self.enter(entered)
    }

    fn defined_cycle(&self, id: SignalId) -> Result<u32, GenError> {
        let signal = self.table.get(id);
        signal
            .cycle
            .ok_or_else(|| GenError::UnresolvedSignal(signal.name.clone()))
    }

    /// Moves to the cycle of a signal, forward or backward, with `delay` as
    /// the critical path.
    pub fn set_cycle_from_signal(&mut self, id: SignalId, delay: f64) -> Result<(), GenError> {
        let cycle = self.defined_cycle(id)?;
        let entered = self.sched.set_cycle_from_signal(cycle, delay);
        self.enter(entered);
        Ok(())
    }

    /// Joins the schedule with a signal produced with `delay`: moves forward
    /// to its cycle if it is later, never backward. Returns whether the
    /// cycle changed.
    pub fn sync_cycle_from_signal(&mut self, id: SignalId, delay: f64) -> Result<bool, GenError> {
        let cycle = self.defined_cycle(id)?;
        let entered = self.sched.sync_cycle_from_signal(cycle, delay);
        Ok(self.enter(entered))
    }

    /// Joins the schedule with each signal, using the delay recorded at its
    /// definition.
    pub fn sync_with(&mut self, ids: &[SignalId]) -> Result<(), GenError> {
        for id in ids {
            let delay = self.table.get(*id).delay;
            self.sync_cycle_from_signal(*id, delay)?;
        }
        Ok(())
    }

    // ----- completion -----

    /// Aligns outputs, resolves every read to a register tap, and registers
    /// the operator in the context.
    ///
    /// # Errors
    ///
    /// Fails if an output is never assigned or if resolution finds an
    /// ordering violation, an undriven signal, or a combinational loop.
    pub fn finish(mut self, ctx: &mut GenerationContext) -> Result<Arc<Operator>, GenError> {
        let depth = self.sched.pipeline_depth();
        let mut output_delays = BTreeMap::new();
        for out in &self.deferred {
            self.ir.retag(out.index, depth);
            let signal = self.table.get_mut(out.signal);
            signal.cycle = Some(depth);
            let delay = if out.cycle == depth { out.delay } else { 0.0 };
            signal.delay = delay;
            output_delays.insert(signal.name.clone(), delay);
        }
        for id in self.table.outputs() {
            if !self.drivers.contains(id) {
                return Err(GenError::UnresolvedSignal(self.table.get(*id).name.clone()));
            }
        }

        let (mut signals, inputs, outputs) = self.table.into_parts();
        let statements = resolve(&mut signals, &self.ir.into_statements())?;

        let has_registers = signals.values().any(|s| s.lifespan > 0);
        let sequential_child = statements.iter().any(|t| match &t.stmt {
            Statement::Instance(inst) => inst.child.is_sequential(),
            _ => false,
        });
        let sequential = depth > 0 || has_registers || sequential_child;
        let clocking = Clocking {
            sequential,
            clock_enable: sequential && self.target.use_clock_enable(),
            recirculation: sequential && self.target.has_recirculation(),
        };

        let input_delays: BTreeMap<String, f64> = inputs
            .iter()
            .map(|id| (signals[*id].name.clone(), signals[*id].delay))
            .collect();

        for overrun in self.sched.overruns() {
            ctx.sink().emit(
                Diagnostic::warning(
                    DiagnosticCode::PERIOD_OVERRUN,
                    format!(
                        "a single delay of {:.3} ns exceeds the {:.3} ns clock period",
                        overrun.delay,
                        self.sched.period()
                    ),
                )
                .for_operator(&self.name)
                .with_note(format!("admitted whole in cycle {}", overrun.cycle))
                .with_help("split the operation into chunks the target can register"),
            );
        }
        let summary = if depth > 0 {
            format!("pipeline depth = {depth}")
        } else {
            "not pipelined".to_string()
        };
        ctx.sink().emit(
            Diagnostic::note(DiagnosticCode::PIPELINE_REPORT, summary).for_operator(&self.name),
        );

        let operator = Operator {
            name: self.name,
            copyright: self.copyright,
            description: self.description,
            signals,
            inputs,
            outputs,
            statements,
            attributes: self.attributes,
            pipeline_depth: depth,
            input_delays,
            output_delays,
            clocking,
        };
        Ok(ctx.register(operator))
    }
}

/// A constant of `width` bits, for use in builder expressions.
pub fn constant(value: u64, width: u32) -> UseExpr {
    Expr::Const(Bits::from_u64(value, width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegen_diagnostics::Severity;
    use pipegen_ir::Tap;
    use pipegen_target::{load_target, TargetOptions};

    fn target(pipeline: bool) -> Box<dyn Target> {
        load_target(
            "xilinx",
            Some("virtex5"),
            400.0,
            TargetOptions {
                pipeline,
                ..TargetOptions::default()
            },
        )
        .unwrap()
    }

    /// R = X + Y with a register stage forced in the middle.
    fn registered_adder(ctx: &mut GenerationContext, t: &dyn Target) -> Arc<Operator> {
        let name = ctx.unique_name("RegAdd");
        let mut b = OperatorBuilder::new(name, t);
        let x = b.add_input("X", 8).unwrap();
        let y = b.add_input("Y", 8).unwrap();
        let r = b.add_output("R", 8).unwrap();
        let sum = b.define("sum", b.s(x).add(b.s(y))).unwrap();
        b.next_cycle();
        b.assign(r, b.s(sum)).unwrap();
        b.finish(ctx).unwrap()
    }

    #[test]
    fn registered_output() {
        let t = target(true);
        let mut ctx = GenerationContext::new();
        let op = registered_adder(&mut ctx, t.as_ref());
        assert_eq!(op.pipeline_depth, 1);
        assert!(op.is_sequential());
        let sum = op.port("R").unwrap();
        assert_eq!(op.signal(sum).cycle, Some(1));
        let last = op.statements.last().unwrap();
        let mut taps = Vec::new();
        last.stmt.for_each_leaf(&mut |t: &Tap| taps.push(t.delay));
        assert_eq!(taps, vec![1]);
        assert!(matches!(op.statements[1].stmt, Statement::Barrier(1)));
    }

    #[test]
    fn combinatorial_target_has_no_clock() {
        let t = target(false);
        let mut ctx = GenerationContext::new();
        let op = registered_adder(&mut ctx, t.as_ref());
        assert_eq!(op.pipeline_depth, 0);
        assert!(!op.is_sequential());
    }

    #[test]
    fn outputs_are_aligned_to_depth() {
        let t = target(true);
        let mut ctx = GenerationContext::new();
        let mut b = OperatorBuilder::new("Align", t.as_ref());
        let x = b.add_input("X", 4).unwrap();
        let early = b.add_output("Early", 4).unwrap();
        let late = b.add_output("Late", 4).unwrap();
        b.assign(early, b.s(x)).unwrap();
        b.manage_critical_path(0.3);
        b.next_cycle();
        b.next_cycle();
        b.manage_critical_path(0.4);
        b.assign(late, b.s(x).not()).unwrap();
        let op = b.finish(&mut ctx).unwrap();
        assert_eq!(op.pipeline_depth, 2);
        assert_eq!(op.output_delay("Early"), 0.0);
        assert!((op.output_delay("Late") - 0.4).abs() < 1e-12);
        // X feeds both outputs two registers down.
        assert_eq!(op.signal(x).lifespan, 2);
        for tagged in &op.statements {
            if let Statement::Assign { .. } = tagged.stmt {
                assert_eq!(tagged.cycle, 2);
            }
        }
    }

    #[test]
    fn backwards_read_fails_early() {
        let t = target(true);
        let mut b = OperatorBuilder::new("Back", t.as_ref());
        let x = b.add_input("X", 4).unwrap();
        b.next_cycle();
        let late = b.define("late", b.s(x)).unwrap();
        b.set_cycle(0);
        let err = b.define("early", b.s(late)).unwrap_err();
        assert_eq!(
            err,
            GenError::BackwardsTime {
                signal: "late".into(),
                use_cycle: 0,
                decl_cycle: 1
            }
        );
    }

    #[test]
    fn width_and_slice_checks() {
        let t = target(true);
        let mut b = OperatorBuilder::new("Widths", t.as_ref());
        let x = b.add_input("X", 4).unwrap();
        let y = b.add_input("Y", 6).unwrap();
        let w = b.declare("w", 4).unwrap();
        assert!(matches!(
            b.assign(w, b.s(y)),
            Err(GenError::WidthMismatch { expected: 4, found: 6, .. })
        ));
        assert!(matches!(
            b.define("a", b.s(x).and(b.s(y))),
            Err(GenError::WidthMismatch { .. })
        ));
        assert!(matches!(
            b.define("s", b.slice(x, 4, 1)),
            Err(GenError::SliceOutOfRange { width: 4, .. })
        ));
        // A narrower addend is fine; the sum keeps the left width.
        let sum = b.define("sum", b.s(y).add(b.s(x))).unwrap();
        assert_eq!(b.width(sum), 6);
        let prod = b.define("prod", b.s(x).mul(b.s(y))).unwrap();
        assert_eq!(b.width(prod), 10);
    }

    #[test]
    fn double_driver_and_duplicate_name() {
        let t = target(true);
        let mut b = OperatorBuilder::new("Dup", t.as_ref());
        let x = b.add_input("X", 1).unwrap();
        assert_eq!(
            b.add_input("X", 1).unwrap_err(),
            GenError::DuplicateSignal("X".into())
        );
        let w = b.define("w", b.s(x)).unwrap();
        assert_eq!(
            b.assign(w, b.s(x)).unwrap_err(),
            GenError::MultipleDrivers("w".into())
        );
        assert!(b.assign(x, constant(0, 1)).is_err());
    }

    #[test]
    fn unassigned_output_fails() {
        let t = target(true);
        let mut ctx = GenerationContext::new();
        let mut b = OperatorBuilder::new("NoOut", t.as_ref());
        b.add_input("X", 1).unwrap();
        b.add_output("R", 1).unwrap();
        assert_eq!(
            b.finish(&mut ctx).unwrap_err(),
            GenError::UnresolvedSignal("R".into())
        );
    }

    #[test]
    fn instance_composes_latency() {
        let t = target(true);
        let mut ctx = GenerationContext::new();
        let child = registered_adder(&mut ctx, t.as_ref());
        let name = ctx.unique_name("Twice");
        let mut b = OperatorBuilder::new(name, t.as_ref());
        let a = b.add_input("A", 8).unwrap();
        let r = b.add_output("R", 8).unwrap();
        let outs = b
            .instantiate(
                &child,
                "first",
                PortMap::new()
                    .input("X", b.s(a))
                    .input("Y", b.s(a).not())
                    .output("R", "partial"),
            )
            .unwrap();
        let partial = outs[0];
        assert_eq!(b.signal(partial).cycle, Some(1));
        assert_eq!(b.signal_id("first_Y").unwrap(), SignalId::from_raw(2));
        b.sync_cycle_from_signal(partial, child.output_delay("R"))
            .unwrap();
        assert_eq!(b.cycle(), 1);
        b.assign(r, b.s(partial).xor(b.s(a))).unwrap();
        let op = b.finish(&mut ctx).unwrap();
        assert_eq!(op.pipeline_depth, 1);
        assert_eq!(op.children().len(), 1);
        assert_eq!(op.signal(a).lifespan, 1);
        assert_eq!(ctx.design_order(&op).len(), 2);
    }

    #[test]
    fn instance_port_errors() {
        let t = target(true);
        let mut ctx = GenerationContext::new();
        let child = registered_adder(&mut ctx, t.as_ref());
        let mut b = OperatorBuilder::new("Bad", t.as_ref());
        let a = b.add_input("A", 8).unwrap();
        assert!(matches!(
            b.instantiate(&child, "i0", PortMap::new().input("Z", b.s(a))),
            Err(GenError::UnknownPort { .. })
        ));
        assert!(matches!(
            b.instantiate(&child, "i1", PortMap::new().input("X", b.s(a)).output("R", "r1")),
            Err(GenError::UnmappedPort { .. })
        ));
        assert!(matches!(
            b.instantiate(&child, "i1", PortMap::new()),
            Err(GenError::DuplicateSignal(_))
        ));
    }

    #[test]
    fn feedback_accumulator() {
        let t = target(true);
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
        assert_eq!(op.signal(acc).lifespan, 1);
        assert_eq!(op.signal(ext).cycle, Some(1));
        assert!(op.is_sequential());
    }

    #[test]
    fn overrun_and_report_diagnostics() {
        let t = target(true);
        let mut ctx = GenerationContext::new();
        let mut b = OperatorBuilder::new("Slow", t.as_ref());
        let x = b.add_input("X", 1).unwrap();
        let r = b.add_output("R", 1).unwrap();
        b.manage_critical_path(10.0);
        b.assign(r, b.s(x)).unwrap();
        b.finish(&mut ctx).unwrap();
        let diags = ctx.sink().diagnostics();
        assert!(diags
            .iter()
            .any(|d| d.code == DiagnosticCode::PERIOD_OVERRUN && d.severity == Severity::Warning));
        assert!(diags
            .iter()
            .any(|d| d.code == DiagnosticCode::PIPELINE_REPORT && d.message == "pipeline depth = 1"));
    }

    #[test]
    fn input_delays_seed_critical_path() {
        let t = target(true);
        let delays = BTreeMap::from([("X".to_string(), 0.7), ("Y".to_string(), 1.2)]);
        let mut b = OperatorBuilder::new("Delayed", t.as_ref()).with_input_delays(&delays);
        let x = b.add_input("X", 2).unwrap();
        assert_eq!(b.critical_path(), 1.2);
        assert_eq!(b.signal(x).delay, 0.7);
    }

    #[test]
    fn ram_attributes_follow_vendor() {
        let t = target(true);
        let mut ctx = GenerationContext::new();
        let table = registered_adder(&mut ctx, t.as_ref());
        let mut b = OperatorBuilder::new("Rom", t.as_ref());
        b.use_hard_ram(&table);
        assert_eq!(b.attributes.len(), 2);
        assert_eq!(b.attributes[1].value, "block");
        assert!(b.attributes[0].object.ends_with(": component"));
    }
}
