//! Signal descriptors: width, kind, numeric format and pipeline bookkeeping.

use serde::{Deserialize, Serialize};

/// Storage kind and direction of a signal.
///
/// The register kinds only matter when the signal has a non-zero lifespan:
/// they choose the reset behavior of its chain of pipeline registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// An input port.
    Input,
    /// An output port.
    Output,
    /// An internal combinational signal.
    Wire,
    /// Delayed copies are plain registers.
    RegisteredWithoutReset,
    /// Delayed copies are cleared by a synchronous reset.
    RegisteredWithSyncReset,
    /// Delayed copies are cleared by an asynchronous reset.
    RegisteredWithAsyncReset,
    /// Delayed copies start at zero and are never reset.
    RegisteredWithZeroInit,
}

/// Reset behavior of a register chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResetStyle {
    /// No reset.
    None,
    /// Synchronous reset to zero.
    Sync,
    /// Asynchronous reset to zero.
    Async,
}

impl SignalKind {
    /// Returns `true` for input and output ports.
    pub fn is_port(self) -> bool {
        matches!(self, SignalKind::Input | SignalKind::Output)
    }

    /// Returns the reset style of this signal's register chain.
    pub fn reset_style(self) -> ResetStyle {
        match self {
            SignalKind::RegisteredWithSyncReset => ResetStyle::Sync,
            SignalKind::RegisteredWithAsyncReset => ResetStyle::Async,
            _ => ResetStyle::None,
        }
    }
}

/// How a bit vector is to be interpreted numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NumericFormat {
    /// A plain bit vector.
    #[default]
    Bits,
    /// Exception-tagged float: `exn(2) & sign & exponent(we) & fraction(wf)`.
    TaggedFloat {
        /// Exponent width.
        we: u32,
        /// Fraction width.
        wf: u32,
    },
    /// IEEE-754 binary interchange format: `sign & exponent(we) & fraction(wf)`.
    IeeeFloat {
        /// Exponent width.
        we: u32,
        /// Fraction width.
        wf: u32,
    },
}

impl NumericFormat {
    /// Returns the total width implied by the format, if it is a float.
    pub fn float_width(self) -> Option<u32> {
        match self {
            NumericFormat::Bits => None,
            NumericFormat::TaggedFloat { we, wf } => Some(we + wf + 3),
            NumericFormat::IeeeFloat { we, wf } => Some(we + wf + 1),
        }
    }
}

/// The pipeline timing class of a signal, known once all uses are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalTiming {
    /// Only read in the cycle it is defined.
    Combinational,
    /// Read up to this many cycles after its definition.
    Pipelined(u32),
    /// Read exactly one cycle before its definition (a loop-carried value).
    Feedback,
}

/// A signal of one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Name, unique within the operator.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// A width-1 bus is a one-element `std_logic_vector`, not a `std_logic`.
    pub is_bus: bool,
    /// Storage kind and direction.
    pub kind: SignalKind,
    /// Numeric interpretation.
    pub numeric: NumericFormat,
    /// Cycle at which the signal is defined; `None` while a feedback signal
    /// is declared but not yet defined.
    pub cycle: Option<u32>,
    /// Largest distance in cycles between the definition and any use.
    pub lifespan: u32,
    /// Whether this signal may be read one cycle before its definition.
    pub feedback: bool,
    /// Combinational delay (ns) accumulated at the definition.
    pub delay: f64,
    /// For outputs, how many distinct values a test may accept.
    pub possible_values: u32,
}

impl Signal {
    /// Creates a plain bit-vector signal defined at `cycle`.
    pub fn new(name: impl Into<String>, width: u32, kind: SignalKind, cycle: u32) -> Self {
        Self {
            name: name.into(),
            width,
            is_bus: width > 1,
            kind,
            numeric: NumericFormat::Bits,
            cycle: Some(cycle),
            lifespan: 0,
            feedback: false,
            delay: 0.0,
            possible_values: 1,
        }
    }

    /// Sets the bus flag (a width-1 bus is a one-element vector).
    pub fn with_bus(mut self, is_bus: bool) -> Self {
        self.is_bus = is_bus || self.width > 1;
        self
    }

    /// Sets the numeric format.
    pub fn with_numeric(mut self, numeric: NumericFormat) -> Self {
        self.numeric = numeric;
        self
    }

    /// Returns `true` if the signal is a single `std_logic` bit.
    pub fn is_std_logic(&self) -> bool {
        self.width == 1 && !self.is_bus
    }

    /// Returns the name of the copy of this signal delayed by `delay` registers.
    pub fn delayed_name(&self, delay: u32) -> String {
        if delay == 0 {
            self.name.clone()
        } else {
            format!("{}_d{delay}", self.name)
        }
    }

    /// Returns the timing class of this signal.
    pub fn timing(&self) -> SignalTiming {
        if self.feedback {
            SignalTiming::Feedback
        } else if self.lifespan == 0 {
            SignalTiming::Combinational
        } else {
            SignalTiming::Pipelined(self.lifespan)
        }
    }

    /// Records a read at `use_cycle`, widening the lifespan if needed.
    ///
    /// Reads before the definition (feedback) leave the lifespan unchanged.
    pub fn note_use(&mut self, use_cycle: u32) {
        if let Some(cycle) = self.cycle {
            if use_cycle > cycle {
                self.lifespan = self.lifespan.max(use_cycle - cycle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delayed_names() {
        let s = Signal::new("expDiff", 9, SignalKind::Wire, 2);
        assert_eq!(s.delayed_name(0), "expDiff");
        assert_eq!(s.delayed_name(3), "expDiff_d3");
    }

    #[test]
    fn lifespan_is_max_distance() {
        let mut s = Signal::new("x", 4, SignalKind::Wire, 2);
        assert_eq!(s.timing(), SignalTiming::Combinational);
        s.note_use(5);
        s.note_use(3);
        s.note_use(2);
        assert_eq!(s.lifespan, 3);
        assert_eq!(s.timing(), SignalTiming::Pipelined(3));
    }

    #[test]
    fn feedback_timing_wins() {
        let mut s = Signal::new("acc_ext", 8, SignalKind::Wire, 4);
        s.feedback = true;
        s.note_use(3);
        assert_eq!(s.lifespan, 0);
        assert_eq!(s.timing(), SignalTiming::Feedback);
    }

    #[test]
    fn std_logic_vs_bus() {
        let bit = Signal::new("sticky", 1, SignalKind::Wire, 0);
        assert!(bit.is_std_logic());
        let bus = Signal::new("cnt", 1, SignalKind::Wire, 0).with_bus(true);
        assert!(!bus.is_std_logic());
        let wide = Signal::new("v", 3, SignalKind::Wire, 0).with_bus(false);
        assert!(wide.is_bus);
    }

    #[test]
    fn float_widths() {
        assert_eq!(NumericFormat::TaggedFloat { we: 8, wf: 23 }.float_width(), Some(34));
        assert_eq!(NumericFormat::IeeeFloat { we: 11, wf: 52 }.float_width(), Some(64));
        assert_eq!(NumericFormat::Bits.float_width(), None);
    }

    #[test]
    fn reset_styles() {
        assert_eq!(SignalKind::RegisteredWithSyncReset.reset_style(), ResetStyle::Sync);
        assert_eq!(SignalKind::RegisteredWithAsyncReset.reset_style(), ResetStyle::Async);
        assert_eq!(SignalKind::RegisteredWithZeroInit.reset_style(), ResetStyle::None);
        assert!(SignalKind::Output.is_port());
        assert!(!SignalKind::Wire.is_port());
    }
}
