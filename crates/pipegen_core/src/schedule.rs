//! The cycle and critical-path state machine of one operator.
//!
//! The scheduler tracks a cursor `(cycle, critical_path)`. Authors advance
//! it explicitly ([`next_cycle`](SchedulingContext::next_cycle),
//! [`set_cycle`](SchedulingContext::set_cycle)) or let
//! [`manage_critical_path`](SchedulingContext::manage_critical_path) insert a
//! register stage when adding a delay would exceed the clock period.
//!
//! Every transition that enters a cycle returns `Some(cycle)`, so the caller
//! can record a synchronization barrier in the statement log.

use pipegen_target::Target;

/// A delay admitted into a single stage although it alone exceeds the period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodOverrun {
    /// Cycle of the stage.
    pub cycle: u32,
    /// The oversized delay in nanoseconds.
    pub delay: f64,
}

/// Cycle/critical-path scheduler.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    cycle: u32,
    critical_path: f64,
    pipeline_depth: u32,
    period: f64,
    ff_delay: f64,
    pipelined: bool,
    overruns: Vec<PeriodOverrun>,
}

impl SchedulingContext {
    /// Creates a scheduler at `(0, 0)` for a clock period and register overhead.
    pub fn new(period: f64, ff_delay: f64, pipelined: bool) -> Self {
        Self {
            cycle: 0,
            critical_path: 0.0,
            pipeline_depth: 0,
            period,
            ff_delay,
            pipelined,
            overruns: Vec::new(),
        }
    }

    /// Creates a scheduler from a target's period, register overhead and
    /// pipelining flag.
    pub fn for_target(target: &dyn Target) -> Self {
        Self::new(target.period(), target.ff_delay(), target.is_pipelined())
    }

    /// Returns the current cycle.
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Returns the delay accumulated since the last register boundary.
    pub fn critical_path(&self) -> f64 {
        self.critical_path
    }

    /// Overrides the accumulated delay.
    pub fn set_critical_path(&mut self, delay: f64) {
        self.critical_path = delay;
    }

    /// Returns the largest cycle reached so far.
    pub fn pipeline_depth(&self) -> u32 {
        self.pipeline_depth
    }

    /// Returns the clock period in nanoseconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Returns whether cycles can advance.
    pub fn is_pipelined(&self) -> bool {
        self.pipelined
    }

    /// Returns the delays that alone exceeded the clock period.
    pub fn overruns(&self) -> &[PeriodOverrun] {
        &self.overruns
    }

    /// Enters the next cycle with an empty critical path.
    ///
    /// Does nothing on a combinatorial target.
    pub fn next_cycle(&mut self) -> Option<u32> {
        if !self.pipelined {
            return None;
        }
        self.cycle += 1;
        self.critical_path = 0.0;
        self.pipeline_depth = self.pipeline_depth.max(self.cycle);
        Some(self.cycle)
    }

    /// Jumps to `cycle`, forward or backward, with an empty critical path.
    ///
    /// Used to go back and schedule a parallel branch. Does nothing on a
    /// combinatorial target.
    pub fn set_cycle(&mut self, cycle: u32) -> Option<u32> {
        if !self.pipelined {
            return None;
        }
        self.cycle = cycle;
        self.critical_path = 0.0;
        self.pipeline_depth = self.pipeline_depth.max(cycle);
        Some(cycle)
    }

    /// Adds `delay` to the current stage, entering a new cycle first if the
    /// stage would no longer fit in the clock period.
    ///
    /// After the call the critical path never exceeds the period. A delay
    /// larger than the period on its own is recorded as an overrun.
    pub fn manage_critical_path(&mut self, delay: f64) -> Option<u32> {
        if !self.pipelined {
            self.critical_path += delay;
            return None;
        }
        if self.ff_delay + self.critical_path + delay > self.period {
            let entered = self.next_cycle();
            if delay > self.period {
                self.overruns.push(PeriodOverrun {
                    cycle: self.cycle,
                    delay,
                });
            }
            self.critical_path = delay.min(self.period);
            entered
        } else {
            self.critical_path += delay;
            None
        }
    }

    /// Moves to the cycle of a signal unconditionally and adopts its delay.
    pub fn set_cycle_from_signal(&mut self, signal_cycle: u32, delay: f64) -> Option<u32> {
        let entered = self.set_cycle(signal_cycle);
        self.critical_path = delay;
        entered
    }

    /// Joins a signal defined at `signal_cycle` with delay `delay`.
    ///
    /// If the signal belongs to the current cycle the critical path becomes
    /// the larger of the two. If it is later, the cursor moves there and
    /// adopts `delay`. An earlier signal leaves the cursor untouched.
    pub fn sync_cycle_from_signal(&mut self, signal_cycle: u32, delay: f64) -> Option<u32> {
        if signal_cycle == self.cycle {
            self.critical_path = self.critical_path.max(delay);
            None
        } else if signal_cycle > self.cycle {
            let entered = self.set_cycle(signal_cycle);
            self.critical_path = delay;
            entered
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sched() -> SchedulingContext {
        // 400 MHz, 0.5 ns register overhead.
        SchedulingContext::new(2.5, 0.5, true)
    }

    #[test]
    fn initial_state() {
        let s = sched();
        assert_eq!(s.cycle(), 0);
        assert_eq!(s.critical_path(), 0.0);
        assert_eq!(s.pipeline_depth(), 0);
    }

    #[test]
    fn next_cycle_resets_path() {
        let mut s = sched();
        s.set_critical_path(1.0);
        assert_eq!(s.next_cycle(), Some(1));
        assert_eq!(s.critical_path(), 0.0);
        assert_eq!(s.pipeline_depth(), 1);
    }

    #[test]
    fn manage_accumulates_then_registers() {
        let mut s = sched();
        assert_eq!(s.manage_critical_path(1.0), None);
        assert_eq!(s.manage_critical_path(0.75), None);
        assert_eq!(s.critical_path(), 1.75);
        assert_eq!(s.manage_critical_path(0.5), Some(1));
        assert_eq!(s.critical_path(), 0.5);
        assert!(s.overruns().is_empty());
    }

    #[test]
    fn oversized_delay_is_clamped_and_recorded() {
        let mut s = sched();
        assert_eq!(s.manage_critical_path(4.0), Some(1));
        assert_eq!(s.critical_path(), 2.5);
        assert_eq!(s.overruns(), &[PeriodOverrun { cycle: 1, delay: 4.0 }]);
    }

    #[test]
    fn critical_path_never_exceeds_period() {
        let mut s = sched();
        for d in [0.3, 1.9, 0.1, 2.4, 3.0, 0.0, 1.2, 1.2, 1.2] {
            s.manage_critical_path(d);
            assert!(s.critical_path() <= s.period());
        }
    }

    #[test]
    fn sync_moves_forward_only() {
        let mut s = sched();
        s.set_critical_path(0.4);
        assert_eq!(s.sync_cycle_from_signal(0, 1.1), None);
        assert_eq!(s.critical_path(), 1.1);
        assert_eq!(s.sync_cycle_from_signal(3, 0.2), Some(3));
        assert_eq!((s.cycle(), s.critical_path()), (3, 0.2));
        assert_eq!(s.sync_cycle_from_signal(1, 2.0), None);
        assert_eq!((s.cycle(), s.critical_path()), (3, 0.2));
        assert_eq!(s.pipeline_depth(), 3);
    }

    #[test]
    fn set_cycle_goes_back_keeping_depth() {
        let mut s = sched();
        s.set_cycle(4);
        assert_eq!(s.set_cycle_from_signal(1, 0.7), Some(1));
        assert_eq!(s.cycle(), 1);
        assert_eq!(s.critical_path(), 0.7);
        assert_eq!(s.pipeline_depth(), 4);
    }

    #[test]
    fn combinatorial_target_stays_at_zero() {
        let mut s = SchedulingContext::new(2.5, 0.5, false);
        assert_eq!(s.next_cycle(), None);
        assert_eq!(s.set_cycle(3), None);
        assert_eq!(s.manage_critical_path(2.0), None);
        assert_eq!(s.manage_critical_path(2.0), None);
        assert_eq!(s.cycle(), 0);
        assert_eq!(s.critical_path(), 4.0);
        assert_eq!(s.pipeline_depth(), 0);
    }
}
