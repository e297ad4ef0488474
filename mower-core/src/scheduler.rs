//! Multi-rate dispatcher
//!
//! One monotonic clock gates three cadences: telemetry (1 Hz), orientation
//! fusion (100 Hz) and the control decision (5 Hz). Every poll runs each due
//! block once and reschedules it from the current time, so a late poll never
//! produces a burst of catch-up ticks.

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::controller::Controller;
use crate::service::Platform;
use crate::state::TelemetrySink;

/// Blocks that ran during one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Due {
    pub telemetry: bool,
    pub orientation: bool,
    pub control: bool,
}

impl Due {
    pub fn any(&self) -> bool {
        self.telemetry || self.orientation || self.control
    }
}

pub struct Scheduler<C: Clock> {
    clock: C,
    config: SchedulerConfig,
    next_telemetry_ms: u64,
    next_orientation_ms: u64,
    next_control_ms: u64,
}

impl<C: Clock> Scheduler<C> {
    /// All deadlines start at zero, the first poll runs every block
    pub fn new(clock: C, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            next_telemetry_ms: 0,
            next_orientation_ms: 0,
            next_control_ms: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Runs the due blocks in the order telemetry, orientation, control
    pub fn poll<P: Platform, S: TelemetrySink>(&mut self, controller: &mut Controller<P>, sink: &mut S) -> Due {
        let now = self.clock.now_ms();
        let mut due = Due::default();

        if now >= self.next_telemetry_ms {
            self.next_telemetry_ms = now + self.config.telemetry_period_ms;
            let snapshot = controller.telemetry(now);
            sink.emit(&snapshot);
            due.telemetry = true;
        }

        if now >= self.next_orientation_ms {
            self.next_orientation_ms = now + self.config.orientation_period_ms;
            controller.orientation_tick();
            due.orientation = true;
        }

        if now >= self.next_control_ms {
            self.next_control_ms = now + self.config.control_period_ms;
            controller.control_tick(now);
            due.control = true;
        }

        due
    }

    /// Milliseconds until the earliest deadline, zero when one is already due
    pub fn until_next_ms(&self) -> u64 {
        let next = self
            .next_telemetry_ms
            .min(self.next_orientation_ms)
            .min(self.next_control_ms);
        next.saturating_sub(self.clock.now_ms())
    }
}
