//! Shared mutable context threaded through every phase handler.
//!
//! `LoopContext` is the blackboard the control loop fills in before each
//! tick (fresh flag snapshot, ceiling, monotonic time) and reads back after
//! (pending hardware write, shutoff bookkeeping). Handlers never touch the
//! output device; they record the level they want written and the loop —
//! the only writer — applies it.

use crate::config::SystemConfig;

pub struct LoopContext {
    // -- Inputs, refreshed by the loop before every tick --
    /// Monotonic time in milliseconds since controller start.
    pub now_ms: u64,
    /// Ceiling snapshot for this iteration.
    pub ceiling: u16,
    /// Request-flag snapshot. The shared flags were already cleared when
    /// this snapshot was taken; a flag ignored this tick is gone.
    pub on_requested: bool,
    pub off_requested: bool,

    // -- Owned by the phase machine --
    /// Current output level. Tracks the last value written to hardware.
    pub level: u16,
    /// Level the current tick wants written to the device, if any.
    pub pending_write: Option<u16>,
    /// Shutoff deadline (monotonic ms). Armed once at RampUp entry, checked
    /// only while On, otherwise inert.
    pub shutoff_deadline_ms: Option<u64>,
    /// Configured maximum on-time, in milliseconds.
    pub shutoff_duration_ms: u64,
    /// Set when the deadline (not an off request) forced this tick's
    /// transition out of On; the loop logs it with the AUTO_SHUTOFF actor.
    pub auto_shutoff_fired: bool,
}

impl LoopContext {
    pub fn new(config: &SystemConfig, ceiling: u16) -> Self {
        Self {
            now_ms: 0,
            ceiling,
            on_requested: false,
            off_requested: false,
            level: 0,
            pending_write: None,
            shutoff_deadline_ms: None,
            shutoff_duration_ms: u64::from(config.shutoff_duration_secs) * 1000,
            auto_shutoff_fired: false,
        }
    }

    /// Whether the armed deadline has passed.
    pub fn shutoff_elapsed(&self) -> bool {
        self.shutoff_deadline_ms
            .is_some_and(|deadline| self.now_ms >= deadline)
    }
}
