//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern: a fixed table of phase descriptors, each a
//! set of plain `fn` pointers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                 │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐    │
//! │  │ PhaseId  │ on_enter  │ on_exit  │ on_update         │    │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤    │
//! │  │ Starting │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │    │
//! │  │ Off      │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │    │
//! │  │ RampUp   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │    │
//! │  │ On       │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │    │
//! │  │ RampDown │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │    │
//! │  └──────────┴───────────┴──────────┴───────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase. If it
//! returns `Some(next)`, the engine runs `on_exit` for the current phase,
//! then `on_enter` for the next, and updates the current pointer. All
//! functions receive `&mut LoopContext`.

pub mod context;
pub mod phases;

use context::LoopContext;
use log::info;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Enumeration of all controller phases.
/// Must stay in sync with the table built in [`phases::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PhaseId {
    /// Transient boot phase: exited once the output device has been sampled
    /// and an initial phase recovered. Never re-entered.
    Starting = 0,
    Off = 1,
    RampUp = 2,
    On = 3,
    RampDown = 4,
}

impl PhaseId {
    /// Total number of phases — used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert a `u8` index back to `PhaseId`. Panics on out-of-range in
    /// debug builds; returns `Off` in release (safe rest state).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Starting,
            1 => Self::Off,
            2 => Self::RampUp,
            3 => Self::On,
            4 => Self::RampDown,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Off
            }
        }
    }

    /// A rest phase accepts requests; a transient phase drops them.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Starting | Self::RampUp | Self::RampDown)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each phase transition.
pub type PhaseActionFn = fn(&mut LoopContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type PhaseUpdateFn = fn(&mut LoopContext) -> Option<PhaseId>;

// ---------------------------------------------------------------------------
// Phase descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct PhaseDescriptor {
    pub id: PhaseId,
    pub name: &'static str,
    pub on_enter: Option<PhaseActionFn>,
    pub on_exit: Option<PhaseActionFn>,
    pub on_update: PhaseUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The phase machine engine. Owns the phase table and the transition
/// bookkeeping; the [`LoopContext`] is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `PhaseId as usize`.
    table: [PhaseDescriptor; PhaseId::COUNT],
    /// Index of the currently active phase.
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current phase was entered.
    phase_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given phase table, starting in `initial`.
    pub fn new(table: [PhaseDescriptor; PhaseId::COUNT], initial: PhaseId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            phase_entry_tick: 0,
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current phase.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut LoopContext) {
        self.tick_count += 1;
        let next = (self.table[self.current].on_update)(ctx);
        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used by cold-start recovery to leave
    /// `Starting` once the output device has been sampled).
    pub fn force_transition(&mut self, next: PhaseId, ctx: &mut LoopContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current phase's identity.
    pub fn current_phase(&self) -> PhaseId {
        PhaseId::from_index(self.current)
    }

    /// How many ticks the FSM has spent in the current phase.
    pub fn ticks_in_current_phase(&self) -> u64 {
        self.tick_count - self.phase_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: PhaseId, ctx: &mut LoopContext) {
        let next_idx = next_id as usize;

        info!(
            "phase transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.phase_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::context::LoopContext;
    use super::*;
    use crate::config::SystemConfig;
    use proptest::prelude::*;

    /// Drive one tick with the given flag snapshot, the way the control
    /// loop does: snapshot in, tick, writes collected out.
    fn drive(fsm: &mut Fsm, ctx: &mut LoopContext, on: bool, off: bool, writes: &mut Vec<u16>) {
        ctx.on_requested = on;
        ctx.off_requested = off;
        ctx.now_ms += 10;
        fsm.tick(ctx);
        if let Some(v) = ctx.pending_write.take() {
            writes.push(v);
        }
    }

    proptest! {
        #[test]
        fn level_never_exceeds_ceiling_or_goes_negative(
            ceiling in 1u16..512,
            events in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..2000),
        ) {
            let mut fsm = Fsm::new(phases::build_phase_table(), PhaseId::Off);
            let mut ctx = LoopContext::new(&SystemConfig::default(), ceiling);
            let mut writes = Vec::new();

            for (on, off) in events {
                drive(&mut fsm, &mut ctx, on, off, &mut writes);
                prop_assert!(ctx.level <= ceiling,
                    "level {} above ceiling {}", ctx.level, ceiling);
            }
            for w in &writes {
                prop_assert!(*w <= ceiling);
            }
        }

        #[test]
        fn writes_are_unit_steps(
            ceiling in 1u16..256,
            events in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..4000),
        ) {
            let mut fsm = Fsm::new(phases::build_phase_table(), PhaseId::Off);
            let mut ctx = LoopContext::new(&SystemConfig::default(), ceiling);
            let mut last = 0i32;

            for (on, off) in events {
                let mut writes = Vec::new();
                drive(&mut fsm, &mut ctx, on, off, &mut writes);
                for w in writes {
                    let delta = (i32::from(w) - last).abs();
                    prop_assert_eq!(delta, 1, "non-unit step {} -> {}", last, w);
                    last = i32::from(w);
                }
            }
        }

        #[test]
        fn requests_during_transient_phases_are_dropped(
            ceiling in 2u16..64,
        ) {
            let mut fsm = Fsm::new(phases::build_phase_table(), PhaseId::Off);
            let mut ctx = LoopContext::new(&SystemConfig::default(), ceiling);
            let mut writes = Vec::new();

            // Kick off a ramp-up, then spam opposing requests mid-ramp.
            drive(&mut fsm, &mut ctx, true, false, &mut writes);
            prop_assert_eq!(fsm.current_phase(), PhaseId::RampUp);
            for _ in 0..(ceiling - 1) {
                drive(&mut fsm, &mut ctx, false, true, &mut writes);
            }
            // Off requests observed mid-ramp were dropped, not queued: the
            // ramp completes and the controller rests in On.
            drive(&mut fsm, &mut ctx, false, false, &mut writes);
            prop_assert_eq!(fsm.current_phase(), PhaseId::On);
            drive(&mut fsm, &mut ctx, false, false, &mut writes);
            prop_assert_eq!(fsm.current_phase(), PhaseId::On);
        }
    }
}
