//! Concrete phase handler functions and table builder.
//!
//! Each phase is defined by plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  STARTING ──[recovered 0]──────▶ OFF ◀──────────────┐
//!      │                           │                  │
//!      │                    [on requested]      [level hits 0]
//!      │                           ▼                  │
//!      │                        RAMP_UP          RAMP_DOWN
//!      │                           │                  ▲
//!      │                  [level hits ceiling]        │
//!      │                           ▼                  │
//!      │                          ON ──[off requested │
//!      └──[recovered nonzero]─────────── or shutoff]──┘
//! ```
//!
//! Ramps step the level by exactly one unit per tick and record each
//! intermediate value for the loop to write — smoothness, not just endpoint
//! correctness, is what protects the filament. Request flags are observed
//! only in the rest phases; a flag snapshot taken during a ramp is ignored
//! and the underlying flags were already cleared, so mid-ramp requests are
//! dropped rather than queued.

use super::context::LoopContext;
use super::{PhaseDescriptor, PhaseId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table. Called once at startup.
pub fn build_phase_table() -> [PhaseDescriptor; PhaseId::COUNT] {
    [
        // Index 0 — Starting
        PhaseDescriptor {
            id: PhaseId::Starting,
            name: "Starting",
            on_enter: None,
            on_exit: None,
            on_update: starting_update,
        },
        // Index 1 — Off
        PhaseDescriptor {
            id: PhaseId::Off,
            name: "Off",
            on_enter: None,
            on_exit: None,
            on_update: off_update,
        },
        // Index 2 — RampUp
        PhaseDescriptor {
            id: PhaseId::RampUp,
            name: "RampUp",
            on_enter: Some(ramp_up_enter),
            on_exit: None,
            on_update: ramp_up_update,
        },
        // Index 3 — On
        PhaseDescriptor {
            id: PhaseId::On,
            name: "On",
            on_enter: None,
            on_exit: None,
            on_update: on_update,
        },
        // Index 4 — RampDown
        PhaseDescriptor {
            id: PhaseId::RampDown,
            name: "RampDown",
            on_enter: Some(ramp_down_enter),
            on_exit: None,
            on_update: ramp_down_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  STARTING — waiting for cold-start recovery
// ═══════════════════════════════════════════════════════════════════════════

fn starting_update(_ctx: &mut LoopContext) -> Option<PhaseId> {
    // The control loop samples the output device and forces the exit
    // transition itself; ticking here does nothing.
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF — resting at zero output
// ═══════════════════════════════════════════════════════════════════════════

fn off_update(ctx: &mut LoopContext) -> Option<PhaseId> {
    if ctx.on_requested {
        return Some(PhaseId::RampUp);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RAMP_UP — one unit per tick toward the ceiling
// ═══════════════════════════════════════════════════════════════════════════

fn ramp_up_enter(ctx: &mut LoopContext) {
    // On-time begins here: the shutoff timer is anchored to ramp-up entry
    // so that re-requesting "on" while already On cannot extend it.
    ctx.shutoff_deadline_ms = Some(ctx.now_ms + ctx.shutoff_duration_ms);
}

fn ramp_up_update(ctx: &mut LoopContext) -> Option<PhaseId> {
    if ctx.level >= ctx.ceiling {
        return Some(PhaseId::On);
    }
    ctx.level += 1;
    ctx.pending_write = Some(ctx.level);
    if ctx.level >= ctx.ceiling {
        return Some(PhaseId::On);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ON — resting at the ceiling, shutoff timer live
// ═══════════════════════════════════════════════════════════════════════════

fn on_update(ctx: &mut LoopContext) -> Option<PhaseId> {
    if ctx.off_requested {
        return Some(PhaseId::RampDown);
    }
    if ctx.shutoff_elapsed() {
        ctx.auto_shutoff_fired = true;
        return Some(PhaseId::RampDown);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RAMP_DOWN — one unit per tick toward zero
// ═══════════════════════════════════════════════════════════════════════════

fn ramp_down_enter(ctx: &mut LoopContext) {
    // The deadline only matters while On; disarm so a stale value can never
    // be compared against after the next ramp re-arms it.
    ctx.shutoff_deadline_ms = None;
}

fn ramp_down_update(ctx: &mut LoopContext) -> Option<PhaseId> {
    if ctx.level == 0 {
        return Some(PhaseId::Off);
    }
    ctx.level -= 1;
    ctx.pending_write = Some(ctx.level);
    if ctx.level == 0 {
        return Some(PhaseId::Off);
    }
    None
}
