//! Shared control state.
//!
//! The single authoritative record of everything the concurrent actors
//! exchange: request flags, control mode, the published phase/level/deadline
//! and the configured ceiling. One atomic per field — producers (network
//! handlers, panel callbacks) set flags and return immediately; the control
//! loop is the only consumer and re-reads fresh values every iteration, so
//! no multi-field transaction is ever needed.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use crate::config::SystemConfig;
use crate::fsm::PhaseId;
use crate::sessions::SessionRegistry;

// ---------------------------------------------------------------------------
// Control mode
// ---------------------------------------------------------------------------

/// Whether the automated system currently has authority over the output.
/// Reflects the physical selector switch on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// A human holds the knob; automated requests must be rejected.
    Manual,
    /// The controller (panel buttons + web) drives the output.
    Computer,
}

impl ControlMode {
    pub const fn is_computer(self) -> bool {
        matches!(self, Self::Computer)
    }
}

// ---------------------------------------------------------------------------
// ControlState
// ---------------------------------------------------------------------------

/// Shared mutable state, one synchronized field per logical value.
pub struct ControlState {
    /// Published phase (`PhaseId` as u8). Written only by the control loop.
    phase: AtomicU8,
    /// Published output level — a cache of the last value written to
    /// hardware, maintained by the control loop for status reporting.
    level: AtomicU16,
    /// Configured ceiling. Mutable only while the phase is Off.
    ceiling: AtomicU16,
    /// Level-latched request flags. Set by any producer, consumed-and-
    /// cleared by the control loop exactly once per iteration.
    on_requested: AtomicBool,
    off_requested: AtomicBool,
    /// true = Computer control (the selector grants the system authority).
    computer_control: AtomicBool,
    /// Armed shutoff deadline in monotonic milliseconds; 0 = unarmed.
    shutoff_deadline_ms: AtomicU64,
    /// Active web viewers. Observational only.
    pub sessions: SessionRegistry,
}

impl ControlState {
    pub fn new(config: &SystemConfig, initial_ceiling: u16) -> Self {
        Self {
            phase: AtomicU8::new(PhaseId::Starting as u8),
            level: AtomicU16::new(0),
            ceiling: AtomicU16::new(initial_ceiling),
            on_requested: AtomicBool::new(false),
            off_requested: AtomicBool::new(false),
            computer_control: AtomicBool::new(true),
            shutoff_deadline_ms: AtomicU64::new(0),
            sessions: SessionRegistry::new(Duration::from_secs(u64::from(
                config.session_idle_secs,
            ))),
        }
    }

    // ── Request flags ─────────────────────────────────────────

    pub fn request_on(&self) {
        self.on_requested.store(true, Ordering::Release);
    }

    pub fn request_off(&self) {
        self.off_requested.store(true, Ordering::Release);
    }

    /// Consume both request flags. Clears them unconditionally — multiple
    /// requests since the last poll collapse to one, and a flag that does
    /// not cause a transition this iteration is dropped, not queued.
    pub fn take_requests(&self) -> (bool, bool) {
        (
            self.on_requested.swap(false, Ordering::AcqRel),
            self.off_requested.swap(false, Ordering::AcqRel),
        )
    }

    // ── Control mode ──────────────────────────────────────────

    pub fn mode(&self) -> ControlMode {
        if self.computer_control.load(Ordering::Acquire) {
            ControlMode::Computer
        } else {
            ControlMode::Manual
        }
    }

    pub fn set_mode(&self, mode: ControlMode) {
        self.computer_control
            .store(mode.is_computer(), Ordering::Release);
    }

    // ── Published phase / level ───────────────────────────────

    pub fn phase(&self) -> PhaseId {
        PhaseId::from_index(self.phase.load(Ordering::Acquire) as usize)
    }

    pub fn set_phase(&self, phase: PhaseId) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub fn level(&self) -> u16 {
        self.level.load(Ordering::Acquire)
    }

    pub fn set_level(&self, level: u16) {
        self.level.store(level, Ordering::Release);
    }

    // ── Ceiling ───────────────────────────────────────────────

    pub fn ceiling(&self) -> u16 {
        self.ceiling.load(Ordering::Acquire)
    }

    pub fn set_ceiling(&self, ceiling: u16) {
        self.ceiling.store(ceiling, Ordering::Release);
    }

    // ── Shutoff deadline ──────────────────────────────────────

    /// Armed deadline in monotonic milliseconds, if any.
    pub fn shutoff_deadline_ms(&self) -> Option<u64> {
        match self.shutoff_deadline_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(ms),
        }
    }

    pub fn set_shutoff_deadline_ms(&self, deadline: Option<u64>) {
        self.shutoff_deadline_ms
            .store(deadline.unwrap_or(0), Ordering::Release);
    }
}
