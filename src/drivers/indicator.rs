//! Status indicator mapping.
//!
//! Pure derivation of the front-panel lamp state from the current phase and
//! control mode. Recomputed on every phase transition and every mode change;
//! the adapters decide what a state looks like (log line, GPIO lamps).

use crate::fsm::PhaseId;
use crate::state::ControlMode;

/// What the panel lamp should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// Selector is in Manual: the controller shows nothing, because the
    /// human at the knob is the authority and stale lamps would mislead.
    Neutral,
    /// Booting, output state not yet recovered.
    Starting,
    Off,
    RampingUp,
    On,
    RampingDown,
}

/// Derive the lamp state. Manual mode wins over every phase.
pub fn indicator_for(phase: PhaseId, mode: ControlMode) -> IndicatorState {
    if !mode.is_computer() {
        return IndicatorState::Neutral;
    }
    match phase {
        PhaseId::Starting => IndicatorState::Starting,
        PhaseId::Off => IndicatorState::Off,
        PhaseId::RampUp => IndicatorState::RampingUp,
        PhaseId::On => IndicatorState::On,
        PhaseId::RampDown => IndicatorState::RampingDown,
    }
}
