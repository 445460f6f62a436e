//! Panel-side input adapter.
//!
//! Receives debounced edges from the physical controls — the on/off
//! momentary buttons and the manual/computer selector switch — and turns
//! them into the same latched flags the network side produces. Like the
//! network service it is a thin producer: record, latch, return.
//!
//! The selector switch is different in kind from the buttons: it flips the
//! control mode directly and independently of the control loop, and moving
//! it to Manual forces the indicator to the neutral state.

use std::sync::Arc;

use log::{debug, warn};

use crate::audit::{ActionKind, ActionRecord, ActorKind};
use crate::drivers::indicator::indicator_for;
use crate::state::{ControlMode, ControlState};

use super::ports::{ActionSink, IndicatorPort};

pub struct PanelAdapter<L, D> {
    state: Arc<ControlState>,
    audit: Arc<L>,
    indicator: Arc<D>,
}

impl<L, D> PanelAdapter<L, D>
where
    L: ActionSink,
    D: IndicatorPort,
{
    pub fn new(state: Arc<ControlState>, audit: Arc<L>, indicator: Arc<D>) -> Self {
        Self {
            state,
            audit,
            indicator,
        }
    }

    // ── Buttons ───────────────────────────────────────────────

    /// The physical ON button was pressed. Only honoured under computer
    /// control; in Manual the knob is the authority and the button is inert.
    pub fn on_pressed(&self) {
        if !self.state.mode().is_computer() {
            debug!("panel ON press ignored: manual control");
            return;
        }
        self.record(ActionKind::PowerOn);
        self.state.request_on();
    }

    /// The physical OFF button was pressed.
    pub fn off_pressed(&self) {
        if !self.state.mode().is_computer() {
            debug!("panel OFF press ignored: manual control");
            return;
        }
        self.record(ActionKind::PowerOff);
        self.state.request_off();
    }

    // ── Selector switch ───────────────────────────────────────

    /// The selector switch moved. `manual` is the new switch position.
    pub fn mode_changed(&self, manual: bool) {
        let (mode, action) = if manual {
            (ControlMode::Manual, ActionKind::SwitchToManual)
        } else {
            (ControlMode::Computer, ActionKind::SwitchToComputer)
        };
        self.record(action);
        self.state.set_mode(mode);
        // Recompute the lamp immediately: entering Manual blanks it, and
        // returning to Computer restores the current phase's state.
        self.indicator
            .show(indicator_for(self.state.phase(), mode));
    }

    // ── Internal ──────────────────────────────────────────────

    fn record(&self, action: ActionKind) {
        let record = ActionRecord::new(ActorKind::Panel, action, None, None);
        if let Err(e) = self.audit.append(&record) {
            warn!("audit append failed for panel {action}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::{LogIndicator, MemoryActionLog};
    use crate::config::SystemConfig;
    use crate::drivers::indicator::IndicatorState;
    use crate::fsm::PhaseId;

    struct Rig {
        panel: PanelAdapter<MemoryActionLog, LogIndicator>,
        state: Arc<ControlState>,
        audit: Arc<MemoryActionLog>,
        indicator: Arc<LogIndicator>,
    }

    fn rig() -> Rig {
        let state = Arc::new(ControlState::new(&SystemConfig::default(), 4095));
        state.set_phase(PhaseId::Off);
        let audit = Arc::new(MemoryActionLog::new());
        let indicator = Arc::new(LogIndicator::new());
        let panel = PanelAdapter::new(
            Arc::clone(&state),
            Arc::clone(&audit),
            Arc::clone(&indicator),
        );
        Rig {
            panel,
            state,
            audit,
            indicator,
        }
    }

    #[test]
    fn buttons_latch_flags_under_computer_control() {
        let r = rig();
        r.panel.on_pressed();
        assert_eq!(r.state.take_requests(), (true, false));
        r.panel.off_pressed();
        assert_eq!(r.state.take_requests(), (false, true));

        let records = r.audit.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].actor, ActorKind::Panel);
        assert_eq!(records[0].action, ActionKind::PowerOn);
        assert_eq!(records[0].ip_address, None);
        assert_eq!(records[1].action, ActionKind::PowerOff);
    }

    #[test]
    fn buttons_inert_in_manual_mode() {
        let r = rig();
        r.state.set_mode(ControlMode::Manual);
        r.panel.on_pressed();
        r.panel.off_pressed();
        assert_eq!(r.state.take_requests(), (false, false));
        assert!(r.audit.records().is_empty());
    }

    #[test]
    fn switch_to_manual_logs_and_blanks_indicator() {
        let r = rig();
        r.panel.mode_changed(true);

        assert_eq!(r.state.mode(), ControlMode::Manual);
        assert_eq!(r.indicator.last(), Some(IndicatorState::Neutral));
        let records = r.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, ActionKind::SwitchToManual);
        assert_eq!(records[0].actor, ActorKind::Panel);
    }

    #[test]
    fn switch_back_to_computer_restores_phase_lamp() {
        let r = rig();
        r.state.set_phase(PhaseId::On);
        r.panel.mode_changed(true);
        r.panel.mode_changed(false);

        assert_eq!(r.state.mode(), ControlMode::Computer);
        assert_eq!(r.indicator.last(), Some(IndicatorState::On));
        let actions: Vec<_> = r.audit.records().iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![ActionKind::SwitchToManual, ActionKind::SwitchToComputer]
        );
    }
}
