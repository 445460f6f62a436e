//! Network-facing control service.
//!
//! This is the boundary the (out-of-scope) web layer calls into: power
//! requests, status polls, ceiling changes. It is a thin producer — it
//! gates on control mode, writes the audit row, sets a request flag in
//! [`ControlState`] and returns immediately. It never touches the output
//! device; the control loop reacts to the flags on its next poll.
//!
//! Acknowledgment strings are phase-dependent and reflect the phase at the
//! instant the request was accepted.

use std::net::IpAddr;
use std::sync::Arc;

use log::warn;
use serde::Serialize;

use crate::audit::{ActionKind, ActionRecord, ActorKind};
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::fsm::PhaseId;
use crate::state::ControlState;

use super::ports::{ActionSink, CeilingStore, IdentityPort};

/// Snapshot returned to status polls. Field names are the web layer's JSON
/// schema.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub computer_control: bool,
    pub filament_status_message: String,
    pub active_users: usize,
    pub max_dac_value: u16,
    pub dac_bits: u8,
}

pub struct NetworkService<L, I, C> {
    state: Arc<ControlState>,
    audit: Arc<L>,
    identity: I,
    ceiling_store: C,
    config: SystemConfig,
}

impl<L, I, C> NetworkService<L, I, C>
where
    L: ActionSink,
    I: IdentityPort,
    C: CeilingStore,
{
    pub fn new(
        state: Arc<ControlState>,
        audit: Arc<L>,
        identity: I,
        ceiling_store: C,
        config: SystemConfig,
    ) -> Self {
        Self {
            state,
            audit,
            identity,
            ceiling_store,
            config,
        }
    }

    // ── Power requests ────────────────────────────────────────

    /// Request power-on from `origin`. Rejected outright in Manual mode;
    /// otherwise the action is recorded and latched before this returns.
    pub fn request_power_on(&self, origin: IpAddr) -> Result<&'static str> {
        if !self.state.mode().is_computer() {
            return Err(Error::Rejected(
                "the filament is under manual control; flip the panel switch to computer control first",
            ));
        }
        let phase = self.state.phase();
        self.record(ActionKind::PowerOn, origin);
        self.state.request_on();

        Ok(match phase {
            PhaseId::On => "Filament is already on; you cannot turn it on while it is already on.",
            PhaseId::Off => "Turning filament on...",
            PhaseId::RampUp => {
                "Filament is ramping up; you cannot turn it on while it is already turning on."
            }
            PhaseId::RampDown => {
                "Filament is ramping down; you cannot turn it on while it is already turning off."
            }
            PhaseId::Starting => "Filament controller is still starting up; try again in a moment.",
        })
    }

    /// Request power-off from `origin`. Same gating and latching rules.
    pub fn request_power_off(&self, origin: IpAddr) -> Result<&'static str> {
        if !self.state.mode().is_computer() {
            return Err(Error::Rejected(
                "the filament is under manual control; flip the panel switch to computer control first",
            ));
        }
        let phase = self.state.phase();
        self.record(ActionKind::PowerOff, origin);
        self.state.request_off();

        Ok(match phase {
            PhaseId::On => "Turning filament off...",
            PhaseId::Off => {
                "Filament is already off; you cannot turn it off while it is already off."
            }
            PhaseId::RampUp => {
                "Filament is ramping up; you cannot turn it off while it is already turning on."
            }
            PhaseId::RampDown => {
                "Filament is ramping down; you cannot turn it off while it is already turning off."
            }
            PhaseId::Starting => "Filament controller is still starting up; try again in a moment.",
        })
    }

    // ── Status ────────────────────────────────────────────────

    /// Current status for `origin`, which is also marked as an active
    /// viewer (idle viewers age out of the count).
    pub fn status(&self, origin: IpAddr) -> StatusReport {
        let active_users = self.state.sessions.touch(origin);
        let phase = self.state.phase();
        let level = self.state.level();
        let ceiling = self.state.ceiling().max(1);
        let percent = (f64::from(level) / f64::from(ceiling) * 100.0) as u16;

        let filament_status_message = match phase {
            PhaseId::On => "Filament is ON.".to_string(),
            PhaseId::Off => "Filament is OFF.".to_string(),
            PhaseId::RampUp => format!("Filament is ramping up ({percent}% complete)..."),
            PhaseId::RampDown => {
                format!("Filament is ramping down ({}% complete)...", 100 - percent.min(100))
            }
            PhaseId::Starting => "Filament controller is starting up...".to_string(),
        };

        StatusReport {
            computer_control: self.state.mode().is_computer(),
            filament_status_message,
            active_users,
            max_dac_value: self.state.ceiling(),
            dac_bits: self.config.dac_bits,
        }
    }

    // ── Ceiling changes ───────────────────────────────────────

    /// Set a new ceiling as a fraction of full scale, accepted only while
    /// the filament is Off. The new value is persisted before it takes
    /// effect; a storage failure leaves the running ceiling unchanged.
    pub fn set_ceiling(&self, fraction: f64) -> Result<u16> {
        if self.state.phase() != PhaseId::Off {
            return Err(Error::Rejected(
                "you cannot change the settings while the filament is on, ramping up, or ramping down; switch the filament off first",
            ));
        }
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(Error::Validation(
                "maximum output fraction must be in the range (0.0, 1.0]",
            ));
        }
        let ceiling = (fraction * f64::from(self.config.max_level())) as u16;
        self.ceiling_store.save(ceiling).map_err(|e| {
            Error::Persistence(format!(
                "failed to save the new ceiling ({e}); the storage medium may be failing"
            ))
        })?;
        self.state.set_ceiling(ceiling);
        Ok(ceiling)
    }

    // ── Internal ──────────────────────────────────────────────

    /// Record an accepted network action. Identity lookup is best-effort
    /// and the append itself must not block the action.
    fn record(&self, action: ActionKind, origin: IpAddr) {
        let mac = self.identity.hardware_id(origin);
        let record = ActionRecord::new(ActorKind::Network, action, Some(origin), mac);
        if let Err(e) = self.audit.append(&record) {
            warn!("audit append failed for {action}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::{MemoryActionLog, MemoryCeilingStore, NullIdentity};
    use crate::state::ControlMode;

    struct Rig {
        service: NetworkService<MemoryActionLog, NullIdentity, Arc<MemoryCeilingStore>>,
        state: Arc<ControlState>,
        audit: Arc<MemoryActionLog>,
        store: Arc<MemoryCeilingStore>,
    }

    fn rig() -> Rig {
        let config = SystemConfig::default();
        let state = Arc::new(ControlState::new(&config, 4095));
        state.set_phase(PhaseId::Off);
        let audit = Arc::new(MemoryActionLog::new());
        let store = Arc::new(MemoryCeilingStore::new(Some(4095)));
        let service = NetworkService::new(
            Arc::clone(&state),
            Arc::clone(&audit),
            NullIdentity,
            Arc::clone(&store),
            config,
        );
        Rig {
            service,
            state,
            audit,
            store,
        }
    }

    fn origin() -> IpAddr {
        "192.168.1.168".parse().unwrap()
    }

    // ── Mode gating ───────────────────────────────────────────

    #[test]
    fn manual_mode_rejects_without_flag_or_record() {
        let r = rig();
        r.state.set_mode(ControlMode::Manual);

        assert!(matches!(
            r.service.request_power_on(origin()),
            Err(Error::Rejected(_))
        ));
        assert!(matches!(
            r.service.request_power_off(origin()),
            Err(Error::Rejected(_))
        ));
        assert!(r.audit.records().is_empty());
        assert_eq!(r.state.take_requests(), (false, false));
    }

    // ── Acceptance path ───────────────────────────────────────

    #[test]
    fn accepted_request_is_recorded_then_latched() {
        let r = rig();
        let ack = r.service.request_power_on(origin()).unwrap();
        assert_eq!(ack, "Turning filament on...");

        let records = r.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actor, ActorKind::Network);
        assert_eq!(records[0].action, ActionKind::PowerOn);
        assert_eq!(records[0].ip_address, Some(origin()));

        assert_eq!(r.state.take_requests(), (true, false));
    }

    #[test]
    fn acks_reflect_phase_at_acceptance() {
        let r = rig();

        r.state.set_phase(PhaseId::On);
        assert!(r
            .service
            .request_power_on(origin())
            .unwrap()
            .contains("already on"));
        assert_eq!(
            r.service.request_power_off(origin()).unwrap(),
            "Turning filament off..."
        );

        r.state.set_phase(PhaseId::RampUp);
        assert!(r
            .service
            .request_power_off(origin())
            .unwrap()
            .contains("ramping up"));

        r.state.set_phase(PhaseId::RampDown);
        assert!(r
            .service
            .request_power_on(origin())
            .unwrap()
            .contains("ramping down"));

        r.state.set_phase(PhaseId::Off);
        assert!(r
            .service
            .request_power_off(origin())
            .unwrap()
            .contains("already off"));
    }

    #[test]
    fn audit_failure_still_latches_the_request() {
        let r = rig();
        r.audit.set_fail(true);
        let ack = r.service.request_power_on(origin());
        assert!(ack.is_ok());
        assert_eq!(r.state.take_requests(), (true, false));
    }

    // ── Status ────────────────────────────────────────────────

    #[test]
    fn status_reports_phase_and_counts_viewers() {
        let r = rig();
        let report = r.service.status(origin());
        assert!(report.computer_control);
        assert_eq!(report.filament_status_message, "Filament is OFF.");
        assert_eq!(report.active_users, 1);
        assert_eq!(report.max_dac_value, 4095);
        assert_eq!(report.dac_bits, 12);

        let report = r.service.status("192.168.1.2".parse().unwrap());
        assert_eq!(report.active_users, 2);
    }

    #[test]
    fn ramp_status_includes_percent_complete() {
        let r = rig();
        r.state.set_ceiling(200);
        r.state.set_level(50);

        r.state.set_phase(PhaseId::RampUp);
        assert_eq!(
            r.service.status(origin()).filament_status_message,
            "Filament is ramping up (25% complete)..."
        );

        r.state.set_phase(PhaseId::RampDown);
        assert_eq!(
            r.service.status(origin()).filament_status_message,
            "Filament is ramping down (75% complete)..."
        );
    }

    // ── Ceiling changes ───────────────────────────────────────

    #[test]
    fn set_ceiling_scales_and_persists() {
        let r = rig();
        let ceiling = r.service.set_ceiling(0.5).unwrap();
        assert_eq!(ceiling, 2047); // truncation of 0.5 * 4095
        assert_eq!(r.state.ceiling(), 2047);
        assert_eq!(r.store.load(), Ok(2047));

        assert_eq!(r.service.set_ceiling(1.0).unwrap(), 4095);
    }

    #[test]
    fn set_ceiling_rejected_outside_off() {
        let r = rig();
        for phase in [PhaseId::On, PhaseId::RampUp, PhaseId::RampDown, PhaseId::Starting] {
            r.state.set_phase(phase);
            let result = r.service.set_ceiling(0.5);
            assert!(matches!(result, Err(Error::Rejected(_))), "{phase:?}");
            // Ceiling untouched on rejection.
            assert_eq!(r.state.ceiling(), 4095);
        }
    }

    #[test]
    fn set_ceiling_validates_fraction_domain() {
        let r = rig();
        for bad in [0.0, -0.1, 1.01, f64::NAN] {
            assert!(
                matches!(r.service.set_ceiling(bad), Err(Error::Validation(_))),
                "{bad}"
            );
        }
        assert_eq!(r.state.ceiling(), 4095);
    }

    #[test]
    fn persistence_failure_leaves_running_ceiling_unchanged() {
        let r = rig();
        r.store.set_fail_saves(true);
        let result = r.service.set_ceiling(0.25);
        assert!(matches!(result, Err(Error::Persistence(_))));
        assert_eq!(r.state.ceiling(), 4095);
    }
}
