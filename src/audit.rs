//! Audit-trail record types.
//!
//! Every state-affecting action produces one [`ActionRecord`]: who initiated
//! it (actor kind), what it was (action kind), and the network identity of
//! the originator when one exists. Records are rendered as CSV rows by the
//! sink adapter; the row layout here is the log's logical schema.

use core::fmt;
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;

/// Column header written once when a fresh log file is created.
pub const CSV_HEADER: &str =
    "Raw Timestamp,Formatted Timestamp,Control Type,Control Action,IP Address,MAC Address";

/// Formatted-timestamp layout, e.g. `07/04/2026 09:41:03 PM`.
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

// ---------------------------------------------------------------------------
// Actor / action kinds
// ---------------------------------------------------------------------------

/// Origin category of a logged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    /// Physical switch or button on the front panel.
    Panel,
    /// Web-originated request.
    Network,
    /// The controller's own shutoff timer expired.
    AutoShutoff,
    /// Cold-start recovery found the output energised and ramped it down.
    AutoStartup,
}

impl ActorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Panel => "PANEL",
            Self::Network => "WEB",
            Self::AutoShutoff => "AUTO_SHUTOFF",
            Self::AutoStartup => "AUTO_STARTUP",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    SwitchToManual,
    SwitchToComputer,
    PowerOn,
    PowerOff,
}

impl ActionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SwitchToManual => "SWITCH_TO_MANUAL_CONTROL",
            Self::SwitchToComputer => "SWITCH_TO_COMPUTER_CONTROL",
            Self::PowerOn => "FILAMENT_ON",
            Self::PowerOff => "FILAMENT_OFF",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionRecord
// ---------------------------------------------------------------------------

/// One immutable audit entry, created at the moment an action is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    /// Seconds since the Unix epoch, fractional.
    pub raw_timestamp: f64,
    /// Local-time rendering of the same instant.
    pub formatted_timestamp: String,
    pub actor: ActorKind,
    pub action: ActionKind,
    /// Originating address for network actions; `None` for panel/automatic.
    pub ip_address: Option<IpAddr>,
    /// Best-effort hardware identity of the originator; may be unknown.
    pub mac_address: Option<String>,
}

impl ActionRecord {
    /// Build a record stamped with the current wall-clock time.
    pub fn new(
        actor: ActorKind,
        action: ActionKind,
        ip_address: Option<IpAddr>,
        mac_address: Option<String>,
    ) -> Self {
        let raw = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            raw_timestamp: raw,
            formatted_timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            actor,
            action,
            ip_address,
            mac_address,
        }
    }

    /// Render as one CSV row (no trailing newline). Empty cells for absent
    /// originator identity, matching the log schema.
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.raw_timestamp,
            self.formatted_timestamp,
            self.actor,
            self.action,
            self.ip_address.map(|ip| ip.to_string()).unwrap_or_default(),
            self.mac_address.as_deref().unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_log_schema() {
        assert_eq!(ActorKind::Panel.as_str(), "PANEL");
        assert_eq!(ActorKind::Network.as_str(), "WEB");
        assert_eq!(ActorKind::AutoShutoff.as_str(), "AUTO_SHUTOFF");
        assert_eq!(ActorKind::AutoStartup.as_str(), "AUTO_STARTUP");
        assert_eq!(ActionKind::PowerOn.as_str(), "FILAMENT_ON");
        assert_eq!(ActionKind::SwitchToManual.as_str(), "SWITCH_TO_MANUAL_CONTROL");
    }

    #[test]
    fn csv_row_has_six_columns() {
        let rec = ActionRecord::new(
            ActorKind::Network,
            ActionKind::PowerOn,
            Some("192.168.1.168".parse().unwrap()),
            Some("00:1B:44:11:3A:B7".into()),
        );
        let row = rec.csv_row();
        assert_eq!(row.split(',').count(), 6);
        assert!(row.contains("WEB,FILAMENT_ON,192.168.1.168,00:1B:44:11:3A:B7"));
    }

    #[test]
    fn panel_rows_leave_identity_cells_empty() {
        let rec = ActionRecord::new(ActorKind::Panel, ActionKind::PowerOff, None, None);
        assert!(rec.csv_row().ends_with("PANEL,FILAMENT_OFF,,"));
    }

    #[test]
    fn header_matches_row_shape() {
        assert_eq!(CSV_HEADER.split(',').count(), 6);
    }

    #[test]
    fn timestamp_is_recent() {
        let rec = ActionRecord::new(ActorKind::Panel, ActionKind::PowerOn, None, None);
        // Sometime after 2020 and not in the far future.
        assert!(rec.raw_timestamp > 1_577_836_800.0);
        assert!(!rec.formatted_timestamp.is_empty());
    }
}
