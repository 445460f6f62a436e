//! System configuration parameters
//!
//! All tunable parameters for the filament controller. Values can be
//! overridden by a JSON config file loaded at boot; the configured ceiling
//! itself is persisted separately (see `adapters::ceiling_file`) because it
//! is operator-settable at runtime.

use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Ramp ---
    /// Time over which the filament is ramped up or down, in seconds.
    pub ramp_time_secs: u16,
    /// DAC resolution in bits. Raw output levels live in `[0, 2^bits - 1]`.
    pub dac_bits: u8,

    // --- Timing ---
    /// Poll interval while resting in Off or On (milliseconds).
    pub idle_poll_interval_ms: u32,
    /// Maximum continuous on-time before the controller forces a ramp-down
    /// on its own (seconds).
    pub shutoff_duration_secs: u32,

    // --- Sessions ---
    /// A web client that has not polled status within this window is no
    /// longer counted as an active viewer (seconds).
    pub session_idle_secs: u16,

    // --- Paths ---
    /// File holding the persisted ceiling as a single integer.
    pub ceiling_path: String,
    /// Append-only CSV audit log of every accepted control action.
    pub audit_log_path: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ramp_time_secs: 30,
            dac_bits: 12,

            idle_poll_interval_ms: 100, // 10 Hz
            shutoff_duration_secs: 4 * 3600,

            session_idle_secs: 5,

            ceiling_path: "max_dac_value.txt".into(),
            audit_log_path: "filament_controller_log.csv".into(),
        }
    }
}

impl SystemConfig {
    /// Highest raw level the DAC can represent: `2^dac_bits - 1`.
    pub fn max_level(&self) -> u16 {
        ((1u32 << self.dac_bits) - 1) as u16
    }

    /// Poll period while resting in Off or On.
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(u64::from(self.idle_poll_interval_ms))
    }

    /// Per-unit step period during a ramp, sized so a full ramp from 0 to
    /// `ceiling` always takes `ramp_time_secs` regardless of resolution.
    pub fn ramp_step(&self, ceiling: u16) -> Duration {
        Duration::from_secs_f64(f64::from(self.ramp_time_secs) / (f64::from(ceiling) + 1.0))
    }

    /// Range-check every field. Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<()> {
        if !(1..=3600).contains(&self.ramp_time_secs) {
            return Err(Error::Validation("ramp_time_secs must be 1-3600"));
        }
        if !(1..=16).contains(&self.dac_bits) {
            return Err(Error::Validation("dac_bits must be 1-16"));
        }
        if !(10..=5000).contains(&self.idle_poll_interval_ms) {
            return Err(Error::Validation("idle_poll_interval_ms must be 10-5000"));
        }
        if !(60..=7 * 24 * 3600).contains(&self.shutoff_duration_secs) {
            return Err(Error::Validation("shutoff_duration_secs must be 60s-7d"));
        }
        if !(1..=3600).contains(&self.session_idle_secs) {
            return Err(Error::Validation("session_idle_secs must be 1-3600"));
        }
        if self.ceiling_path.is_empty() || self.audit_log_path.is_empty() {
            return Err(Error::Validation("storage paths must not be empty"));
        }
        Ok(())
    }

    /// Load and validate a JSON config file.
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        cfg.validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.max_level(), 4095);
        assert!(c.ramp_time_secs > 0);
        assert!(c.idle_poll_interval_ms > 0);
    }

    #[test]
    fn ramp_step_scales_with_resolution() {
        let c = SystemConfig::default();
        // Full ramp duration is ramp_time regardless of ceiling: the step
        // for a coarse ceiling is proportionally longer.
        let fine = c.ramp_step(4095);
        let coarse = c.ramp_step(255);
        assert!(coarse > fine);
        let total = fine.as_secs_f64() * 4096.0;
        assert!((total - f64::from(c.ramp_time_secs)).abs() < 1e-6);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.ramp_time_secs, c2.ramp_time_secs);
        assert_eq!(c.dac_bits, c2.dac_bits);
        assert_eq!(c.ceiling_path, c2.ceiling_path);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let c: SystemConfig = serde_json::from_str(r#"{"ramp_time_secs": 60}"#).unwrap();
        assert_eq!(c.ramp_time_secs, 60);
        assert_eq!(c.dac_bits, SystemConfig::default().dac_bits);
    }

    #[test]
    fn out_of_range_fields_rejected() {
        let mut c = SystemConfig::default();
        c.dac_bits = 0;
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.ramp_time_secs = 0;
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.idle_poll_interval_ms = 9;
        assert!(c.validate().is_err());
    }
}
