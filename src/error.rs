//! Unified error types for the filament controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! control loop's error handling uniform. The four variants map onto the
//! four ways this system can fail: the output device stops answering, a
//! caller sends a bad value, the storage medium rejects a write, or an
//! action is not permitted in the current mode/phase.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Output-device read or write failure. Fatal to the control loop: the
    /// loop must not keep writing values against a device whose state it can
    /// no longer trust, because a blind write is an unramped jump.
    Io(OutputError),
    /// A caller-supplied value failed range validation. No state change.
    Validation(&'static str),
    /// Persisting the ceiling to storage failed. Reported distinctly so the
    /// operator learns the storage medium may be failing.
    Persistence(String),
    /// The action is not allowed right now (Manual mode, or a ceiling change
    /// outside the Off phase). No state change, no audit row.
    Rejected(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "output device: {e}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence: {msg}"),
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Output-device errors
// ---------------------------------------------------------------------------

/// Failure reported by an [`OutputPort`](crate::app::ports::OutputPort)
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    /// The underlying bus transaction failed (I2C NAK, timeout, ...).
    Bus(String),
    /// A caller asked for a level beyond the device's resolution.
    LevelOutOfRange(u16),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(detail) => write!(f, "bus failure: {detail}"),
            Self::LevelOutOfRange(level) => write!(f, "level {level} out of range"),
        }
    }
}

impl std::error::Error for OutputError {}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_error_converts_to_io() {
        let e: Error = OutputError::Bus("nak".into()).into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn display_names_the_category() {
        let e = Error::Persistence("write failed".into());
        assert!(e.to_string().starts_with("persistence:"));
        let e = Error::Rejected("manual mode");
        assert!(e.to_string().starts_with("rejected:"));
    }
}
