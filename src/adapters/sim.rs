//! Simulation adapters.
//!
//! In-memory implementations of every port, used by the host/sim binary and
//! by the test suites. `SimDac` hands out a shared inspection handle so a
//! test (or the sim console) can watch the exact write sequence the control
//! loop produced, and can inject bus failures to exercise the fatal-error
//! path.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::info;

use crate::app::ports::{
    ActionSink, CeilingStore, IdentityPort, IndicatorPort, OutputPort, SinkError, StoreError,
};
use crate::audit::ActionRecord;
use crate::drivers::indicator::IndicatorState;
use crate::error::OutputError;

// ───────────────────────────────────────────────────────────────
// SimDac
// ───────────────────────────────────────────────────────────────

/// Shared inner state of the simulated DAC.
pub struct SimDacState {
    value: Mutex<u16>,
    writes: Mutex<Vec<u16>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl SimDacState {
    /// Current simulated output value.
    pub fn value(&self) -> u16 {
        *self.value.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Every value written so far, in order.
    pub fn writes(&self) -> Vec<u16> {
        self.writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent reads fail with a bus error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    /// Make subsequent writes fail with a bus error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }
}

/// Simulated DAC. The port half is moved into the control loop; the
/// [`SimDacState`] handle stays with the caller for inspection.
pub struct SimDac {
    state: Arc<SimDacState>,
}

impl SimDac {
    /// `initial` is the value the "hardware" holds at process start, which
    /// is what cold-start recovery will observe.
    pub fn new(initial: u16) -> (Self, Arc<SimDacState>) {
        let state = Arc::new(SimDacState {
            value: Mutex::new(initial),
            writes: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        });
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl OutputPort for SimDac {
    fn read(&mut self) -> Result<u16, OutputError> {
        if self.state.fail_reads.load(Ordering::Acquire) {
            return Err(OutputError::Bus("simulated read failure".into()));
        }
        Ok(self.state.value())
    }

    fn write(&mut self, level: u16) -> Result<(), OutputError> {
        if self.state.fail_writes.load(Ordering::Acquire) {
            return Err(OutputError::Bus("simulated write failure".into()));
        }
        *self
            .state
            .value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = level;
        self.state
            .writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(level);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// MemoryActionLog
// ───────────────────────────────────────────────────────────────

/// Audit sink that keeps records in memory.
pub struct MemoryActionLog {
    records: Mutex<Vec<ActionRecord>>,
    fail: AtomicBool,
}

impl MemoryActionLog {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn records(&self) -> Vec<ActionRecord> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent appends fail, for exercising the best-effort path.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }
}

impl ActionSink for MemoryActionLog {
    fn append(&self, record: &ActionRecord) -> Result<(), SinkError> {
        if self.fail.load(Ordering::Acquire) {
            return Err(SinkError::Io("simulated sink failure".into()));
        }
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// MemoryCeilingStore
// ───────────────────────────────────────────────────────────────

/// Ceiling storage that lives in memory.
pub struct MemoryCeilingStore {
    value: Mutex<Option<u16>>,
    fail_saves: AtomicBool,
}

impl MemoryCeilingStore {
    pub fn new(initial: Option<u16>) -> Self {
        Self {
            value: Mutex::new(initial),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Release);
    }
}

impl CeilingStore for MemoryCeilingStore {
    fn load(&self) -> Result<u16, StoreError> {
        self.value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .ok_or(StoreError::NotFound)
    }

    fn save(&self, ceiling: u16) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::Acquire) {
            return Err(StoreError::Io("simulated storage failure".into()));
        }
        *self
            .value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(ceiling);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// LogIndicator / NullIdentity
// ───────────────────────────────────────────────────────────────

/// Indicator that writes lamp changes to the log and remembers the last one.
pub struct LogIndicator {
    last: Mutex<Option<IndicatorState>>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    pub fn last(&self) -> Option<IndicatorState> {
        *self.last.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl IndicatorPort for LogIndicator {
    fn show(&self, state: IndicatorState) {
        info!("indicator: {state:?}");
        *self.last.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state);
    }
}

/// Identity lookup that always comes up empty (sim runs have no ARP view
/// worth trusting).
pub struct NullIdentity;

impl IdentityPort for NullIdentity {
    fn hardware_id(&self, _addr: IpAddr) -> Option<String> {
        None
    }
}
