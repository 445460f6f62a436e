//! Control loop — the single authority over the output device.
//!
//! One long-lived thread owns the [`OutputPort`] and runs the phase machine:
//!
//! 1. **Cold-start recovery**: sample the device several times, average, and
//!    either rest Off (recovered zero) or ramp the inherited level down. A
//!    single noisy read treated as ground truth could turn an I/O glitch
//!    into a large jump write — the exact failure the ramp exists to
//!    prevent — so the recovered level is the rounded mean of the burst.
//! 2. **Steady state**: consume the request-flag snapshot, tick the FSM,
//!    apply at most one hardware write per iteration, publish phase/level
//!    for the status side, and refresh the indicator on transitions.
//!
//! Any device read/write failure is fatal: the loop stops driving hardware
//! and returns the error rather than guessing at device state. Audit-sink
//! failures, by contrast, are logged and swallowed — the audit trail is
//! best-effort relative to the safety-critical ramp.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::app::ports::{ActionSink, IndicatorPort, OutputPort};
use crate::audit::{ActionKind, ActionRecord, ActorKind};
use crate::config::SystemConfig;
use crate::drivers::indicator::indicator_for;
use crate::error::Result;
use crate::fsm::context::LoopContext;
use crate::fsm::phases::build_phase_table;
use crate::fsm::{Fsm, PhaseId};
use crate::state::ControlState;

/// Reads averaged during cold-start recovery.
const STARTUP_SAMPLES: u32 = 10;
/// Pause between recovery reads.
const STARTUP_SAMPLE_GAP: Duration = Duration::from_millis(10);

pub struct ControlLoop<O, L, D> {
    output: O,
    state: Arc<ControlState>,
    audit: Arc<L>,
    indicator: Arc<D>,
    config: SystemConfig,
    fsm: Fsm,
    ctx: LoopContext,
    started: Instant,
}

impl<O, L, D> ControlLoop<O, L, D>
where
    O: OutputPort,
    L: ActionSink,
    D: IndicatorPort,
{
    pub fn new(
        output: O,
        state: Arc<ControlState>,
        audit: Arc<L>,
        indicator: Arc<D>,
        config: SystemConfig,
    ) -> Self {
        let ctx = LoopContext::new(&config, state.ceiling());
        Self {
            output,
            state,
            audit,
            indicator,
            config,
            fsm: Fsm::new(build_phase_table(), PhaseId::Starting),
            ctx,
            started: Instant::now(),
        }
    }

    /// Run forever (or until the output device fails).
    pub fn run(mut self) -> Result<()> {
        self.recover()?;
        loop {
            let now_ms = self.started.elapsed().as_millis() as u64;
            self.step(now_ms)?;
            thread::sleep(self.tick_period());
        }
    }

    // ── Cold-start recovery ───────────────────────────────────

    /// Exit `Starting` by sampling the device and deciding the initial
    /// phase. A recovered nonzero level is never trusted as intentional:
    /// the controller logs an automatic shutoff and ramps it down.
    pub fn recover(&mut self) -> Result<()> {
        let mut sum: u32 = 0;
        for i in 0..STARTUP_SAMPLES {
            sum += u32::from(self.output.read()?);
            if i + 1 < STARTUP_SAMPLES {
                thread::sleep(STARTUP_SAMPLE_GAP);
            }
        }
        let recovered = ((f64::from(sum) / f64::from(STARTUP_SAMPLES)).round()) as u16;

        self.ctx.level = recovered;
        self.state.set_level(recovered);

        if recovered == 0 {
            info!("cold start: output at rest, entering Off");
            self.fsm.force_transition(PhaseId::Off, &mut self.ctx);
        } else {
            warn!("cold start: output recovered at level {recovered}, ramping down");
            self.append_audit(ActionRecord::new(
                ActorKind::AutoStartup,
                ActionKind::PowerOff,
                None,
                None,
            ));
            self.fsm.force_transition(PhaseId::RampDown, &mut self.ctx);
        }
        self.publish();
        self.indicator
            .show(indicator_for(self.fsm.current_phase(), self.state.mode()));
        Ok(())
    }

    // ── One iteration ─────────────────────────────────────────

    /// Execute a single control iteration at monotonic time `now_ms`.
    ///
    /// Request flags are consumed (and therefore cleared) unconditionally,
    /// in every phase: a request the current phase does not react to is
    /// dropped, never queued.
    pub fn step(&mut self, now_ms: u64) -> Result<()> {
        let prev = self.fsm.current_phase();

        let (on, off) = self.state.take_requests();
        self.ctx.on_requested = on;
        self.ctx.off_requested = off;
        self.ctx.ceiling = self.state.ceiling();
        self.ctx.now_ms = now_ms;

        self.fsm.tick(&mut self.ctx);

        if self.ctx.auto_shutoff_fired {
            self.ctx.auto_shutoff_fired = false;
            info!("shutoff timer expired, forcing ramp-down");
            self.append_audit(ActionRecord::new(
                ActorKind::AutoShutoff,
                ActionKind::PowerOff,
                None,
                None,
            ));
        }

        if let Some(level) = self.ctx.pending_write.take() {
            if let Err(e) = self.output.write(level) {
                error!("output write failed at level {level}: {e} — halting ramp");
                return Err(e.into());
            }
            self.state.set_level(level);
        }

        self.publish();
        if self.fsm.current_phase() != prev {
            self.indicator
                .show(indicator_for(self.fsm.current_phase(), self.state.mode()));
        }
        Ok(())
    }

    /// Sleep interval until the next iteration: a short poll while resting,
    /// the per-unit ramp period while a ramp is in flight.
    pub fn tick_period(&self) -> Duration {
        match self.fsm.current_phase() {
            PhaseId::RampUp | PhaseId::RampDown => self.config.ramp_step(self.ctx.ceiling),
            PhaseId::Starting | PhaseId::Off | PhaseId::On => self.config.idle_poll(),
        }
    }

    /// Current phase, for tests and the sim harness.
    pub fn phase(&self) -> PhaseId {
        self.fsm.current_phase()
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish(&self) {
        self.state.set_phase(self.fsm.current_phase());
        self.state
            .set_shutoff_deadline_ms(self.ctx.shutoff_deadline_ms);
    }

    fn append_audit(&self, record: ActionRecord) {
        if let Err(e) = self.audit.append(&record) {
            warn!("audit append failed ({e}); continuing — ramp safety takes priority");
        }
    }
}
