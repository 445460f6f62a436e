//! Filament controller — main entry point.
//!
//! Boots the controller and runs it until the process is stopped or the
//! output device fails:
//!
//! 1. logger + configuration (JSON file, warn-and-default),
//! 2. persisted ceiling,
//! 3. adapters (sim ring by default; `--features hardware` wires the Pi),
//! 4. the control-loop thread — the only owner of the output device,
//! 5. a line-oriented operator console on stdin that drives the same
//!    service/panel boundary the web layer and GPIO callbacks use in a
//!    full deployment.

use std::io::BufRead;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context};
use log::{info, warn};

use filamentctl::adapters::ceiling_file::FileCeilingStore;
use filamentctl::adapters::csv_log::CsvActionLog;
use filamentctl::app::panel::PanelAdapter;
use filamentctl::app::ports::{ActionSink, CeilingStore, IdentityPort, IndicatorPort, StoreError};
use filamentctl::app::service::NetworkService;
use filamentctl::config::SystemConfig;
use filamentctl::control::ControlLoop;
use filamentctl::state::ControlState;

const CONFIG_PATH: &str = "filamentctl.json";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("filamentctl v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config = match SystemConfig::load_from(Path::new(CONFIG_PATH)) {
        Ok(cfg) => {
            info!("config loaded from {CONFIG_PATH}");
            cfg
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no {CONFIG_PATH}, using defaults");
            SystemConfig::default()
        }
        Err(e) => {
            warn!("config load failed ({e}), using defaults");
            SystemConfig::default()
        }
    };

    // ── 2. Persisted ceiling ──────────────────────────────────
    let store = Arc::new(FileCeilingStore::new(config.ceiling_path.clone().into()));
    let ceiling = initial_ceiling(&store, &config);
    info!(
        "ceiling {ceiling}/{} ({} bits)",
        config.max_level(),
        config.dac_bits
    );

    // ── 3. Shared state + audit sink ──────────────────────────
    let state = Arc::new(ControlState::new(&config, ceiling));
    let audit = Arc::new(
        CsvActionLog::open(Path::new(&config.audit_log_path))
            .with_context(|| format!("opening audit log {}", config.audit_log_path))?,
    );

    run(config, state, audit, store)
}

/// Load the persisted ceiling, defaulting to full scale on first boot and
/// clamping a stale value if the configured resolution shrank.
fn initial_ceiling(store: &Arc<FileCeilingStore>, config: &SystemConfig) -> u16 {
    match store.load() {
        Ok(c) if c <= config.max_level() => c,
        Ok(c) => {
            warn!("persisted ceiling {c} exceeds {}-bit range, clamping", config.dac_bits);
            config.max_level()
        }
        Err(StoreError::NotFound) => {
            info!("no persisted ceiling, defaulting to full scale");
            if let Err(e) = store.save(config.max_level()) {
                warn!("could not persist default ceiling: {e}");
            }
            config.max_level()
        }
        Err(e) => {
            warn!("ceiling load failed ({e}), defaulting to full scale");
            config.max_level()
        }
    }
}

// ── 4a. Sim ring (default build) ──────────────────────────────

#[cfg(not(feature = "hardware"))]
fn run(
    config: SystemConfig,
    state: Arc<ControlState>,
    audit: Arc<CsvActionLog>,
    store: Arc<FileCeilingStore>,
) -> anyhow::Result<()> {
    use filamentctl::adapters::sim::{LogIndicator, NullIdentity, SimDac};

    let indicator = Arc::new(LogIndicator::new());
    let (dac, _dac_state) = SimDac::new(0);

    let looper = ControlLoop::new(
        dac,
        Arc::clone(&state),
        Arc::clone(&audit),
        Arc::clone(&indicator),
        config.clone(),
    );
    let control = thread::Builder::new()
        .name("control".into())
        .spawn(move || looper.run())
        .context("spawning control thread")?;

    let service = NetworkService::new(
        Arc::clone(&state),
        Arc::clone(&audit),
        NullIdentity,
        store,
        config,
    );
    let panel = PanelAdapter::new(state, audit, indicator);

    info!("simulation ready; type 'help' for commands");
    console(&service, &panel, control, false)
}

// ── 4b. Hardware ring (Raspberry Pi) ──────────────────────────

#[cfg(feature = "hardware")]
fn run(
    config: SystemConfig,
    state: Arc<ControlState>,
    audit: Arc<CsvActionLog>,
    store: Arc<FileCeilingStore>,
) -> anyhow::Result<()> {
    use filamentctl::adapters::arp::ArpIdentity;
    use filamentctl::adapters::hardware::{
        spawn_panel_thread, GpioIndicator, Mcp4725Output, PanelPins,
    };

    let gpio = rppal::gpio::Gpio::new().context("opening GPIO")?;
    let indicator = Arc::new(GpioIndicator::open(&gpio).context("claiming lamp pins")?);
    let dac = Mcp4725Output::open().map_err(filamentctl::Error::Io).context("opening DAC")?;

    let looper = ControlLoop::new(
        dac,
        Arc::clone(&state),
        Arc::clone(&audit),
        Arc::clone(&indicator),
        config.clone(),
    );
    let control = thread::Builder::new()
        .name("control".into())
        .spawn(move || looper.run())
        .context("spawning control thread")?;

    let pins = PanelPins::open(&gpio).context("claiming panel pins")?;
    let panel_inputs = PanelAdapter::new(
        Arc::clone(&state),
        Arc::clone(&audit),
        Arc::clone(&indicator),
    );
    let _panel_thread = spawn_panel_thread(panel_inputs, pins).context("spawning panel thread")?;

    let service = NetworkService::new(
        Arc::clone(&state),
        Arc::clone(&audit),
        ArpIdentity::new(),
        store,
        config,
    );
    let panel = PanelAdapter::new(state, audit, indicator);

    info!("hardware ready; type 'help' for commands");
    console(&service, &panel, control, true)
}

// ── 5. Operator console ───────────────────────────────────────

fn console<L, I, C, D>(
    service: &NetworkService<L, I, C>,
    panel: &PanelAdapter<L, D>,
    control: thread::JoinHandle<filamentctl::Result<()>>,
    park_on_eof: bool,
) -> anyhow::Result<()>
where
    L: ActionSink,
    I: IdentityPort,
    C: CeilingStore,
    D: IndicatorPort,
{
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if control.is_finished() {
            return match control.join() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e).context("control loop halted"),
                Err(_) => bail!("control loop panicked"),
            };
        }

        let Some(line) = lines.next() else {
            // stdin closed: a service deployment keeps running until the
            // control loop dies; an interactive sim run just exits.
            if park_on_eof {
                return match control.join() {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e).context("control loop halted"),
                    Err(_) => bail!("control loop panicked"),
                };
            }
            return Ok(());
        };
        let line = line.context("reading stdin")?;
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else { continue };
        let arg = words.next();

        match cmd {
            "help" => {
                println!("commands:");
                println!("  on [ip]       request power-on as a web client");
                println!("  off [ip]      request power-off as a web client");
                println!("  status [ip]   poll status as a web client");
                println!("  ceiling <f>   set ceiling as a fraction (0.0, 1.0]");
                println!("  panel-on      press the physical ON button");
                println!("  panel-off     press the physical OFF button");
                println!("  mode <manual|computer>  move the selector switch");
                println!("  quit");
            }
            "on" => report(service.request_power_on(parse_ip(arg))),
            "off" => report(service.request_power_off(parse_ip(arg))),
            "status" => match serde_json::to_string(&service.status(parse_ip(arg))) {
                Ok(json) => println!("{json}"),
                Err(e) => println!("error: {e}"),
            },
            "ceiling" => match arg.and_then(|a| a.parse::<f64>().ok()) {
                Some(fraction) => match service.set_ceiling(fraction) {
                    Ok(c) => println!("ceiling set to {c}"),
                    Err(e) => println!("error: {e}"),
                },
                None => println!("usage: ceiling <fraction>"),
            },
            "panel-on" => panel.on_pressed(),
            "panel-off" => panel.off_pressed(),
            "mode" => match arg {
                Some("manual") => panel.mode_changed(true),
                Some("computer") => panel.mode_changed(false),
                _ => println!("usage: mode <manual|computer>"),
            },
            "quit" | "exit" => return Ok(()),
            other => println!("unknown command '{other}' (try 'help')"),
        }
    }
}

fn report(result: filamentctl::Result<&'static str>) {
    match result {
        Ok(ack) => println!("{ack}"),
        Err(e) => println!("error: {e}"),
    }
}

fn parse_ip(arg: Option<&str>) -> IpAddr {
    arg.and_then(|a| a.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}
