//! Raspberry Pi hardware adapters (feature `hardware`).
//!
//! Wires the port traits to the real machine: the MCP4725 on the I2C bus,
//! a pair of status lamps, and a polling thread that feeds the panel
//! buttons and selector switch through the debouncer. All inputs are
//! active-low with pull-ups, so a pressed button reads low.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::info;
use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;

use crate::app::panel::PanelAdapter;
use crate::app::ports::{ActionSink, IndicatorPort, OutputPort};
use crate::drivers::indicator::IndicatorState;
use crate::drivers::mcp4725::{Mcp4725, Mcp4725Error, DEFAULT_ADDRESS};
use crate::drivers::switch::DebouncedInput;
use crate::error::OutputError;

// ── Pin assignment (BCM numbering) ────────────────────────────

pub const ON_BUTTON_GPIO: u8 = 5;
pub const OFF_BUTTON_GPIO: u8 = 6;
pub const MODE_SWITCH_GPIO: u8 = 13;
pub const POWER_LAMP_GPIO: u8 = 16;
pub const RAMP_LAMP_GPIO: u8 = 20;

/// Panel-input poll cadence. Raw samples feed the debouncer, which only
/// reports edges that hold steady for the debounce window.
const PANEL_POLL: Duration = Duration::from_millis(10);

// ───────────────────────────────────────────────────────────────
// DAC output
// ───────────────────────────────────────────────────────────────

/// [`OutputPort`] over the MCP4725 on the Pi's I2C bus.
pub struct Mcp4725Output {
    dac: Mcp4725<I2c>,
}

impl Mcp4725Output {
    pub fn open() -> Result<Self, OutputError> {
        let i2c = I2c::new().map_err(|e| OutputError::Bus(e.to_string()))?;
        info!("opened I2C bus for MCP4725 at 0x{DEFAULT_ADDRESS:02x}");
        Ok(Self {
            dac: Mcp4725::new(i2c, DEFAULT_ADDRESS),
        })
    }
}

fn map_dac_err(e: Mcp4725Error<rppal::i2c::Error>) -> OutputError {
    match e {
        Mcp4725Error::Bus(inner) => OutputError::Bus(inner.to_string()),
        Mcp4725Error::LevelOutOfRange(level) => OutputError::LevelOutOfRange(level),
    }
}

impl OutputPort for Mcp4725Output {
    fn read(&mut self) -> Result<u16, OutputError> {
        self.dac.read_level().map_err(map_dac_err)
    }

    fn write(&mut self, level: u16) -> Result<(), OutputError> {
        self.dac.write_level(level).map_err(map_dac_err)
    }
}

// ───────────────────────────────────────────────────────────────
// Status lamps
// ───────────────────────────────────────────────────────────────

/// Two-lamp indicator: POWER steady while On, RAMP lit during either ramp,
/// everything dark in Neutral/Off/Starting.
pub struct GpioIndicator {
    lamps: Mutex<(OutputPin, OutputPin)>,
}

impl GpioIndicator {
    pub fn open(gpio: &Gpio) -> rppal::gpio::Result<Self> {
        let power = gpio.get(POWER_LAMP_GPIO)?.into_output_low();
        let ramp = gpio.get(RAMP_LAMP_GPIO)?.into_output_low();
        Ok(Self {
            lamps: Mutex::new((power, ramp)),
        })
    }
}

impl IndicatorPort for GpioIndicator {
    fn show(&self, state: IndicatorState) {
        let mut lamps = self
            .lamps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let (power, ramp) = (&mut lamps.0, &mut lamps.1);
        match state {
            IndicatorState::On => {
                power.set_high();
                ramp.set_low();
            }
            IndicatorState::RampingUp | IndicatorState::RampingDown => {
                power.set_low();
                ramp.set_high();
            }
            IndicatorState::Neutral | IndicatorState::Off | IndicatorState::Starting => {
                power.set_low();
                ramp.set_low();
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Panel inputs
// ───────────────────────────────────────────────────────────────

pub struct PanelPins {
    on_button: InputPin,
    off_button: InputPin,
    mode_switch: InputPin,
}

impl PanelPins {
    pub fn open(gpio: &Gpio) -> rppal::gpio::Result<Self> {
        Ok(Self {
            on_button: gpio.get(ON_BUTTON_GPIO)?.into_input_pullup(),
            off_button: gpio.get(OFF_BUTTON_GPIO)?.into_input_pullup(),
            mode_switch: gpio.get(MODE_SWITCH_GPIO)?.into_input_pullup(),
        })
    }
}

/// Spawn the panel polling thread. Press edges (high→low on the pulled-up
/// inputs) drive the buttons; any settled change of the selector drives the
/// mode. The thread holds the only handles to the input pins.
pub fn spawn_panel_thread<L, D>(
    panel: PanelAdapter<L, D>,
    pins: PanelPins,
) -> std::io::Result<thread::JoinHandle<()>>
where
    L: ActionSink + 'static,
    D: IndicatorPort + 'static,
{
    thread::Builder::new()
        .name("panel".into())
        .spawn(move || {
            let started = Instant::now();
            let mut on_btn = DebouncedInput::new(pins.on_button.is_low());
            let mut off_btn = DebouncedInput::new(pins.off_button.is_low());
            // Switch convention: low (closed to ground) = Manual.
            let mut selector = DebouncedInput::new(pins.mode_switch.is_low());

            loop {
                let now_ms = started.elapsed().as_millis() as u64;
                if on_btn.update(pins.on_button.is_low(), now_ms) == Some(true) {
                    panel.on_pressed();
                }
                if off_btn.update(pins.off_button.is_low(), now_ms) == Some(true) {
                    panel.off_pressed();
                }
                if let Some(manual) = selector.update(pins.mode_switch.is_low(), now_ms) {
                    panel.mode_changed(manual);
                }
                thread::sleep(PANEL_POLL);
            }
        })
}
