//! Filament power controller library.
//!
//! Ramps a DAC-driven filament supply up and down under dual control — a
//! physical panel and a network boundary — while enforcing the invariants
//! that protect the crystal: smooth unit-step ramps, cold-start recovery,
//! a bounded on-time, and an append-only audit trail.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  Mcp4725Output    CsvActionLog    FileCeilingStore           │
//! │  (OutputPort)     (ActionSink)    (CeilingStore)             │
//! │  ArpIdentity      GpioIndicator   Sim doubles (tests/host)   │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  ControlLoop (sole OutputPort writer) · phase FSM      │  │
//! │  │  NetworkService · PanelAdapter  ──▶  ControlState      │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod audit;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod sessions;
pub mod state;

pub use error::{Error, Result};
