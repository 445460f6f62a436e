//! Device-level building blocks: the DAC driver, the panel-input
//! debouncer, and the status-lamp mapping.

pub mod indicator;
pub mod mcp4725;
pub mod switch;
