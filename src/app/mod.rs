//! Application core: pure control logic, zero I/O.
//!
//! The per-fermenter control sessions and the service that owns them.
//! All interaction with thermometers, relays, configuration and clocks
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
