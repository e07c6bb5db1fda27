//! Fermentation chamber temperature control.
//!
//! Exposes the control core (filter, slope, setpoint, overshoot learning,
//! IDLE/HEATING/COOLING state machine) behind port traits, plus host-side
//! adapters.  Sensors, relays, fermenter configuration and the clock are
//! all injected at call sites.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod settings;

pub use error::{Error, Result};
