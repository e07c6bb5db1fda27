//! Port traits: the hexagonal boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlSession / FermentationService
//! ```
//!
//! Driven adapters (sensor cache, relay outputs, fermenter store, clock,
//! event sinks) implement these traits.  The control core consumes them
//! via generics at call sites, so it never touches a global table, a
//! database or a socket directly.
//!
//! All ports are synchronous and infallible at this layer: transport
//! failures belong to the adapter behind the trait.

use crate::app::events::ControlEvent;
use crate::config::{ActuatorId, FermenterConfig, FermenterId, SensorId};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: thermometers → core)
// ───────────────────────────────────────────────────────────────

/// Read-side port: latest cached reading per thermometer.
pub trait SensorPort {
    /// Latest reading for `id`, or `None` if the sensor has never reported.
    ///
    /// Non-finite values are treated by the core exactly like `None`.
    fn read_temperature(&self, id: SensorId) -> Option<f32>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: core → relays)
// ───────────────────────────────────────────────────────────────

/// Write-side port: switch a heater or cooler.
pub trait ActuatorPort {
    /// Switch `id` on or off.  Must be idempotent.
    fn set_actuator(&mut self, id: ActuatorId, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Fermenter configuration port (driven adapter: store → core)
// ───────────────────────────────────────────────────────────────

/// Live fermenter configuration, re-read every tick.
pub trait FermenterConfigPort {
    /// Current configuration of `id`.
    fn fermenter(&self, id: FermenterId) -> Result<FermenterConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic wall-clock source.  Every dwell window is measured against it.
pub trait ClockPort {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → store / UI push / log)
// ───────────────────────────────────────────────────────────────

/// The core emits typed [`ControlEvent`]s through this port.  Adapters
/// decide where they go: a log line, a database row, a websocket push.
pub trait EventSink {
    fn emit(&mut self, event: &ControlEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration lookups and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No configuration exists for the requested fermenter.
    NotFound,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}
