//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It contains the tick's temperature snapshot, the phase
//! timers, the overshoot estimator and peak-detector arming, actuator
//! command outputs, and configuration.  Think of it as the "blackboard"
//! in a blackboard architecture.

use crate::config::ControlConfig;
use crate::control::overshoot::{OvershootEstimator, PeakDetector};

use super::ControlState;

// ---------------------------------------------------------------------------
// Temperature snapshot (read-only to state handlers; written by the session)
// ---------------------------------------------------------------------------

/// Temperatures one FSM tick decides on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    /// Filtered beer temperature.
    pub beer: f32,
    /// Raw chamber temperature of this tick.
    pub chamber: f32,
    /// Beer target from the fermenter config.
    pub target: f32,
    /// Chamber target computed this tick.
    pub chamber_target: f32,
}

// ---------------------------------------------------------------------------
// Phase timers
// ---------------------------------------------------------------------------

/// Wall-clock stamps of the last tick spent in each state.
///
/// Stamps are signed milliseconds so the start-up backdate can reach
/// before the clock's zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimers {
    now_ms: i64,
    last_heat_ms: i64,
    last_cool_ms: i64,
    last_idle_ms: i64,
}

impl PhaseTimers {
    /// All stamps set `backdate_secs` before `now_ms`, so dwell windows
    /// are already open at start-up.
    pub fn new(now_ms: u64, backdate_secs: u32) -> Self {
        let now = now_ms as i64;
        let stamp = now - i64::from(backdate_secs) * 1000;
        Self {
            now_ms: now,
            last_heat_ms: stamp,
            last_cool_ms: stamp,
            last_idle_ms: stamp,
        }
    }

    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = now_ms as i64;
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.max(0) as u64
    }

    pub fn stamp_heat(&mut self, at_ms: u64) {
        self.last_heat_ms = at_ms as i64;
    }

    pub fn stamp_cool(&mut self, at_ms: u64) {
        self.last_cool_ms = at_ms as i64;
    }

    pub fn stamp_idle(&mut self, at_ms: u64) {
        self.last_idle_ms = at_ms as i64;
    }

    pub fn since_heat_ms(&self) -> u64 {
        elapsed(self.now_ms, self.last_heat_ms)
    }

    pub fn since_cool_ms(&self) -> u64 {
        elapsed(self.now_ms, self.last_cool_ms)
    }

    /// Time since the last idle tick, i.e. how long the current active
    /// phase has lasted.
    pub fn since_idle_ms(&self) -> u64 {
        elapsed(self.now_ms, self.last_idle_ms)
    }

    pub fn heated_longer_ago_than(&self, secs: u32) -> bool {
        self.since_heat_ms() > u64::from(secs) * 1000
    }

    pub fn cooled_longer_ago_than(&self, secs: u32) -> bool {
        self.since_cool_ms() > u64::from(secs) * 1000
    }
}

fn elapsed(now: i64, then: i64) -> u64 {
    now.saturating_sub(then).max(0) as u64
}

// ---------------------------------------------------------------------------
// Actuator commands (written by state handlers; consumed by the session)
// ---------------------------------------------------------------------------

/// Requested relay levels after the FSM tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorCommands {
    pub heater: bool,
    pub cooler: bool,
}

impl ActuatorCommands {
    /// All actuators off.
    pub fn all_off() -> Self {
        Self::default()
    }

    /// The command every state implies.
    pub fn for_state(state: ControlState) -> Self {
        match state {
            ControlState::Idle => Self::all_off(),
            ControlState::Heating => Self {
                heater: true,
                cooler: false,
            },
            ControlState::Cooling => Self {
                heater: false,
                cooler: true,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
#[derive(Debug, Clone)]
pub struct FsmContext {
    // -- Timing --
    pub timers: PhaseTimers,

    // -- Temperatures --
    /// Updated before each FSM tick.
    pub readings: Readings,

    // -- Learning --
    pub overshoot: OvershootEstimator,
    pub peaks: PeakDetector,

    // -- Actuator outputs --
    /// Commands to be applied to actuators after the FSM tick.
    pub commands: ActuatorCommands,

    // -- Configuration --
    pub config: ControlConfig,
}

impl FsmContext {
    /// Create a new context at `now_ms` with backdated phase timers.
    pub fn new(config: ControlConfig, now_ms: u64) -> Self {
        Self {
            timers: PhaseTimers::new(now_ms, config.startup_backdate_secs),
            readings: Readings::default(),
            overshoot: OvershootEstimator::from_config(&config),
            peaks: PeakDetector::new(),
            commands: ActuatorCommands::all_off(),
            config,
        }
    }
}
