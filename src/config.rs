//! Control configuration parameters
//!
//! [`ControlConfig`] carries every tunable constant of the control core:
//! setpoint gains, hysteresis bands, overshoot-estimate caps and the dwell
//! windows that gate the state machine.  The defaults are the empirically
//! tuned values for a fridge/heat-belt chamber sampled every 10 seconds.
//!
//! [`FermenterConfig`] is the per-fermenter wiring (which sensor, which
//! heater, which cooler, what target) that the outer application owns and
//! the core reads every tick.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies one fermenter (and therefore one control session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FermenterId(pub u16);

/// Identifies a thermometer known to the external sensor service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(pub u16);

/// Identifies a switchable output (heater, cooler) known to the actuator service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActuatorId(pub u16);

impl core::fmt::Display for FermenterId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "F{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Unit system
// ---------------------------------------------------------------------------

/// Temperature unit used for every value of one fermenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Celsius,
    Fahrenheit,
}

impl UnitSystem {
    /// Lowest chamber target the hardware may be asked for.
    pub const fn min_valid_temp(self) -> f32 {
        match self {
            Self::Celsius => 3.5,
            Self::Fahrenheit => 38.0,
        }
    }

    /// Highest chamber target the hardware may be asked for.
    pub const fn max_valid_temp(self) -> f32 {
        match self {
            Self::Celsius => 150.0,
            Self::Fahrenheit => 300.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Fermenter wiring
// ---------------------------------------------------------------------------

/// Live configuration of one fermenter, re-read on every tick.
///
/// Every device reference is optional: an absent beer sensor suppresses
/// control, an absent chamber sensor degrades to beer-only sensing, and an
/// absent heater or cooler is simply never switched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FermenterConfig {
    /// Thermometer immersed in the beer.
    pub sensor_id: Option<SensorId>,
    /// Thermometer measuring chamber air.
    pub chamber_sensor_id: Option<SensorId>,
    pub heater_id: Option<ActuatorId>,
    pub cooler_id: Option<ActuatorId>,
    /// Desired beer temperature.
    pub target_temp: f32,
    #[serde(default)]
    pub unit: UnitSystem,
}

// ---------------------------------------------------------------------------
// Control tunables
// ---------------------------------------------------------------------------

/// Dwell and timeout windows, all in seconds of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    /// Minimum time after cooling before a new active phase may start.
    pub after_cool_secs: u32,
    /// Minimum time after heating before a new active phase may start.
    pub after_heat_secs: u32,
    /// Negative-peak detection is abandoned this long after cooling.
    pub neg_peak_timeout_secs: u32,
    /// Positive-peak detection is abandoned this long after heating.
    pub pos_peak_timeout_secs: u32,
    /// Heat-then-drift fallback: required time since heating.
    pub heat_drift_after_heat_secs: u32,
    /// Heat-then-drift fallback: required time since cooling.
    pub heat_drift_after_cool_secs: u32,
    /// Cool-then-drift fallback: required time since cooling.
    pub cool_drift_after_cool_secs: u32,
    /// Cool-then-drift fallback: required time since heating.
    pub cool_drift_after_heat_secs: u32,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            after_cool_secs: 15 * 60,
            after_heat_secs: 10 * 60,
            neg_peak_timeout_secs: 30 * 60,
            pos_peak_timeout_secs: 20 * 60,
            heat_drift_after_heat_secs: 10 * 60,
            heat_drift_after_cool_secs: 15 * 60,
            cool_drift_after_cool_secs: 30 * 60,
            cool_drift_after_heat_secs: 30 * 60,
        }
    }
}

/// A band of chamber temperatures relative to the chamber target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetBand {
    pub lower: f32,
    pub upper: f32,
}

impl TargetBand {
    /// Midpoint of the band: the offset at which an active phase is ended.
    pub fn midpoint(&self) -> f32 {
        (self.upper + self.lower) / 2.0
    }
}

/// Core control configuration.
///
/// Missing fields deserialize to their defaults, so a JSON override file
/// only needs the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    // --- Setpoint gains ---
    /// Proportional gain while heating is dominant.
    pub kp_heat: f32,
    /// Proportional gain while cooling is dominant.
    pub kp_cool: f32,
    /// Integral gain.
    pub ki: f32,
    /// Derivative gain while heating is dominant (negative).
    pub kd_heat: f32,
    /// Derivative gain while cooling is dominant (negative).
    pub kd_cool: f32,
    /// Ticks needed to drift from one gain pair to the other.
    pub gain_transition_ticks: u32,

    // --- Integral ---
    /// Integration only happens while |error| is below this.
    pub integral_error_limit: f32,
    /// Errors at or below this magnitude are not integrated.
    pub integral_deadband: f32,
    /// Maximum rising slope (per window) that still counts as horizontal.
    pub integral_slope_rising_max: f32,
    /// Maximum falling slope magnitude (per window) that still counts as horizontal.
    pub integral_slope_falling_max: f32,
    /// Per-tick decay factor applied outside the integration window.
    pub integral_decay: f32,

    // --- State machine ---
    /// Chamber must exceed `chamber_target + idle_range_high` to start cooling.
    pub idle_range_high: f32,
    /// Chamber must be below `chamber_target + idle_range_low` to start heating.
    pub idle_range_low: f32,
    /// Beer must be this far from target before an active phase starts.
    pub beer_idle_band: f32,
    pub heating_target: TargetBand,
    pub cooling_target: TargetBand,
    /// Cap on heating time used for the overshoot prediction.
    pub max_heat_time_for_estimate_secs: u32,
    /// Cap on cooling time used for the overshoot prediction.
    pub max_cool_time_for_estimate_secs: u32,
    pub dwell: DwellConfig,

    // --- Overshoot estimators ---
    /// Starting heat overshoot gain (degrees per minute of heating).
    pub initial_heat_overshoot: f32,
    /// Starting cool overshoot gain (degrees per minute of cooling).
    pub initial_cool_overshoot: f32,

    // --- Timing ---
    /// Phase timers of a new session are backdated by this much.
    pub startup_backdate_secs: u32,
    /// Nominal tick period (milliseconds).
    pub tick_interval_ms: u32,
    /// Gaps between ticks longer than this are logged.
    pub stale_tick_warn_secs: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            kp_heat: 10.0,
            kp_cool: 5.0,
            ki: 0.02,
            kd_heat: -10.0,
            kd_cool: -5.0,
            gain_transition_ticks: 1080,

            integral_error_limit: 5.0,
            integral_deadband: 0.5,
            integral_slope_rising_max: 0.7,
            integral_slope_falling_max: 1.4,
            integral_decay: 0.9,

            idle_range_high: 5.0,
            idle_range_low: -5.0,
            beer_idle_band: 0.5,
            heating_target: TargetBand {
                lower: -1.0,
                upper: 2.0,
            },
            cooling_target: TargetBand {
                lower: -2.0,
                upper: 1.0,
            },
            max_heat_time_for_estimate_secs: 600,
            max_cool_time_for_estimate_secs: 1200,
            dwell: DwellConfig::default(),

            initial_heat_overshoot: 0.2,
            initial_cool_overshoot: 5.0,

            startup_backdate_secs: 20 * 60,
            tick_interval_ms: 10_000, // 0.1 Hz
            stale_tick_warn_secs: 120,
        }
    }
}

impl ControlConfig {
    /// Reject configurations that would break the controller's invariants.
    ///
    /// Values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            self.kp_heat,
            self.kp_cool,
            self.ki,
            self.kd_heat,
            self.kd_cool,
            self.integral_error_limit,
            self.integral_deadband,
            self.integral_slope_rising_max,
            self.integral_slope_falling_max,
            self.integral_decay,
            self.idle_range_high,
            self.idle_range_low,
            self.beer_idle_band,
            self.heating_target.lower,
            self.heating_target.upper,
            self.cooling_target.lower,
            self.cooling_target.upper,
            self.initial_heat_overshoot,
            self.initial_cool_overshoot,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationFailed("non-finite tunable"));
        }
        if self.kp_cool > self.kp_heat {
            return Err(ConfigError::ValidationFailed("kp_cool must not exceed kp_heat"));
        }
        if self.kd_heat > self.kd_cool {
            return Err(ConfigError::ValidationFailed("kd_heat must not exceed kd_cool"));
        }
        if self.gain_transition_ticks == 0 {
            return Err(ConfigError::ValidationFailed("gain_transition_ticks must be > 0"));
        }
        if !(0.0..1.0).contains(&self.integral_decay) {
            return Err(ConfigError::ValidationFailed("integral_decay must be in [0, 1)"));
        }
        if self.idle_range_low >= self.idle_range_high {
            return Err(ConfigError::ValidationFailed("idle range is inverted"));
        }
        if self.heating_target.lower >= self.heating_target.upper
            || self.cooling_target.lower >= self.cooling_target.upper
        {
            return Err(ConfigError::ValidationFailed("target band is inverted"));
        }
        if self.initial_heat_overshoot <= 0.0 || self.initial_cool_overshoot <= 0.0 {
            return Err(ConfigError::ValidationFailed("overshoot gains must be > 0"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        Ok(())
    }
}
