//! Chamber setpoint computation.
//!
//! The chamber is driven to a target offset from the beer target by a PID
//! term on the beer error:
//!
//! ```text
//! chamber_target = target + Kp·e + Ki·∫e + Kd·slope
//! ```
//!
//! `Kp` and `Kd` are not fixed.  They drift by one small step per tick
//! toward the cool pair while the beer is too warm and toward the heat pair
//! while it is too cold, so the loop gradually retunes itself when the
//! dominant actuator changes.

use log::debug;

use crate::config::{ControlConfig, UnitSystem};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointComputer {
    kp: f32,
    kd: f32,
    integral: f32,
    chamber_target: f32,
}

impl SetpointComputer {
    /// Pick the starting gain pair from the target-vs-beer comparison.
    ///
    /// The chamber target starts equal to the beer target until the first
    /// recompute.
    pub fn new(config: &ControlConfig, target: f32, beer: f32) -> Self {
        let (kp, kd) = if target < beer {
            (config.kp_cool, config.kd_cool)
        } else {
            (config.kp_heat, config.kd_heat)
        };
        Self {
            kp,
            kd,
            integral: 0.0,
            chamber_target: target,
        }
    }

    /// Recompute the chamber target for this tick.
    pub fn recompute(
        &mut self,
        config: &ControlConfig,
        target: f32,
        beer_filtered: f32,
        beer_slope: f32,
        unit: UnitSystem,
    ) -> f32 {
        let error = target - beer_filtered;

        self.update_integral(config, error, beer_slope);
        self.drift_gains(config, error);

        let raw = target + self.kp * error + config.ki * self.integral + self.kd * beer_slope;
        let clamped = raw.clamp(unit.min_valid_temp(), unit.max_valid_temp());
        self.chamber_target = round2(clamped);

        debug!(
            "setpoint: e={:.2} slope={:.3} kp={:.3} kd={:.3} I={:.2} -> {:.2}",
            error, beer_slope, self.kp, self.kd, self.integral, self.chamber_target
        );
        self.chamber_target
    }

    fn update_integral(&mut self, config: &ControlConfig, error: f32, slope: f32) {
        let near_horizontal = slope <= config.integral_slope_rising_max
            && slope >= -config.integral_slope_falling_max;
        if error.abs() < config.integral_error_limit && near_horizontal {
            if error.abs() > config.integral_deadband {
                self.integral += error;
            }
        } else {
            self.integral *= config.integral_decay;
        }
    }

    fn drift_gains(&mut self, config: &ControlConfig, error: f32) {
        let steps = config.gain_transition_ticks as f32;
        let kp_step = (config.kp_heat - config.kp_cool) / steps;
        let kd_step = (config.kd_heat - config.kd_cool) / steps;
        // Beer too warm drifts toward the cool pair.
        let direction = if error < 0.0 { -1.0 } else { 1.0 };
        self.kp = (self.kp + direction * kp_step).clamp(config.kp_cool, config.kp_heat);
        self.kd = (self.kd + direction * kd_step).clamp(config.kd_heat, config.kd_cool);
    }

    pub fn chamber_target(&self) -> f32 {
        self.chamber_target
    }

    pub fn kp(&self) -> f32 {
        self.kp
    }

    pub fn kd(&self) -> f32 {
        self.kd
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }
}

/// Round to two decimal places.
pub(crate) fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
