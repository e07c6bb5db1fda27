//! Learned overshoot estimator snapshot.
//!
//! The estimator gains are the only state a session learns that is worth
//! keeping across restarts.  [`LearnedSettings`] captures them; an outer
//! layer may store the postcard blob wherever it likes and hand it back
//! through [`ControlCommand::RestoreLearned`](crate::app::commands::ControlCommand).
//!
//! Blob layout: one version byte followed by the postcard encoding of the
//! two gains.

use serde::{Deserialize, Serialize};

use crate::control::overshoot::{GAIN_LIMITS, OvershootEstimator};
use crate::error::SettingsError;

/// Current blob layout version.
pub const SETTINGS_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnedSettings {
    /// Heat overshoot gain, degrees per minute of heating.
    pub heat_overshoot: f32,
    /// Cool overshoot gain, degrees per minute of cooling.
    pub cool_overshoot: f32,
}

#[derive(Serialize, Deserialize)]
struct Blob {
    version: u8,
    settings: LearnedSettings,
}

impl LearnedSettings {
    pub fn from_estimator(estimator: &OvershootEstimator) -> Self {
        Self {
            heat_overshoot: estimator.heat(),
            cool_overshoot: estimator.cool(),
        }
    }

    /// Both gains must lie within [`GAIN_LIMITS`], the same range every
    /// estimator correction is clamped to.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let ok = |g: f32| (GAIN_LIMITS.0..=GAIN_LIMITS.1).contains(&g);
        if ok(self.heat_overshoot) && ok(self.cool_overshoot) {
            Ok(())
        } else {
            Err(SettingsError::InvalidGain)
        }
    }

    /// Rebuild an estimator.  Fails on invalid gains.
    pub fn to_estimator(&self) -> Result<OvershootEstimator, SettingsError> {
        self.validate()?;
        Ok(OvershootEstimator::new(self.heat_overshoot, self.cool_overshoot))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SettingsError> {
        self.validate()?;
        postcard::to_allocvec(&Blob {
            version: SETTINGS_VERSION,
            settings: *self,
        })
        .map_err(|_| SettingsError::Corrupted)
    }

    /// Decode and validate a blob produced by [`LearnedSettings::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SettingsError> {
        match bytes.first() {
            None => return Err(SettingsError::Corrupted),
            Some(&v) if v != SETTINGS_VERSION => return Err(SettingsError::UnsupportedVersion(v)),
            Some(_) => {}
        }
        let blob: Blob = postcard::from_bytes(bytes).map_err(|_| SettingsError::Corrupted)?;
        blob.settings.validate()?;
        Ok(blob.settings)
    }
}
