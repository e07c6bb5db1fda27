//! In-memory stores behind the read-side ports.
//!
//! [`SensorCache`] keeps the latest reading per thermometer, filled by
//! whatever polls the physical sensors.  [`FermenterTable`] holds the
//! fermenter wiring and targets an outer layer edits.  Both are
//! fixed-capacity `heapless` maps.

use heapless::FnvIndexMap;
use log::debug;

use crate::app::ports::{ConfigError, FermenterConfigPort, SensorPort};
use crate::config::{FermenterConfig, FermenterId, SensorId};
use crate::error::{Error, Result};

/// Thermometers one cache can track.
pub const MAX_SENSORS: usize = 32;
/// Fermenters one table can hold.
pub const MAX_FERMENTERS: usize = 16;

// ───────────────────────────────────────────────────────────────
// SensorCache
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SensorCache {
    readings: FnvIndexMap<SensorId, f32, MAX_SENSORS>,
}

impl SensorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest reading of `id`.
    pub fn record(&mut self, id: SensorId, temperature: f32) -> Result<()> {
        self.readings
            .insert(id, temperature)
            .map(|_| ())
            .map_err(|_| Error::CapacityExceeded)
    }

    /// Forget `id`, as when a probe is unplugged.
    pub fn clear(&mut self, id: SensorId) {
        if self.readings.remove(&id).is_some() {
            debug!("sensor {} cleared", id.0);
        }
    }
}

impl SensorPort for SensorCache {
    fn read_temperature(&self, id: SensorId) -> Option<f32> {
        self.readings.get(&id).copied()
    }
}

// ───────────────────────────────────────────────────────────────
// FermenterTable
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FermenterTable {
    fermenters: FnvIndexMap<FermenterId, FermenterConfig, MAX_FERMENTERS>,
}

impl FermenterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the configuration of `id`.
    pub fn upsert(&mut self, id: FermenterId, config: FermenterConfig) -> Result<()> {
        let unit = config.unit;
        if !(unit.min_valid_temp()..=unit.max_valid_temp()).contains(&config.target_temp) {
            return Err(Error::Config("target_temp outside the unit's valid range"));
        }
        self.fermenters
            .insert(id, config)
            .map(|_| ())
            .map_err(|_| Error::CapacityExceeded)
    }

    /// Change the beer target of a known fermenter.
    pub fn set_target(&mut self, id: FermenterId, target_temp: f32) -> Result<()> {
        let cfg = self
            .fermenters
            .get_mut(&id)
            .ok_or(Error::UnknownFermenter(id))?;
        let unit = cfg.unit;
        if !(unit.min_valid_temp()..=unit.max_valid_temp()).contains(&target_temp) {
            return Err(Error::Config("target_temp outside the unit's valid range"));
        }
        cfg.target_temp = target_temp;
        Ok(())
    }

    pub fn remove(&mut self, id: FermenterId) -> Option<FermenterConfig> {
        self.fermenters.remove(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = FermenterId> + '_ {
        self.fermenters.keys().copied()
    }
}

impl FermenterConfigPort for FermenterTable {
    fn fermenter(&self, id: FermenterId) -> core::result::Result<FermenterConfig, ConfigError> {
        self.fermenters.get(&id).copied().ok_or(ConfigError::NotFound)
    }
}
