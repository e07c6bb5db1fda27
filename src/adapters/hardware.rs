//! Hardware adapter: bridges a sensor source and an actuator sink to
//! the combined port bound the control core ticks against.
//!
//! [`ControlSession::tick`](crate::control::ControlSession::tick) takes one
//! `&mut (impl SensorPort + ActuatorPort)`.  In a deployment those are
//! usually two different things (a sensor cache filled by a poller, a
//! relay bank on GPIO); [`HardwareAdapter`] pairs them.

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::config::{ActuatorId, SensorId};

/// Concrete adapter that combines a sensor and an actuator backend.
pub struct HardwareAdapter<S, A> {
    pub sensors: S,
    pub actuators: A,
}

impl<S: SensorPort, A: ActuatorPort> HardwareAdapter<S, A> {
    pub fn new(sensors: S, actuators: A) -> Self {
        Self { sensors, actuators }
    }

    pub fn into_parts(self) -> (S, A) {
        (self.sensors, self.actuators)
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<S: SensorPort, A> SensorPort for HardwareAdapter<S, A> {
    fn read_temperature(&self, id: SensorId) -> Option<f32> {
        self.sensors.read_temperature(id)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<S, A: ActuatorPort> ActuatorPort for HardwareAdapter<S, A> {
    fn set_actuator(&mut self, id: ActuatorId, on: bool) {
        self.actuators.set_actuator(id, on);
    }
}
