//! Relay outputs on `embedded-hal` GPIO pins.
//!
//! [`RelayBank`] maps [`ActuatorId`]s onto [`OutputPin`]s and implements
//! [`ActuatorPort`].  Relay boards differ in polarity, so each channel
//! records whether "on" drives the pin high or low.
//!
//! Pin write errors are logged and the channel's cached level is left
//! unknown so the next command retries; the control core never sees them.

use embedded_hal::digital::OutputPin;
use heapless::Vec;
use log::{info, warn};

use crate::app::ports::ActuatorPort;
use crate::config::ActuatorId;

/// Electrical level that switches a relay on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

struct Channel<P> {
    id: ActuatorId,
    pin: P,
    polarity: Polarity,
    /// Last level written successfully, `None` before the first write.
    on: Option<bool>,
}

/// Up to `N` relay channels.
pub struct RelayBank<P, const N: usize> {
    channels: Vec<Channel<P>, N>,
}

impl<P: OutputPin, const N: usize> Default for RelayBank<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin, const N: usize> RelayBank<P, N> {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Attach `pin` as actuator `id` and drive it off.
    ///
    /// Returns the pin back if the bank is full or `id` is taken.
    pub fn attach(&mut self, id: ActuatorId, pin: P, polarity: Polarity) -> Result<(), P> {
        if self.channels.iter().any(|c| c.id == id) {
            return Err(pin);
        }
        let channel = Channel {
            id,
            pin,
            polarity,
            on: None,
        };
        self.channels.push(channel).map_err(|c| c.pin)?;
        self.set_actuator(id, false);
        info!("relay {} attached ({:?})", id.0, polarity);
        Ok(())
    }

    /// Last level successfully written to `id`.
    pub fn is_on(&self, id: ActuatorId) -> Option<bool> {
        self.channels.iter().find(|c| c.id == id).and_then(|c| c.on)
    }

    /// Force every channel off.
    pub fn all_off(&mut self) {
        for i in 0..self.channels.len() {
            let id = self.channels[i].id;
            self.set_actuator(id, false);
        }
    }

    /// Access the pin of `id`, e.g. to inspect a mock.
    pub fn pin(&self, id: ActuatorId) -> Option<&P> {
        self.channels.iter().find(|c| c.id == id).map(|c| &c.pin)
    }
}

impl<P: OutputPin, const N: usize> ActuatorPort for RelayBank<P, N> {
    fn set_actuator(&mut self, id: ActuatorId, on: bool) {
        let Some(ch) = self.channels.iter_mut().find(|c| c.id == id) else {
            warn!("relay {} not attached", id.0);
            return;
        };
        if ch.on == Some(on) {
            return;
        }
        let high = match ch.polarity {
            Polarity::ActiveHigh => on,
            Polarity::ActiveLow => !on,
        };
        let res = if high { ch.pin.set_high() } else { ch.pin.set_low() };
        match res {
            Ok(()) => ch.on = Some(on),
            Err(e) => {
                warn!("relay {} write failed: {:?}", id.0, e);
                ch.on = None;
            }
        }
    }
}
