//! Outbound control events.
//!
//! Sessions and the service emit these through the
//! [`EventSink`](super::ports::EventSink) port.  The core never persists
//! or broadcasts anything itself; an outer layer turns these into
//! database writes and UI pushes.

use crate::config::FermenterId;
use crate::control::overshoot::EstimatorAdjustment;
use crate::fsm::ControlState;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// A new chamber target was computed (rounded to 2 decimals).
    ChamberTargetUpdated {
        fermenter: FermenterId,
        chamber_target: f32,
    },

    /// The state machine moved.
    StateChanged {
        fermenter: FermenterId,
        from: ControlState,
        to: ControlState,
    },

    /// The peak detector corrected an overshoot estimator.
    OvershootAdjusted {
        fermenter: FermenterId,
        adjustment: EstimatorAdjustment,
    },

    /// The beer thermometer is missing; automatic control stopped.
    NoThermometer { fermenter: FermenterId },

    /// Automatic control was switched on or off.
    AutomaticChanged { fermenter: FermenterId, enabled: bool },
}

impl ControlEvent {
    /// Fermenter this event concerns.
    pub fn fermenter(&self) -> FermenterId {
        match self {
            Self::ChamberTargetUpdated { fermenter, .. }
            | Self::StateChanged { fermenter, .. }
            | Self::OvershootAdjusted { fermenter, .. }
            | Self::NoThermometer { fermenter }
            | Self::AutomaticChanged { fermenter, .. } => *fermenter,
        }
    }
}
