//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured control events to the
//! `log` facade (stderr via `env_logger` in the host binary).  A database
//! or websocket adapter would implement the same trait.

use log::{debug, info, warn};

use crate::app::events::ControlEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControlEvent`] as one line.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControlEvent) {
        self.emitted += 1;
        match event {
            ControlEvent::ChamberTargetUpdated {
                fermenter,
                chamber_target,
            } => {
                debug!("SETPT | {} chamber_target={:.2}", fermenter, chamber_target);
            }
            ControlEvent::StateChanged { fermenter, from, to } => {
                info!("STATE | {} {:?} -> {:?}", fermenter, from, to);
            }
            ControlEvent::OvershootAdjusted {
                fermenter,
                adjustment: a,
            } => {
                info!(
                    "LEARN | {} {:?}/{:?} peak={:.2} ref={:.2} x{:.3} gain={:.4}",
                    fermenter, a.kind, a.source, a.peak, a.reference, a.factor, a.gain
                );
            }
            ControlEvent::NoThermometer { fermenter } => {
                warn!("FAULT | {} no thermometer", fermenter);
            }
            ControlEvent::AutomaticChanged { fermenter, enabled } => {
                info!(
                    "AUTO  | {} {}",
                    fermenter,
                    if *enabled { "on" } else { "off" }
                );
            }
        }
    }
}
