//! Application service: the hexagonal core.
//!
//! [`FermentationService`] owns one [`ControlSession`] per fermenter under
//! automatic control.  It exposes a clean, hardware-agnostic API.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!       SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                      │     FermentationService      │
//!     ActuatorPort ◀── │  F1 session · F2 session ... │
//!                      └──────────────────────────────┘
//!  FermenterConfigPort ──▶        ▲ ClockPort
//! ```

use heapless::{FnvIndexMap, Vec};
use log::{debug, info, warn};

use crate::config::{ControlConfig, FermenterId};
use crate::control::session::ControlSession;
use crate::error::{Error, Result};

use super::commands::ControlCommand;
use super::events::ControlEvent;
use super::ports::{ActuatorPort, ClockPort, EventSink, FermenterConfigPort, SensorPort};

/// Upper bound on fermenters under automatic control at once.
pub const MAX_SESSIONS: usize = 8;

// ───────────────────────────────────────────────────────────────
// FermentationService
// ───────────────────────────────────────────────────────────────

pub struct FermentationService {
    config: ControlConfig,
    sessions: FnvIndexMap<FermenterId, ControlSession, MAX_SESSIONS>,
}

impl FermentationService {
    /// Construct the service.  `config` is validated when the first
    /// session starts.
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            sessions: FnvIndexMap::new(),
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Process a command from an external adapter.
    pub fn handle_command(
        &mut self,
        cmd: ControlCommand,
        hw: &mut (impl SensorPort + ActuatorPort),
        fermenters: &impl FermenterConfigPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            ControlCommand::EnableAutomatic(id) => self.enable(id, &*hw, fermenters, clock, sink),
            ControlCommand::DisableAutomatic(id) => {
                self.disable(id, hw, sink);
                Ok(())
            }
            ControlCommand::ToggleAutomatic(id) => {
                if self.is_automatic(id) {
                    self.disable(id, hw, sink);
                    Ok(())
                } else {
                    self.enable(id, &*hw, fermenters, clock, sink)
                }
            }
            ControlCommand::RestoreLearned(id, settings) => self
                .sessions
                .get_mut(&id)
                .ok_or(Error::UnknownFermenter(id))?
                .restore_learned(&settings),
        }
    }

    fn enable(
        &mut self,
        id: FermenterId,
        hw: &impl SensorPort,
        fermenters: &impl FermenterConfigPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if self.sessions.contains_key(&id) {
            debug!("{id}: automatic control already on");
            return Ok(());
        }
        if self.sessions.len() == MAX_SESSIONS {
            warn!("{id}: cannot enable, {MAX_SESSIONS} sessions running");
            return Err(Error::CapacityExceeded);
        }
        let session = ControlSession::start(id, self.config.clone(), hw, fermenters, clock, sink)?;
        if self.sessions.insert(id, session).is_err() {
            return Err(Error::CapacityExceeded);
        }
        sink.emit(&ControlEvent::AutomaticChanged {
            fermenter: id,
            enabled: true,
        });
        Ok(())
    }

    /// Stop a session unconditionally: outputs off, no further ticks.
    fn disable(&mut self, id: FermenterId, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let Some(mut session) = self.sessions.remove(&id) else {
            debug!("{id}: automatic control already off");
            return;
        };
        session.shutdown(hw);
        sink.emit(&ControlEvent::AutomaticChanged {
            fermenter: id,
            enabled: false,
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Tick every running session once.
    ///
    /// A session whose tick fails is stopped and its id returned; the
    /// others keep running.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        fermenters: &impl FermenterConfigPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Vec<FermenterId, MAX_SESSIONS> {
        let mut failed: Vec<FermenterId, MAX_SESSIONS> = Vec::new();

        for (id, session) in self.sessions.iter_mut() {
            match session.tick(hw, fermenters, clock, sink) {
                Ok(report) => debug!(
                    "{id}: {:?} beer {:.2} chamber {:.2} slope {:.3} -> {:.2}",
                    report.state,
                    report.beer_filtered,
                    report.chamber_filtered,
                    report.beer_slope,
                    report.chamber_target
                ),
                Err(e) => {
                    warn!("{id}: tick failed: {e}");
                    // Capacity equals the map's, so this cannot overflow.
                    let _ = failed.push(*id);
                }
            }
        }

        for id in &failed {
            info!("{id}: stopping automatic control after failure");
            self.disable(*id, hw, sink);
        }
        failed
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_automatic(&self, id: FermenterId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn session(&self, id: FermenterId) -> Option<&ControlSession> {
        self.sessions.get(&id)
    }

    /// Number of fermenters under automatic control.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of fermenters under automatic control, in start order.
    pub fn fermenters(&self) -> impl Iterator<Item = FermenterId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }
}
