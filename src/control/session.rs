//! Per-fermenter control session.
//!
//! [`ControlSession`] owns every piece of state one fermenter's automatic
//! control needs and runs the tick pipeline:
//!
//! ```text
//!  config ─▶ sample ─▶ filter ─▶ slope ─▶ setpoint ─▶ FSM ─▶ peak scan ─▶ outputs
//!                │                             │        │         │
//!                └─ NoThermometer              └────────┴─────────┴──▶ EventSink
//! ```
//!
//! I/O flows through the port traits injected at each call; the session
//! itself holds no handles, so it is `Send` and sessions of different
//! fermenters can tick on different threads.

use heapless::Vec;
use log::{info, warn};

use crate::app::events::ControlEvent;
use crate::app::ports::{
    ActuatorPort, ClockPort, ConfigError, EventSink, FermenterConfigPort, SensorPort,
};
use crate::config::{ControlConfig, FermenterConfig, FermenterId};
use crate::error::{Error, Result};
use crate::fsm::states::build_state_table;
use crate::fsm::{ActuatorCommands, ControlState, Fsm, FsmContext, PhaseTimers, Readings};
use crate::settings::LearnedSettings;

use super::filter::TemperatureFilter;
use super::overshoot::{EstimatorAdjustment, OvershootEstimator, PeakDetector};
use super::setpoint::SetpointComputer;
use super::slope::SlopeEstimator;

/// Outcome of one successful tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub state: ControlState,
    pub chamber_target: f32,
    pub beer_filtered: f32,
    pub chamber_filtered: f32,
    pub beer_slope: f32,
    /// Estimator corrections made this tick.
    pub adjustments: Vec<EstimatorAdjustment, 2>,
}

/// Raw temperatures of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    beer: f32,
    chamber: f32,
}

pub struct ControlSession {
    fermenter: FermenterId,
    fsm: Fsm,
    ctx: FsmContext,
    filter: TemperatureFilter,
    slope: SlopeEstimator,
    setpoint: SetpointComputer,
    /// Configuration seen on the last successful lookup; names the
    /// actuators to release on shutdown.
    last_config: FermenterConfig,
    last_tick_ms: u64,
    tick_count: u64,
}

impl ControlSession {
    /// Create a session seeded from the current readings.
    ///
    /// Every filter slot and the whole slope history take the instantaneous
    /// values, the gain pair follows `target < beer`, and the phase timers
    /// are backdated so the first tick may leave IDLE at once.
    pub fn start(
        fermenter: FermenterId,
        config: ControlConfig,
        sensors: &impl SensorPort,
        fermenters: &impl FermenterConfigPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<Self> {
        config.validate()?;
        let fcfg = lookup(fermenters, fermenter)?;
        let Some(sample) = read_sample(&fcfg, sensors) else {
            warn!("{fermenter}: cannot start, no thermometer reading");
            sink.emit(&ControlEvent::NoThermometer { fermenter });
            return Err(Error::NoThermometer(fermenter));
        };

        let now = clock.now_ms();
        let target = fcfg.target_temp;
        let setpoint = SetpointComputer::new(&config, target, sample.beer);

        let mut ctx = FsmContext::new(config, now);
        ctx.readings = Readings {
            beer: sample.beer,
            chamber: sample.chamber,
            target,
            chamber_target: target,
        };
        let mut fsm = Fsm::new(build_state_table(), ControlState::Idle);
        fsm.start(&mut ctx);

        info!(
            "{fermenter}: automatic control started, beer {:.2} chamber {:.2} target {:.2} ({} gains)",
            sample.beer,
            sample.chamber,
            target,
            if target < sample.beer { "cool" } else { "heat" }
        );
        sink.emit(&ControlEvent::ChamberTargetUpdated {
            fermenter,
            chamber_target: target,
        });

        Ok(Self {
            fermenter,
            fsm,
            ctx,
            filter: TemperatureFilter::new(sample.beer, sample.chamber),
            slope: SlopeEstimator::new(sample.beer),
            setpoint,
            last_config: fcfg,
            last_tick_ms: now,
            tick_count: 0,
        })
    }

    /// Run one control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    ///
    /// A missing thermometer forces both actuators off, emits
    /// [`ControlEvent::NoThermometer`] and returns
    /// [`Error::NoThermometer`]; a vanished fermenter config also forces
    /// both off.  The caller is expected to stop the session either way.
    ///
    /// Actuator ids the live config no longer names are switched off
    /// before anything else runs.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        fermenters: &impl FermenterConfigPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<TickReport> {
        let fermenter = self.fermenter;
        self.tick_count += 1;

        // 1. Clock
        let now = clock.now_ms();
        let gap_ms = now.saturating_sub(self.last_tick_ms);
        if gap_ms > u64::from(self.ctx.config.stale_tick_warn_secs) * 1000 {
            warn!("{fermenter}: {}s since previous tick", gap_ms / 1000);
        }
        self.last_tick_ms = now;
        self.ctx.timers.set_now(now);

        // 2. Live configuration
        let fcfg = match lookup(fermenters, fermenter) {
            Ok(fcfg) => fcfg,
            Err(e) => {
                warn!("{fermenter}: configuration lookup failed, outputs off");
                self.release(hw);
                return Err(e);
            }
        };
        self.release_unwired(hw, &fcfg);
        if fcfg.target_temp != self.last_config.target_temp {
            info!(
                "{fermenter}: target changed {:.2} -> {:.2}",
                self.last_config.target_temp, fcfg.target_temp
            );
        }
        self.last_config = fcfg;

        // 3. Sample
        let Some(sample) = read_sample(&fcfg, hw) else {
            warn!("{fermenter}: no thermometer reading, outputs off");
            self.release(hw);
            sink.emit(&ControlEvent::NoThermometer { fermenter });
            return Err(Error::NoThermometer(fermenter));
        };

        // 4. Filter and slope
        self.filter.update(sample.beer, sample.chamber);
        let beer = self.filter.beer();
        let beer_slope = self.slope.update(beer);

        // 5. Setpoint
        let target = fcfg.target_temp;
        let chamber_target =
            self.setpoint
                .recompute(&self.ctx.config, target, beer, beer_slope, fcfg.unit);
        sink.emit(&ControlEvent::ChamberTargetUpdated {
            fermenter,
            chamber_target,
        });

        // 6. State machine
        self.ctx.readings = Readings {
            beer,
            chamber: sample.chamber,
            target,
            chamber_target,
        };
        let prev = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        let state = self.fsm.current_state();
        if state != prev {
            sink.emit(&ControlEvent::StateChanged {
                fermenter,
                from: prev,
                to: state,
            });
        }

        // 7. Peak detection
        let ctx = &mut self.ctx;
        let adjustments = ctx.peaks.scan(
            state,
            self.filter.chamber_channel().filtered_history(),
            &ctx.timers,
            &ctx.config,
            &mut ctx.overshoot,
        );
        for adjustment in &adjustments {
            sink.emit(&ControlEvent::OvershootAdjusted {
                fermenter,
                adjustment: *adjustment,
            });
        }

        // 8. Outputs follow the state alone.
        self.apply(hw, ActuatorCommands::for_state(state));

        Ok(TickReport {
            state,
            chamber_target,
            beer_filtered: beer,
            chamber_filtered: self.filter.chamber(),
            beer_slope,
            adjustments,
        })
    }

    /// Force both actuators off.  The session should be dropped afterwards.
    pub fn shutdown(&mut self, hw: &mut impl ActuatorPort) {
        info!("{}: automatic control stopped", self.fermenter);
        self.release(hw);
    }

    /// Snapshot of the learned overshoot gains.
    pub fn learned(&self) -> LearnedSettings {
        LearnedSettings::from_estimator(&self.ctx.overshoot)
    }

    /// Replace the overshoot gains with a previously learned snapshot.
    pub fn restore_learned(&mut self, settings: &LearnedSettings) -> Result<()> {
        self.ctx.overshoot = settings.to_estimator()?;
        info!(
            "{}: restored overshoot gains heat {:.4} cool {:.4}",
            self.fermenter, settings.heat_overshoot, settings.cool_overshoot
        );
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn fermenter(&self) -> FermenterId {
        self.fermenter
    }

    pub fn state(&self) -> ControlState {
        self.fsm.current_state()
    }

    pub fn chamber_target(&self) -> f32 {
        self.setpoint.chamber_target()
    }

    pub fn filter(&self) -> &TemperatureFilter {
        &self.filter
    }

    pub fn slope(&self) -> &SlopeEstimator {
        &self.slope
    }

    pub fn setpoint(&self) -> &SetpointComputer {
        &self.setpoint
    }

    pub fn overshoot(&self) -> &OvershootEstimator {
        &self.ctx.overshoot
    }

    pub fn peaks(&self) -> &PeakDetector {
        &self.ctx.peaks
    }

    pub fn timers(&self) -> &PhaseTimers {
        &self.ctx.timers
    }

    pub fn config(&self) -> &ControlConfig {
        &self.ctx.config
    }

    /// Ticks run since start, including failed ones.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn release(&mut self, hw: &mut impl ActuatorPort) {
        self.ctx.commands = ActuatorCommands::all_off();
        self.apply(hw, ActuatorCommands::all_off());
    }

    /// Switch off actuators the new config no longer names.
    fn release_unwired(&self, hw: &mut impl ActuatorPort, fcfg: &FermenterConfig) {
        let pairs = [
            (self.last_config.heater_id, fcfg.heater_id),
            (self.last_config.cooler_id, fcfg.cooler_id),
        ];
        for (old, new) in pairs {
            if let Some(id) = old.filter(|id| Some(*id) != new) {
                info!("{}: actuator {} unwired, switching off", self.fermenter, id.0);
                hw.set_actuator(id, false);
            }
        }
    }

    /// Translate commands into port calls, skipping unconfigured actuators.
    fn apply(&self, hw: &mut impl ActuatorPort, cmds: ActuatorCommands) {
        if let Some(id) = self.last_config.heater_id {
            hw.set_actuator(id, cmds.heater);
        }
        if let Some(id) = self.last_config.cooler_id {
            hw.set_actuator(id, cmds.cooler);
        }
    }
}

fn lookup(fermenters: &impl FermenterConfigPort, id: FermenterId) -> Result<FermenterConfig> {
    fermenters.fermenter(id).map_err(|e| match e {
        ConfigError::NotFound => Error::UnknownFermenter(id),
        other => other.into(),
    })
}

/// Beer reading is mandatory.  A configured chamber sensor must report;
/// without one the beer reading stands in for the chamber.
fn read_sample(fcfg: &FermenterConfig, sensors: &impl SensorPort) -> Option<Sample> {
    let read = |id| sensors.read_temperature(id).filter(|t: &f32| t.is_finite());
    let beer = read(fcfg.sensor_id?)?;
    let chamber = match fcfg.chamber_sensor_id {
        Some(id) => read(id)?,
        None => beer,
    };
    Some(Sample { beer, chamber })
}
