//! fermctl: host simulator for the fermentation control core.
//!
//! Runs every simulated fermenter on its own thread against a first-order
//! thermal model, in simulated time, and prints the learned overshoot
//! gains at the end.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                    │
//! │                                                           │
//! │  ThermalPlant       FermenterTable   ManualClock   LogSink │
//! │  (Sensor+Actuator)  (FermenterCfg)   (Clock)      (Events)│
//! │                                                           │
//! │  ───────────────── Port Trait Boundary ─────────────────  │
//! │                                                           │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │        FermentationService (pure logic)             │  │
//! │  │  Filter · Slope · Setpoint · FSM · Overshoot        │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `fermctl [--config control.json] [--hours 48]`
#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};

use fermctl::adapters::log_sink::LogEventSink;
use fermctl::adapters::memory::FermenterTable;
use fermctl::adapters::time::ManualClock;
use fermctl::app::commands::ControlCommand;
use fermctl::app::ports::{ActuatorPort, SensorPort};
use fermctl::app::service::FermentationService;
use fermctl::config::{ActuatorId, ControlConfig, FermenterConfig, FermenterId, SensorId, UnitSystem};
use fermctl::settings::LearnedSettings;

// ── Thermal model ─────────────────────────────────────────────

/// Chamber exchanges heat with ambient, beer and the active actuator;
/// beer only with the chamber.  Rates are per second.
struct ThermalPlant {
    beer_sensor: SensorId,
    chamber_sensor: SensorId,
    heater: ActuatorId,
    cooler: ActuatorId,
    beer: f32,
    chamber: f32,
    ambient: f32,
    heater_on: bool,
    cooler_on: bool,
}

const AMBIENT_COUPLING: f32 = 0.000_5;
const BEER_COUPLING: f32 = 0.002;
const BEER_RESPONSE: f32 = 0.000_3;
const HEAT_RATE: f32 = 0.01;
const COOL_RATE: f32 = 0.02;

impl ThermalPlant {
    fn step(&mut self, dt_secs: f32) {
        let mut drive = 0.0;
        if self.heater_on {
            drive += HEAT_RATE;
        }
        if self.cooler_on {
            drive -= COOL_RATE;
        }
        let d_chamber = AMBIENT_COUPLING * (self.ambient - self.chamber)
            + BEER_COUPLING * (self.beer - self.chamber)
            + drive;
        let d_beer = BEER_RESPONSE * (self.chamber - self.beer);
        self.chamber += d_chamber * dt_secs;
        self.beer += d_beer * dt_secs;
    }
}

impl SensorPort for ThermalPlant {
    fn read_temperature(&self, id: SensorId) -> Option<f32> {
        if id == self.beer_sensor {
            Some(self.beer)
        } else if id == self.chamber_sensor {
            Some(self.chamber)
        } else {
            None
        }
    }
}

impl ActuatorPort for ThermalPlant {
    fn set_actuator(&mut self, id: ActuatorId, on: bool) {
        if id == self.heater {
            self.heater_on = on;
        } else if id == self.cooler {
            self.cooler_on = on;
        }
    }
}

// ── Scenarios ─────────────────────────────────────────────────

struct Scenario {
    id: FermenterId,
    ambient: f32,
    start_beer: f32,
    target: f32,
    /// Target applied halfway through the run.
    second_target: f32,
}

static SCENARIOS: [Scenario; 2] = [
    Scenario {
        id: FermenterId(1),
        ambient: 24.0,
        start_beer: 23.0,
        target: 18.0,
        second_target: 16.0,
    },
    Scenario {
        id: FermenterId(2),
        ambient: 12.0,
        start_beer: 14.0,
        target: 20.0,
        second_target: 21.0,
    },
];

struct Summary {
    id: FermenterId,
    beer: f32,
    chamber: f32,
    learned: Option<LearnedSettings>,
    events: u64,
}

fn simulate(sc: &Scenario, config: &ControlConfig, hours: u32) -> Result<Summary> {
    let id = sc.id;
    let base = id.0 * 10;
    let mut plant = ThermalPlant {
        beer_sensor: SensorId(base),
        chamber_sensor: SensorId(base + 1),
        heater: ActuatorId(base + 2),
        cooler: ActuatorId(base + 3),
        beer: sc.start_beer,
        chamber: sc.ambient,
        ambient: sc.ambient,
        heater_on: false,
        cooler_on: false,
    };

    let mut table = FermenterTable::new();
    table.upsert(
        id,
        FermenterConfig {
            sensor_id: Some(plant.beer_sensor),
            chamber_sensor_id: Some(plant.chamber_sensor),
            heater_id: Some(plant.heater),
            cooler_id: Some(plant.cooler),
            target_temp: sc.target,
            unit: UnitSystem::Celsius,
        },
    )?;

    let clock = ManualClock::new(0);
    let mut sink = LogEventSink::new();
    let mut service = FermentationService::new(config.clone());
    service.handle_command(
        ControlCommand::EnableAutomatic(id),
        &mut plant,
        &table,
        &clock,
        &mut sink,
    )?;

    let tick_ms = u64::from(config.tick_interval_ms);
    let ticks = u64::from(hours) * 3_600_000 / tick_ms;
    let dt_secs = tick_ms as f32 / 1000.0;

    for n in 0..ticks {
        if n == ticks / 2 {
            table.set_target(id, sc.second_target)?;
        }
        clock.advance_ms(tick_ms);
        plant.step(dt_secs);
        let stopped = service.tick(&mut plant, &table, &clock, &mut sink);
        if !stopped.is_empty() {
            bail!("{id}: automatic control stopped after {n} ticks");
        }
    }

    let learned = service.session(id).map(|s| s.learned());
    service.handle_command(
        ControlCommand::DisableAutomatic(id),
        &mut plant,
        &table,
        &clock,
        &mut sink,
    )?;

    Ok(Summary {
        id,
        beer: plant.beer,
        chamber: plant.chamber,
        learned,
        events: sink.emitted(),
    })
}

// ── Entry point ───────────────────────────────────────────────

struct Options {
    config: ControlConfig,
    hours: u32,
}

fn parse_args() -> Result<Options> {
    let mut config = ControlConfig::default();
    let mut hours = 48;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {path}"))?;
                config = serde_json::from_str(&text).map_err(|e| anyhow!("parsing {path}: {e}"))?;
                info!("loaded control config from {path}");
            }
            "--hours" => {
                let v = args.next().context("--hours needs a value")?;
                hours = v.parse().with_context(|| format!("invalid --hours {v}"))?;
            }
            other => bail!("unknown argument {other}"),
        }
    }
    config.validate().map_err(|e| anyhow!("invalid control config: {e}"))?;
    Ok(Options { config, hours })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_args()?;
    info!(
        "simulating {} fermenters for {} h at {} ms per tick",
        SCENARIOS.len(),
        opts.hours,
        opts.config.tick_interval_ms
    );

    let summaries = std::thread::scope(|s| {
        let handles: Vec<_> = SCENARIOS
            .iter()
            .map(|sc| {
                let config = &opts.config;
                s.spawn(move || simulate(sc, config, opts.hours))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(summary) => summary,
                Err(_) => Err(anyhow!("simulation thread panicked")),
            })
            .collect::<Result<Vec<_>>>()
    })?;

    for s in &summaries {
        match s.learned {
            Some(l) => info!(
                "{}: beer {:.2} chamber {:.2} | heat overshoot {:.4} cool overshoot {:.4} | {} events",
                s.id, s.beer, s.chamber, l.heat_overshoot, l.cool_overshoot, s.events
            ),
            None => warn!("{}: session ended early", s.id),
        }
    }
    Ok(())
}
