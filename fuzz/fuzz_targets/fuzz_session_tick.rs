//! Fuzz target: control session tick pipeline
//!
//! Interprets the input as a sequence of (beer, chamber, target, gap)
//! samples, including NaN and infinite readings, and drives one session
//! through them.  Verifies:
//! - No panics
//! - Both actuators are never on together
//! - IDLE always leaves both actuators off
//! - A failed tick leaves both actuators off
//!
//! cargo fuzz run fuzz_session_tick

#![no_main]

use std::cell::Cell;

use fermctl::app::events::ControlEvent;
use fermctl::app::ports::{
    ActuatorPort, ClockPort, ConfigError, EventSink, FermenterConfigPort, SensorPort,
};
use fermctl::config::{ActuatorId, ControlConfig, FermenterConfig, FermenterId, SensorId, UnitSystem};
use fermctl::control::ControlSession;
use fermctl::fsm::ControlState;
use libfuzzer_sys::fuzz_target;

const BEER: SensorId = SensorId(0);
const CHAMBER: SensorId = SensorId(1);
const HEATER: ActuatorId = ActuatorId(2);
const COOLER: ActuatorId = ActuatorId(3);

#[derive(Default)]
struct Rig {
    beer: f32,
    chamber: f32,
    heater: bool,
    cooler: bool,
}

impl SensorPort for Rig {
    fn read_temperature(&self, id: SensorId) -> Option<f32> {
        match id {
            BEER => Some(self.beer),
            CHAMBER => Some(self.chamber),
            _ => None,
        }
    }
}

impl ActuatorPort for Rig {
    fn set_actuator(&mut self, id: ActuatorId, on: bool) {
        match id {
            HEATER => self.heater = on,
            COOLER => self.cooler = on,
            _ => {}
        }
    }
}

struct Table(Cell<f32>);

impl FermenterConfigPort for Table {
    fn fermenter(&self, _id: FermenterId) -> Result<FermenterConfig, ConfigError> {
        Ok(FermenterConfig {
            sensor_id: Some(BEER),
            chamber_sensor_id: Some(CHAMBER),
            heater_id: Some(HEATER),
            cooler_id: Some(COOLER),
            target_temp: self.0.get(),
            unit: UnitSystem::Celsius,
        })
    }
}

struct Clock(Cell<u64>);

impl ClockPort for Clock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &ControlEvent) {}
}

/// Map a byte to a temperature in [-10, 40], with a few non-finite codes.
fn temp(b: u8) -> f32 {
    match b {
        255 => f32::NAN,
        254 => f32::INFINITY,
        _ => -10.0 + f32::from(b) * 0.2,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut chunks = data.chunks_exact(4);
    let Some(first) = chunks.next() else {
        return;
    };

    let mut rig = Rig {
        beer: temp(first[0]),
        chamber: temp(first[1]),
        ..Rig::default()
    };
    let table = Table(Cell::new(2.0 + f32::from(first[2] % 28)));
    let clock = Clock(Cell::new(1_000_000));
    let mut sink = Discard;
    let Ok(mut session) = ControlSession::start(
        FermenterId(1),
        ControlConfig::default(),
        &rig,
        &table,
        &clock,
        &mut sink,
    ) else {
        return;
    };

    for c in chunks {
        rig.beer = temp(c[0]);
        rig.chamber = temp(c[1]);
        if c[2] < 8 {
            table.0.set(2.0 + f32::from(c[2]) * 3.0);
        }
        clock.0.set(clock.0.get() + 1_000 * u64::from(c[3]));

        match session.tick(&mut rig, &table, &clock, &mut sink) {
            Ok(report) => {
                assert!(!(rig.heater && rig.cooler));
                if report.state == ControlState::Idle {
                    assert!(!rig.heater && !rig.cooler);
                }
            }
            Err(_) => {
                assert!(!rig.heater && !rig.cooler);
                return;
            }
        }
    }
});
