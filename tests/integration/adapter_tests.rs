//! End-to-end tests through the shipped adapters.
//!
//! A [`SensorCache`] and an active-low [`RelayBank`] are paired by
//! [`HardwareAdapter`]; fermenters live in a [`FermenterTable`] and time is
//! a [`ManualClock`].  Events go to the [`LogEventSink`].

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use fermctl::adapters::hardware::HardwareAdapter;
use fermctl::adapters::log_sink::LogEventSink;
use fermctl::adapters::memory::{FermenterTable, SensorCache};
use fermctl::adapters::relay::{Polarity, RelayBank};
use fermctl::adapters::time::ManualClock;
use fermctl::app::commands::ControlCommand;
use fermctl::app::service::FermentationService;
use fermctl::config::{ActuatorId, ControlConfig, FermenterId};
use fermctl::fsm::ControlState;

use crate::mock_hw::{fermenter_config, wiring};

#[derive(Debug, Default)]
struct Pin {
    high: bool,
}

impl ErrorType for Pin {
    type Error = Infallible;
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

type Hw = HardwareAdapter<SensorCache, RelayBank<Pin, 4>>;

fn rig() -> Hw {
    let w = wiring(1);
    let mut relays = RelayBank::new();
    for id in [w.heater, w.cooler] {
        assert!(relays.attach(id, Pin::default(), Polarity::ActiveLow).is_ok());
    }
    HardwareAdapter::new(SensorCache::new(), relays)
}

fn pin_high(hw: &Hw, id: ActuatorId) -> bool {
    hw.actuators.pin(id).is_some_and(|p| p.high)
}

#[test]
fn cooling_drives_active_low_relay() {
    let w = wiring(1);
    let mut hw = rig();
    // Active-low relays idle high once attached.
    assert!(pin_high(&hw, w.cooler) && pin_high(&hw, w.heater));

    hw.sensors.record(w.beer, 24.0).unwrap();
    hw.sensors.record(w.chamber, 24.0).unwrap();
    let mut table = FermenterTable::new();
    table.upsert(FermenterId(1), fermenter_config(1, 18.0)).unwrap();
    let clock = ManualClock::new(0);
    let mut sink = LogEventSink::new();
    let mut svc = FermentationService::new(ControlConfig::default());

    svc.handle_command(
        ControlCommand::EnableAutomatic(FermenterId(1)),
        &mut hw,
        &table,
        &clock,
        &mut sink,
    )
    .unwrap();
    clock.advance_secs(10);
    assert!(svc.tick(&mut hw, &table, &clock, &mut sink).is_empty());

    assert_eq!(
        svc.session(FermenterId(1)).map(|s| s.state()),
        Some(ControlState::Cooling)
    );
    assert_eq!(hw.actuators.is_on(w.cooler), Some(true));
    assert!(!pin_high(&hw, w.cooler));
    assert!(pin_high(&hw, w.heater));
    assert!(sink.emitted() >= 3);
}

#[test]
fn cleared_probe_stops_session_and_releases_relays() {
    let w = wiring(1);
    let mut hw = rig();
    hw.sensors.record(w.beer, 24.0).unwrap();
    hw.sensors.record(w.chamber, 24.0).unwrap();
    let mut table = FermenterTable::new();
    table.upsert(FermenterId(1), fermenter_config(1, 18.0)).unwrap();
    let clock = ManualClock::new(0);
    let mut sink = LogEventSink::new();
    let mut svc = FermentationService::new(ControlConfig::default());
    svc.handle_command(
        ControlCommand::EnableAutomatic(FermenterId(1)),
        &mut hw,
        &table,
        &clock,
        &mut sink,
    )
    .unwrap();
    clock.advance_secs(10);
    svc.tick(&mut hw, &table, &clock, &mut sink);
    assert_eq!(hw.actuators.is_on(w.cooler), Some(true));

    hw.sensors.clear(w.beer);
    clock.advance_secs(10);
    let stopped = svc.tick(&mut hw, &table, &clock, &mut sink);
    assert_eq!(stopped.as_slice(), &[FermenterId(1)]);
    assert_eq!(hw.actuators.is_on(w.cooler), Some(false));
    assert_eq!(hw.actuators.is_on(w.heater), Some(false));

    let (sensors, _relays) = hw.into_parts();
    assert_eq!(
        fermctl::app::ports::SensorPort::read_temperature(&sensors, w.chamber),
        Some(24.0)
    );
}
