//! Integration tests for the FermentationService command and tick paths.
//!
//! Verifies that automatic on/off, failure handling and learned-gain
//! restore work end to end against mock adapters.

use crate::mock_hw::{MockClock, MockFermenters, MockHardware, RecordingSink, wiring};

use fermctl::Error;
use fermctl::app::commands::ControlCommand;
use fermctl::app::events::ControlEvent;
use fermctl::app::service::{FermentationService, MAX_SESSIONS};
use fermctl::config::{ControlConfig, FermenterId};
use fermctl::fsm::ControlState;
use fermctl::settings::LearnedSettings;

struct Rig {
    svc: FermentationService,
    hw: MockHardware,
    fermenters: MockFermenters,
    clock: MockClock,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self {
            svc: FermentationService::new(ControlConfig::default()),
            hw: MockHardware::new(),
            fermenters: MockFermenters::default(),
            clock: MockClock::at(3_600_000),
            sink: RecordingSink::new(),
        }
    }

    /// Register fermenter `n` with readings and a target.
    fn add(&mut self, n: u16, target: f32, beer: f32, chamber: f32) {
        self.fermenters.insert(n, target);
        self.hw.set(n, beer, chamber);
    }

    fn cmd(&mut self, cmd: ControlCommand) -> fermctl::Result<()> {
        self.svc
            .handle_command(cmd, &mut self.hw, &self.fermenters, &self.clock, &mut self.sink)
    }

    fn tick(&mut self) -> Vec<FermenterId> {
        self.clock.advance(10_000);
        self.svc
            .tick(&mut self.hw, &self.fermenters, &self.clock, &mut self.sink)
            .into_iter()
            .collect()
    }
}

#[test]
fn enable_starts_session_and_emits_event() {
    let mut rig = Rig::new();
    rig.add(1, 20.0, 20.0, 20.0);
    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(1)))
        .unwrap();
    assert!(rig.svc.is_automatic(FermenterId(1)));
    assert!(rig.sink.events.contains(&ControlEvent::AutomaticChanged {
        fermenter: FermenterId(1),
        enabled: true,
    }));

    // Enabling twice is a no-op.
    let before = rig.sink.events.len();
    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(1)))
        .unwrap();
    assert_eq!(rig.sink.events.len(), before);
    assert_eq!(rig.svc.len(), 1);
}

#[test]
fn enable_unknown_fermenter_fails() {
    let mut rig = Rig::new();
    let r = rig.cmd(ControlCommand::EnableAutomatic(FermenterId(9)));
    assert_eq!(r, Err(Error::UnknownFermenter(FermenterId(9))));
    assert!(rig.svc.is_empty());
}

#[test]
fn disable_forces_outputs_off_while_cooling() {
    let mut rig = Rig::new();
    rig.add(1, 18.0, 24.0, 24.0);
    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(1)))
        .unwrap();
    assert!(rig.tick().is_empty());
    assert_eq!(
        rig.svc.session(FermenterId(1)).map(|s| s.state()),
        Some(ControlState::Cooling)
    );
    assert!(rig.hw.cooler_on(1));

    rig.cmd(ControlCommand::DisableAutomatic(FermenterId(1)))
        .unwrap();
    assert!(!rig.svc.is_automatic(FermenterId(1)));
    assert!(!rig.hw.cooler_on(1));
    assert!(!rig.hw.heater_on(1));

    // No further ticking once disabled.
    let calls = rig.hw.calls.len();
    rig.tick();
    assert_eq!(rig.hw.calls.len(), calls);
}

#[test]
fn toggle_flips_automatic() {
    let mut rig = Rig::new();
    rig.add(2, 20.0, 20.0, 20.0);
    rig.cmd(ControlCommand::ToggleAutomatic(FermenterId(2)))
        .unwrap();
    assert!(rig.svc.is_automatic(FermenterId(2)));
    rig.cmd(ControlCommand::ToggleAutomatic(FermenterId(2)))
        .unwrap();
    assert!(!rig.svc.is_automatic(FermenterId(2)));
    assert_eq!(
        rig.sink.count(|e| matches!(e, ControlEvent::AutomaticChanged { .. })),
        2
    );
}

#[test]
fn failing_session_is_stopped_others_continue() {
    let mut rig = Rig::new();
    rig.add(1, 20.0, 20.0, 20.0);
    rig.add(2, 20.0, 20.0, 20.0);
    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(1)))
        .unwrap();
    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(2)))
        .unwrap();

    rig.hw.unplug(wiring(1).beer);
    let stopped = rig.tick();
    assert_eq!(stopped, vec![FermenterId(1)]);
    assert!(!rig.svc.is_automatic(FermenterId(1)));
    assert!(rig.svc.is_automatic(FermenterId(2)));
    assert!(rig.sink.events.contains(&ControlEvent::NoThermometer {
        fermenter: FermenterId(1)
    }));
    assert!(rig.sink.events.contains(&ControlEvent::AutomaticChanged {
        fermenter: FermenterId(1),
        enabled: false,
    }));
    assert!(rig.tick().is_empty());
}

#[test]
fn removed_fermenter_config_stops_session() {
    let mut rig = Rig::new();
    rig.add(1, 18.0, 24.0, 24.0);
    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(1)))
        .unwrap();
    rig.tick();
    assert!(rig.hw.cooler_on(1));

    rig.fermenters.configs.clear();
    assert_eq!(rig.tick(), vec![FermenterId(1)]);
    // Outputs named by the last known config are released.
    assert!(!rig.hw.cooler_on(1));
}

#[test]
fn capacity_is_bounded() {
    let mut rig = Rig::new();
    for n in 1..=MAX_SESSIONS as u16 + 1 {
        rig.add(n, 20.0, 20.0, 20.0);
    }
    for n in 1..=MAX_SESSIONS as u16 {
        rig.cmd(ControlCommand::EnableAutomatic(FermenterId(n)))
            .unwrap();
    }
    let extra = FermenterId(MAX_SESSIONS as u16 + 1);
    assert_eq!(
        rig.cmd(ControlCommand::EnableAutomatic(extra)),
        Err(Error::CapacityExceeded)
    );
    assert_eq!(rig.svc.len(), MAX_SESSIONS);
    assert_eq!(rig.svc.fermenters().next(), Some(FermenterId(1)));
}

#[test]
fn restore_learned_requires_running_session() {
    let mut rig = Rig::new();
    rig.add(1, 20.0, 20.0, 20.0);
    let learned = LearnedSettings {
        heat_overshoot: 0.5,
        cool_overshoot: 2.0,
    };
    assert_eq!(
        rig.cmd(ControlCommand::RestoreLearned(FermenterId(1), learned)),
        Err(Error::UnknownFermenter(FermenterId(1)))
    );

    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(1)))
        .unwrap();
    rig.cmd(ControlCommand::RestoreLearned(FermenterId(1), learned))
        .unwrap();
    let s = rig.svc.session(FermenterId(1)).unwrap();
    assert_eq!(s.learned(), learned);

    // The blob survives a postcard round trip into a fresh session.
    let blob = s.learned().to_bytes().unwrap();
    rig.cmd(ControlCommand::DisableAutomatic(FermenterId(1)))
        .unwrap();
    rig.cmd(ControlCommand::EnableAutomatic(FermenterId(1)))
        .unwrap();
    let decoded = LearnedSettings::from_bytes(&blob).unwrap();
    rig.cmd(ControlCommand::RestoreLearned(FermenterId(1), decoded))
        .unwrap();
    assert_eq!(rig.svc.session(FermenterId(1)).unwrap().learned(), learned);
}
