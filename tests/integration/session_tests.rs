//! Integration tests for the ControlSession tick pipeline.
//!
//! Sensor → filter → setpoint → FSM → peak detector → actuators, driven
//! through mock ports with a hand-advanced clock.

use crate::mock_hw::{MIN_MS, MockClock, MockFermenters, MockHardware, RecordingSink, wiring};

use fermctl::Error;
use fermctl::app::events::ControlEvent;
use fermctl::config::{ControlConfig, FermenterId};
use fermctl::control::ControlSession;
use fermctl::control::overshoot::{
    GAIN_LIMITS, OvershootEstimator, PeakDetector, PeakKind, growth_factor,
};
use fermctl::fsm::{ControlState, PhaseTimers};

const TICK_MS: u64 = 10_000;
const F1: FermenterId = FermenterId(1);

struct Rig {
    hw: MockHardware,
    fermenters: MockFermenters,
    clock: MockClock,
    sink: RecordingSink,
}

impl Rig {
    fn new(target: f32, beer: f32, chamber: f32) -> Self {
        let mut hw = MockHardware::new();
        hw.set(1, beer, chamber);
        Self {
            hw,
            fermenters: MockFermenters::with(1, target),
            clock: MockClock::at(100 * MIN_MS),
            sink: RecordingSink::new(),
        }
    }

    fn start(&mut self) -> ControlSession {
        ControlSession::start(
            F1,
            ControlConfig::default(),
            &self.hw,
            &self.fermenters,
            &self.clock,
            &mut self.sink,
        )
        .expect("session starts")
    }

    fn tick(&mut self, s: &mut ControlSession) -> fermctl::Result<fermctl::control::TickReport> {
        self.clock.advance(TICK_MS);
        s.tick(&mut self.hw, &self.fermenters, &self.clock, &mut self.sink)
    }

    fn transitions(&self) -> Vec<(ControlState, ControlState)> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                ControlEvent::StateChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

// ── Scenario A: warm beer drives a full cooling cycle ─────────

#[test]
fn warm_beer_cools_then_idles_on_predicted_trough() {
    let mut rig = Rig::new(20.0, 25.0, 25.0);
    let mut s = rig.start();

    // Backdated timers open every dwell gate on the first tick.
    let first = rig.tick(&mut s).unwrap();
    assert_eq!(first.state, ControlState::Cooling);
    assert_eq!(first.chamber_target, 3.5, "clamped to the Celsius floor");
    assert!(rig.hw.cooler_on(1));
    assert!(!rig.hw.heater_on(1));

    let mut cooling_ticks = 0;
    loop {
        let r = rig.tick(&mut s).unwrap();
        if r.state == ControlState::Idle {
            break;
        }
        cooling_ticks += 1;
        assert!(cooling_ticks < 100, "cooling never ended");
    }

    // 25 - 5 °/min * t <= 3.5 - 0.5 first holds at t = 270 s.
    assert_eq!(cooling_ticks, 26);
    assert_eq!(
        rig.transitions(),
        vec![
            (ControlState::Idle, ControlState::Cooling),
            (ControlState::Cooling, ControlState::Idle),
        ]
    );
    assert!(!rig.hw.cooler_on(1));
    assert!(!rig.hw.heater_on(1));
    assert_eq!(s.peaks().negative_reference(), 3.5);
}

#[test]
fn flat_chamber_after_cooling_shrinks_cool_gain() {
    let mut rig = Rig::new(20.0, 25.0, 25.0);
    let mut s = rig.start();
    let before = s.overshoot().cool();
    while rig.tick(&mut s).unwrap().state != ControlState::Idle || s.tick_count() < 2 {}

    // A flat series is a local minimum; 25 lies far above 3.5 + 1.
    let adjusted: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            ControlEvent::OvershootAdjusted { adjustment, .. } => Some(*adjustment),
            _ => None,
        })
        .collect();
    assert_eq!(adjusted.len(), 1);
    assert_eq!(adjusted[0].kind, PeakKind::Negative);
    assert!((adjusted[0].factor - 0.5).abs() < 1e-6);
    assert!((s.overshoot().cool() - before * 0.5).abs() < 1e-5);
    assert!(!s.peaks().is_negative_armed());
}

#[test]
fn cold_beer_heats_then_idles_and_learns_from_the_peak() {
    let mut rig = Rig::new(20.0, 19.0, 20.0);
    let mut s = rig.start();

    // e = 1: chamber target 20 + 10 + 0.02 = 30.02, chamber 20 is 5 below.
    let first = rig.tick(&mut s).unwrap();
    assert_eq!(first.state, ControlState::Heating);
    assert!(rig.hw.heater_on(1));
    assert!(!rig.hw.cooler_on(1));

    // The heater lifts the chamber one degree per tick until the
    // predicted peak reaches the band midpoint.
    let mut chamber = 20.0f32;
    loop {
        chamber += 1.0;
        rig.hw.set(1, 19.0, chamber);
        if rig.tick(&mut s).unwrap().state == ControlState::Idle {
            break;
        }
        assert!(chamber < 60.0, "heating never ended");
    }
    assert_eq!(
        rig.transitions(),
        vec![
            (ControlState::Idle, ControlState::Heating),
            (ControlState::Heating, ControlState::Idle),
        ]
    );
    assert!(!rig.hw.heater_on(1));
    assert!(s.peaks().is_positive_armed());
    let reference = s.peaks().positive_reference();

    // Drift overshoots by four more degrees, then falls back.
    let drift = [1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0, 0.0];
    let mut adjustment = None;
    for d in drift {
        rig.hw.set(1, 19.0, chamber + d);
        let r = rig.tick(&mut s).unwrap();
        assert_eq!(r.state, ControlState::Idle);
        if let Some(a) = r.adjustments.first() {
            adjustment = Some(*a);
            break;
        }
    }

    let a = adjustment.expect("positive peak detected");
    assert_eq!(a.kind, PeakKind::Positive);
    // The filtered maximum of c+1..c+4, c+3 is c+3.
    assert_eq!(a.peak, chamber + 3.0);
    assert_eq!(s.peaks().last_positive_peak(), Some(chamber + 3.0));
    let excess = a.peak - (reference + 2.0);
    assert!(excess > 0.0);
    assert!((a.factor - growth_factor(excess)).abs() < 1e-6);
    let initial = ControlConfig::default().initial_heat_overshoot;
    assert!((s.overshoot().heat() - initial * a.factor).abs() < 1e-6);
    assert!(!s.peaks().is_positive_armed());
}

// ── Rewiring and vanished configuration ──────────────────────

#[test]
fn rewired_cooler_is_switched_off() {
    let mut rig = Rig::new(20.0, 25.0, 25.0);
    let mut s = rig.start();
    assert_eq!(rig.tick(&mut s).unwrap().state, ControlState::Cooling);
    let old = wiring(1).cooler;
    assert_eq!(rig.hw.is_on(old), Some(true));

    let new = fermctl::config::ActuatorId(99);
    if let Some(c) = rig.fermenters.configs.get_mut(&F1) {
        c.cooler_id = Some(new);
    }
    rig.tick(&mut s).unwrap();
    assert_eq!(rig.hw.is_on(old), Some(false));
    assert_eq!(rig.hw.is_on(new), Some(true));

    s.shutdown(&mut rig.hw);
    assert_eq!(rig.hw.is_on(old), Some(false));
    assert_eq!(rig.hw.is_on(new), Some(false));
}

#[test]
fn removed_heater_id_is_switched_off() {
    let mut rig = Rig::new(20.0, 19.0, 20.0);
    let mut s = rig.start();
    assert_eq!(rig.tick(&mut s).unwrap().state, ControlState::Heating);
    if let Some(c) = rig.fermenters.configs.get_mut(&F1) {
        c.heater_id = None;
    }
    rig.tick(&mut s).unwrap();
    assert!(!rig.hw.heater_on(1));
}

#[test]
fn vanished_config_forces_outputs_off() {
    let mut rig = Rig::new(20.0, 25.0, 25.0);
    let mut s = rig.start();
    rig.tick(&mut s).unwrap();
    assert!(rig.hw.cooler_on(1));

    rig.fermenters.configs.clear();
    assert_eq!(rig.tick(&mut s).unwrap_err(), Error::UnknownFermenter(F1));
    assert!(!rig.hw.cooler_on(1));
    assert!(!rig.hw.heater_on(1));
}

// ── Scenario B: lost thermometer forces outputs off ──────────

#[test]
fn lost_chamber_sensor_while_cooling_forces_outputs_off() {
    let mut rig = Rig::new(20.0, 25.0, 25.0);
    let mut s = rig.start();
    assert_eq!(rig.tick(&mut s).unwrap().state, ControlState::Cooling);
    assert!(rig.hw.cooler_on(1));

    rig.hw.unplug(wiring(1).chamber);
    let err = rig.tick(&mut s).unwrap_err();
    assert_eq!(err, Error::NoThermometer(F1));
    assert!(!rig.hw.cooler_on(1));
    assert!(!rig.hw.heater_on(1));
    assert_eq!(
        rig.sink.events.last(),
        Some(&ControlEvent::NoThermometer { fermenter: F1 })
    );
}

#[test]
fn missing_beer_reading_prevents_start() {
    let mut rig = Rig::new(20.0, 25.0, 25.0);
    rig.hw.unplug(wiring(1).beer);
    let r = ControlSession::start(
        F1,
        ControlConfig::default(),
        &rig.hw,
        &rig.fermenters,
        &rig.clock,
        &mut rig.sink,
    );
    assert_eq!(r.err(), Some(Error::NoThermometer(F1)));
}

#[test]
fn unconfigured_beer_sensor_is_no_thermometer() {
    let mut rig = Rig::new(20.0, 20.0, 20.0);
    let mut s = rig.start();
    if let Some(c) = rig.fermenters.configs.get_mut(&F1) {
        c.sensor_id = None;
    }
    assert_eq!(rig.tick(&mut s).unwrap_err(), Error::NoThermometer(F1));
}

// ── Scenario C: clean maximum above band grows heat gain ─────

#[test]
fn clean_maximum_above_band_grows_heat_gain_by_documented_factor() {
    let config = ControlConfig::default();
    let mut est = OvershootEstimator::new(0.4, 5.0);
    let mut peaks = PeakDetector::new();
    peaks.record_heat_reference(18.0);
    peaks.arm_positive();

    let now = 500 * MIN_MS;
    let mut timers = PhaseTimers::new(now, 0);
    timers.stamp_heat(now - 2 * MIN_MS);
    timers.stamp_cool(now - 60 * MIN_MS);

    // Upper bound 20.0, peak 21.5: exceeded by 1.5.
    let filtered = [20.8, 21.3, 21.5, 21.4];
    let adj = peaks.scan(ControlState::Idle, &filtered, &timers, &config, &mut est);
    let factor = 1.2 + (1.5f32 * 0.03).min(0.3);
    assert_eq!(adj.len(), 1);
    assert!((adj[0].factor - factor).abs() < 1e-5);
    assert!((adj[0].factor - growth_factor(1.5)).abs() < 1e-6);
    assert!((est.heat() - 0.4 * factor).abs() < 1e-5);
    assert!(!peaks.is_positive_armed());
}

#[test]
fn maximum_half_a_degree_above_band() {
    let config = ControlConfig::default();
    let mut est = OvershootEstimator::new(1.0, 5.0);
    let mut peaks = PeakDetector::new();
    peaks.record_heat_reference(18.0);
    peaks.arm_positive();
    let timers = PhaseTimers::new(500 * MIN_MS, 1200);

    // 2.5 above the reference is 0.5 beyond the +2 upper bound.
    let adj = peaks.scan(ControlState::Idle, &[19.0, 20.0, 20.5, 20.2], &timers, &config, &mut est);
    assert!((adj[0].factor - 1.215).abs() < 1e-5);
}

#[test]
fn repeated_corrections_keep_gain_in_limits() {
    let config = ControlConfig::default();
    let mut est = OvershootEstimator::new(1.0, 1.0);
    let timers = PhaseTimers::new(500 * MIN_MS, 1200);
    for _ in 0..200 {
        let mut peaks = PeakDetector::new();
        peaks.record_heat_reference(18.0);
        peaks.arm_positive();
        let _ = peaks.scan(ControlState::Idle, &[0.0, 1.0, 2.0, 1.0], &timers, &config, &mut est);
    }
    assert!(est.heat() >= GAIN_LIMITS.0);
    assert!(est.heat() > 0.0);
}

// ── Scenario D: target edits keep the learned state ──────────

#[test]
fn target_change_keeps_filters_slope_and_estimators() {
    let mut a = Rig::new(20.0, 20.0, 20.0);
    let mut b = Rig::new(20.0, 20.0, 20.0);
    let mut sa = a.start();
    let mut sb = b.start();

    let readings = [(20.1, 19.8), (20.2, 19.9), (20.1, 20.3), (20.0, 20.1)];
    for (i, (beer, chamber)) in readings.iter().cycle().take(40).enumerate() {
        a.hw.set(1, *beer, *chamber);
        b.hw.set(1, *beer, *chamber);
        if i == 20 {
            b.fermenters.set_target(1, 20.3);
        }
        let ra = a.tick(&mut sa).unwrap();
        let rb = b.tick(&mut sb).unwrap();
        assert_eq!(ra.state, ControlState::Idle);
        assert_eq!(rb.state, ControlState::Idle);
    }

    assert_eq!(sa.filter(), sb.filter());
    assert_eq!(sa.slope(), sb.slope());
    assert_eq!(sa.overshoot(), sb.overshoot());
    assert_ne!(sa.chamber_target(), sb.chamber_target());
}

// ── Structural properties over a long run ─────────────────────

#[test]
fn idle_ticks_always_leave_outputs_off() {
    let mut rig = Rig::new(18.0, 22.0, 22.0);
    let mut s = rig.start();
    let mut chamber = 22.0f32;
    for n in 0..2_000 {
        // Crude plant: the chamber follows the active actuator.
        if rig.hw.cooler_on(1) {
            chamber -= 0.05;
        } else if rig.hw.heater_on(1) {
            chamber += 0.05;
        } else {
            chamber += 0.01;
        }
        let beer = 22.0 - (n as f32) * 0.002;
        rig.hw.set(1, beer, chamber);
        let r = rig.tick(&mut s).unwrap();
        if r.state == ControlState::Idle {
            assert!(!rig.hw.cooler_on(1) && !rig.hw.heater_on(1), "tick {n}");
        }
        let unit = fermctl::config::UnitSystem::Celsius;
        assert!((unit.min_valid_temp()..=unit.max_valid_temp()).contains(&r.chamber_target));
        assert!(s.overshoot().heat() > 0.0 && s.overshoot().cool() > 0.0);
    }
}
