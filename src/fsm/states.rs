//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers over the shared
//! [`FsmContext`](super::FsmContext).
//!
//! ```text
//!            [chamber > setpoint+5, beer > target+0.5, dwell ok]
//!   IDLE ─────────────────────────────────────────────────▶ COOLING
//!    ▲ ▲                                                       │
//!    │ └───────────────[predicted trough ≤ band]───────────────┘
//!    │
//!    │     [chamber < setpoint-5, beer < target-0.5, dwell ok]
//!    ├─────────────────────────────────────────────────▶ HEATING
//!    └─────────────────[predicted peak ≥ band]─────────────────┘
//! ```

use super::context::{ActuatorCommands, FsmContext};
use super::{ControlState, StateDescriptor};
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per session.
pub fn build_state_table() -> [StateDescriptor; ControlState::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: ControlState::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Heating
        StateDescriptor {
            id: ControlState::Heating,
            name: "Heating",
            on_enter: Some(heating_enter),
            on_exit: Some(heating_exit),
            on_update: heating_update,
        },
        // Index 2: Cooling
        StateDescriptor {
            id: ControlState::Cooling,
            name: "Cooling",
            on_enter: Some(cooling_enter),
            on_exit: Some(cooling_exit),
            on_update: cooling_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands = ActuatorCommands::all_off();
    debug!("IDLE: heater and cooler off");
}

fn idle_update(ctx: &mut FsmContext) -> Option<ControlState> {
    let now = ctx.timers.now_ms();
    ctx.timers.stamp_idle(now);

    let r = ctx.readings;
    let cfg = &ctx.config;
    let dwell = &cfg.dwell;

    // Short-cycle guard: a direction whose peak is still being watched
    // needs its dwell window before either actuator may start again.
    let cool_rested =
        ctx.timers.cooled_longer_ago_than(dwell.after_cool_secs) || !ctx.peaks.is_negative_armed();
    let heat_rested =
        ctx.timers.heated_longer_ago_than(dwell.after_heat_secs) || !ctx.peaks.is_positive_armed();
    let rested = cool_rested && heat_rested;

    if r.chamber > r.chamber_target + cfg.idle_range_high
        && r.beer > r.target + cfg.beer_idle_band
        && rested
    {
        info!(
            "IDLE: chamber {:.2} above {:.2}, beer {:.2} above {:.2} -> cooling",
            r.chamber,
            r.chamber_target + cfg.idle_range_high,
            r.beer,
            r.target + cfg.beer_idle_band
        );
        return Some(ControlState::Cooling);
    }

    if r.chamber < r.chamber_target + cfg.idle_range_low
        && r.beer < r.target - cfg.beer_idle_band
        && rested
    {
        info!(
            "IDLE: chamber {:.2} below {:.2}, beer {:.2} below {:.2} -> heating",
            r.chamber,
            r.chamber_target + cfg.idle_range_low,
            r.beer,
            r.target - cfg.beer_idle_band
        );
        return Some(ControlState::Heating);
    }

    // A peak found this long after the phase is ambient drift.
    if ctx.peaks.is_negative_armed() && ctx.timers.cooled_longer_ago_than(dwell.neg_peak_timeout_secs) {
        debug!("IDLE: negative peak detection timed out");
        ctx.peaks.disarm_negative();
    }
    if ctx.peaks.is_positive_armed() && ctx.timers.heated_longer_ago_than(dwell.pos_peak_timeout_secs) {
        debug!("IDLE: positive peak detection timed out");
        ctx.peaks.disarm_positive();
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLING state
// ═══════════════════════════════════════════════════════════════════════════

fn cooling_enter(ctx: &mut FsmContext) {
    ctx.commands = ActuatorCommands::for_state(ControlState::Cooling);
    info!("COOLING: cooler on, cool overshoot {:.4}", ctx.overshoot.cool());
}

/// Drop the cooler before whatever state comes next.
fn cooling_exit(ctx: &mut FsmContext) {
    ctx.commands.cooler = false;
    debug!(
        "COOLING: cooler off after {}s",
        ctx.timers.since_idle_ms() / 1000
    );
}

fn cooling_update(ctx: &mut FsmContext) -> Option<ControlState> {
    let now = ctx.timers.now_ms();
    ctx.timers.stamp_cool(now);
    ctx.peaks.arm_negative();

    let r = ctx.readings;
    let cooling_secs = ctx.timers.since_idle_ms() as f32 / 1000.0;
    let trough = ctx.overshoot.predicted_cool_trough(
        r.chamber,
        cooling_secs,
        ctx.config.max_cool_time_for_estimate_secs,
    );
    let stop_at = r.chamber_target + ctx.config.cooling_target.midpoint();

    if trough <= stop_at {
        ctx.peaks.record_cool_reference(r.chamber_target);
        info!(
            "COOLING: predicted trough {:.2} <= {:.2} after {:.0}s -> idle",
            trough, stop_at, cooling_secs
        );
        return Some(ControlState::Idle);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HEATING state
// ═══════════════════════════════════════════════════════════════════════════

fn heating_enter(ctx: &mut FsmContext) {
    ctx.commands = ActuatorCommands::for_state(ControlState::Heating);
    info!("HEATING: heater on, heat overshoot {:.4}", ctx.overshoot.heat());
}

fn heating_exit(ctx: &mut FsmContext) {
    ctx.commands.heater = false;
    debug!(
        "HEATING: heater off after {}s",
        ctx.timers.since_idle_ms() / 1000
    );
}

fn heating_update(ctx: &mut FsmContext) -> Option<ControlState> {
    let now = ctx.timers.now_ms();
    ctx.timers.stamp_heat(now);
    ctx.peaks.arm_positive();

    let r = ctx.readings;
    let heating_secs = ctx.timers.since_idle_ms() as f32 / 1000.0;
    let peak = ctx.overshoot.predicted_heat_peak(
        r.chamber,
        heating_secs,
        ctx.config.max_heat_time_for_estimate_secs,
    );
    let stop_at = r.chamber_target + ctx.config.heating_target.midpoint();

    if peak >= stop_at {
        ctx.peaks.record_heat_reference(r.chamber_target);
        info!(
            "HEATING: predicted peak {:.2} >= {:.2} after {:.0}s -> idle",
            peak, stop_at, heating_secs
        );
        return Some(ControlState::Idle);
    }

    None
}
