//! Inbound commands to the fermentation service.
//!
//! These represent actions requested by the outside world (REST handler,
//! UI button, scheduler) that the
//! [`FermentationService`](super::service::FermentationService) acts upon.

use crate::config::FermenterId;
use crate::settings::LearnedSettings;

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Start automatic control of a fermenter (no-op if already running).
    EnableAutomatic(FermenterId),

    /// Stop automatic control and force both actuators off.
    DisableAutomatic(FermenterId),

    /// Flip automatic control on or off.
    ToggleAutomatic(FermenterId),

    /// Seed a running session with previously learned overshoot gains.
    RestoreLearned(FermenterId, LearnedSettings),
}
