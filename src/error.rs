//! Unified error types for the fermentation control core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! service's error handling uniform.  All variants are `Copy` so they can
//! be passed through the per-tick pipeline without allocation.

use core::fmt;

use crate::config::FermenterId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The beer thermometer (or a configured chamber thermometer) is not
    /// defined or has no numeric reading.  Fatal for the session.
    NoThermometer(FermenterId),
    /// The configuration service does not know this fermenter.
    UnknownFermenter(FermenterId),
    /// Every session slot is occupied.
    CapacityExceeded,
    /// Control configuration is invalid.
    Config(&'static str),
    /// A learned-settings blob could not be used.
    Settings(SettingsError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoThermometer(id) => write!(f, "{id}: no thermometer defined"),
            Self::UnknownFermenter(id) => write!(f, "{id}: unknown fermenter"),
            Self::CapacityExceeded => write!(f, "session capacity exceeded"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Learned-settings errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// Blob failed to decode.
    Corrupted,
    /// Blob has an unsupported layout version.
    UnsupportedVersion(u8),
    /// An estimator gain is not finite or lies outside `GAIN_LIMITS`.
    InvalidGain,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "blob corrupted"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported version {v}"),
            Self::InvalidGain => write!(f, "estimator gain outside limits"),
        }
    }
}

impl From<SettingsError> for Error {
    fn from(e: SettingsError) -> Self {
        Self::Settings(e)
    }
}

impl From<crate::app::ports::ConfigError> for Error {
    fn from(e: crate::app::ports::ConfigError) -> Self {
        match e {
            crate::app::ports::ConfigError::ValidationFailed(msg) => Self::Config(msg),
            crate::app::ports::ConfigError::NotFound => Self::Config("not found"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
