//! Overshoot estimation and peak detection.
//!
//! When a heater or cooler is switched off the chamber keeps drifting for a
//! while.  The [`OvershootEstimator`] holds one gain per direction, in
//! degrees of drift per minute of active time, which the state machine uses
//! to end an active phase early enough that the drift lands inside the
//! target band.
//!
//! The [`PeakDetector`] closes the loop.  After a phase ends it watches the
//! filtered chamber temperature for the extremum the drift produces and
//! compares it to the band around the chamber target recorded when the
//! phase ended:
//!
//! ```text
//!   peak above band  ──▶ gain × (1.2 … 1.5)   (estimate was too low)
//!   peak below band  ──▶ gain × (0.5 … 0.8)   (estimate was too high)
//!   peak inside band ──▶ unchanged
//! ```
//!
//! Exactly one correction (or none) is made per phase; the detector then
//! disarms until the next phase of the same direction.

use heapless::Vec;
use log::info;

use crate::config::{ControlConfig, TargetBand};
use crate::fsm::{ControlState, PhaseTimers};

use super::filter::FILTER_TAPS;

/// Base multiplier when an estimate was too low.
const GROWTH_BASE: f32 = 1.2;
/// Base multiplier when an estimate was too high.
const SHRINK_BASE: f32 = 0.8;
/// Extra correction per degree outside the band.
const CORRECTION_PER_DEGREE: f32 = 0.03;
/// Cap on the extra correction.
const CORRECTION_LIMIT: f32 = 0.3;

/// Estimator gains never leave this range, so repeated corrections can
/// neither underflow to zero nor overflow.
pub const GAIN_LIMITS: (f32, f32) = (1e-4, 100.0);

/// Largest factor a single correction may apply.
pub const MAX_GROWTH_FACTOR: f32 = GROWTH_BASE + CORRECTION_LIMIT;
/// Smallest factor a single correction may apply.
pub const MIN_SHRINK_FACTOR: f32 = SHRINK_BASE - CORRECTION_LIMIT;

/// Multiplier for a peak `excess` degrees beyond the band (excess ≥ 0).
pub fn growth_factor(excess: f32) -> f32 {
    GROWTH_BASE + (excess * CORRECTION_PER_DEGREE).min(CORRECTION_LIMIT)
}

/// Multiplier for a peak `shortfall` degrees short of the band (shortfall ≥ 0).
pub fn shrink_factor(shortfall: f32) -> f32 {
    SHRINK_BASE + (-shortfall * CORRECTION_PER_DEGREE).max(-CORRECTION_LIMIT)
}

// ---------------------------------------------------------------------------
// Adjustment record
// ---------------------------------------------------------------------------

/// Which phase a peak follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakKind {
    /// Maximum after heating; tunes the heat estimator.
    Positive,
    /// Minimum after cooling; tunes the cool estimator.
    Negative,
}

/// How the peak was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakSource {
    /// A clean local extremum in the filtered chamber series.
    LocalExtremum,
    /// No extremum; the chamber drifted past the band after the dwell time.
    Drift,
}

/// One correction applied to an overshoot estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorAdjustment {
    pub kind: PeakKind,
    pub source: PeakSource,
    /// Chamber temperature taken as the peak.
    pub peak: f32,
    /// Chamber target recorded when the active phase ended.
    pub reference: f32,
    /// Multiplier applied.
    pub factor: f32,
    /// Estimator value after the correction.
    pub gain: f32,
}

// ---------------------------------------------------------------------------
// OvershootEstimator
// ---------------------------------------------------------------------------

/// Learned drift gains, strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvershootEstimator {
    heat: f32,
    cool: f32,
}

impl OvershootEstimator {
    pub fn new(heat: f32, cool: f32) -> Self {
        debug_assert!(heat > 0.0 && cool > 0.0);
        Self { heat, cool }
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(config.initial_heat_overshoot, config.initial_cool_overshoot)
    }

    pub fn heat(&self) -> f32 {
        self.heat
    }

    pub fn cool(&self) -> f32 {
        self.cool
    }

    /// Chamber temperature expected once heating drift settles.
    ///
    /// `heating_secs` is capped at `cap_secs` before scaling.
    pub fn predicted_heat_peak(&self, chamber: f32, heating_secs: f32, cap_secs: u32) -> f32 {
        chamber + self.heat * heating_secs.min(cap_secs as f32) / 60.0
    }

    /// Chamber temperature expected once cooling drift settles.
    pub fn predicted_cool_trough(&self, chamber: f32, cooling_secs: f32, cap_secs: u32) -> f32 {
        chamber - self.cool * cooling_secs.min(cap_secs as f32) / 60.0
    }

    fn scale(&mut self, kind: PeakKind, factor: f32) -> f32 {
        let gain = match kind {
            PeakKind::Positive => &mut self.heat,
            PeakKind::Negative => &mut self.cool,
        };
        *gain = (*gain * factor).clamp(GAIN_LIMITS.0, GAIN_LIMITS.1);
        *gain
    }
}

// ---------------------------------------------------------------------------
// PeakDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeakDetector {
    positive_armed: bool,
    negative_armed: bool,
    /// Chamber target snapshot when the last heating phase ended.
    positive_reference: f32,
    /// Chamber target snapshot when the last cooling phase ended.
    negative_reference: f32,
    last_positive_peak: Option<f32>,
    last_negative_peak: Option<f32>,
}

impl PeakDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_positive(&mut self) {
        self.positive_armed = true;
    }

    pub fn arm_negative(&mut self) {
        self.negative_armed = true;
    }

    pub fn disarm_positive(&mut self) {
        self.positive_armed = false;
    }

    pub fn disarm_negative(&mut self) {
        self.negative_armed = false;
    }

    pub fn is_positive_armed(&self) -> bool {
        self.positive_armed
    }

    pub fn is_negative_armed(&self) -> bool {
        self.negative_armed
    }

    /// Record the chamber target at the moment a heating phase ended.
    pub fn record_heat_reference(&mut self, chamber_target: f32) {
        self.positive_reference = chamber_target;
    }

    /// Record the chamber target at the moment a cooling phase ended.
    pub fn record_cool_reference(&mut self, chamber_target: f32) {
        self.negative_reference = chamber_target;
    }

    pub fn positive_reference(&self) -> f32 {
        self.positive_reference
    }

    pub fn negative_reference(&self) -> f32 {
        self.negative_reference
    }

    pub fn last_positive_peak(&self) -> Option<f32> {
        self.last_positive_peak
    }

    pub fn last_negative_peak(&self) -> Option<f32> {
        self.last_negative_peak
    }

    /// Look for the peak of the drift that follows an active phase and
    /// correct `estimator` accordingly.
    ///
    /// `filtered` is the filtered chamber history, newest last.  Positive
    /// detection is skipped while heating, negative while cooling.
    pub fn scan(
        &mut self,
        state: ControlState,
        filtered: &[f32; FILTER_TAPS],
        timers: &PhaseTimers,
        config: &ControlConfig,
        estimator: &mut OvershootEstimator,
    ) -> Vec<EstimatorAdjustment, 2> {
        let mut out = Vec::new();
        if self.positive_armed && state != ControlState::Heating {
            if let Some(adj) = self.scan_positive(filtered, timers, config, estimator) {
                let _ = out.push(adj);
            }
        }
        if self.negative_armed && state != ControlState::Cooling {
            if let Some(adj) = self.scan_negative(filtered, timers, config, estimator) {
                let _ = out.push(adj);
            }
        }
        out
    }

    fn scan_positive(
        &mut self,
        f: &[f32; FILTER_TAPS],
        timers: &PhaseTimers,
        config: &ControlConfig,
        estimator: &mut OvershootEstimator,
    ) -> Option<EstimatorAdjustment> {
        let TargetBand { lower, upper } = config.heating_target;
        let upper = self.positive_reference + upper;
        let lower = self.positive_reference + lower;

        if f[3] <= f[2] && f[2] >= f[1] {
            let peak = f[2];
            self.last_positive_peak = Some(peak);
            self.positive_armed = false;
            let factor = if peak > upper {
                growth_factor(peak - upper)
            } else if peak < lower {
                shrink_factor(lower - peak)
            } else {
                return None;
            };
            return Some(self.apply(PeakKind::Positive, PeakSource::LocalExtremum, peak, factor, estimator));
        }

        let dwell = &config.dwell;
        if timers.heated_longer_ago_than(dwell.heat_drift_after_heat_secs)
            && timers.cooled_longer_ago_than(dwell.heat_drift_after_cool_secs)
            && f[3] < lower
        {
            // No peak and still below the band: heating ended too early.
            let peak = f[3];
            self.last_positive_peak = Some(peak);
            self.positive_armed = false;
            let factor = shrink_factor(lower - peak);
            return Some(self.apply(PeakKind::Positive, PeakSource::Drift, peak, factor, estimator));
        }
        None
    }

    fn scan_negative(
        &mut self,
        f: &[f32; FILTER_TAPS],
        timers: &PhaseTimers,
        config: &ControlConfig,
        estimator: &mut OvershootEstimator,
    ) -> Option<EstimatorAdjustment> {
        let TargetBand { lower, upper } = config.cooling_target;
        let upper = self.negative_reference + upper;
        let lower = self.negative_reference + lower;

        if f[3] >= f[2] && f[2] <= f[1] {
            let peak = f[2];
            self.last_negative_peak = Some(peak);
            self.negative_armed = false;
            let factor = if peak < lower {
                growth_factor(lower - peak)
            } else if peak > upper {
                shrink_factor(peak - upper)
            } else {
                return None;
            };
            return Some(self.apply(PeakKind::Negative, PeakSource::LocalExtremum, peak, factor, estimator));
        }

        let dwell = &config.dwell;
        if timers.cooled_longer_ago_than(dwell.cool_drift_after_cool_secs)
            && timers.heated_longer_ago_than(dwell.cool_drift_after_heat_secs)
            && f[3] > upper
        {
            let peak = f[3];
            self.last_negative_peak = Some(peak);
            self.negative_armed = false;
            let factor = shrink_factor(peak - upper);
            return Some(self.apply(PeakKind::Negative, PeakSource::Drift, peak, factor, estimator));
        }
        None
    }

    fn apply(
        &self,
        kind: PeakKind,
        source: PeakSource,
        peak: f32,
        factor: f32,
        estimator: &mut OvershootEstimator,
    ) -> EstimatorAdjustment {
        let reference = match kind {
            PeakKind::Positive => self.positive_reference,
            PeakKind::Negative => self.negative_reference,
        };
        let gain = estimator.scale(kind, factor);
        info!(
            "overshoot: {:?} peak {:.2} vs reference {:.2} ({:?}) -> x{:.3}, gain {:.4}",
            kind, peak, reference, source, factor, gain
        );
        EstimatorAdjustment {
            kind,
            source,
            peak,
            reference,
            factor,
            gain,
        }
    }
}
