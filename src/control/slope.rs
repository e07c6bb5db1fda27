//! Beer-temperature slope over a fixed sample window.
//!
//! The slope is the change of the filtered beer temperature across the
//! last [`SLOPE_WINDOW`] ticks, in degrees per window.  It is not divided
//! by elapsed time: the window is counted in samples.

/// Length of the slope history ring.
pub const SLOPE_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeEstimator {
    history: [f32; SLOPE_WINDOW],
    index: usize,
    slope: f32,
}

impl SlopeEstimator {
    /// Fill the whole history with `beer`; the initial slope is zero.
    pub fn new(beer: f32) -> Self {
        Self {
            history: [beer; SLOPE_WINDOW],
            index: 0,
            slope: 0.0,
        }
    }

    /// Record the latest filtered beer temperature and recompute the slope.
    ///
    /// `history[index]` receives the sample, the slope becomes
    /// `history[index] - history[(index + 1) % 30]` (the oldest sample in
    /// the ring), then the index advances.
    pub fn update(&mut self, beer_filtered: f32) -> f32 {
        let i = self.index;
        self.history[i] = beer_filtered;
        self.slope = self.history[i] - self.history[(i + 1) % SLOPE_WINDOW];
        self.index = (i + 1) % SLOPE_WINDOW;
        self.slope
    }

    pub fn slope(&self) -> f32 {
        self.slope
    }

    /// Slot the next sample will be written to.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn history(&self) -> &[f32; SLOPE_WINDOW] {
        &self.history
    }
}
