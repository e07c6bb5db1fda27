//! Temperature input filter.
//!
//! Each thermometer feeds a 4-sample shift register of raw readings; the
//! filtered value is the arithmetic mean of those 4 samples (a 4-tap
//! moving-average low-pass).  Filtered values are kept in a second shift
//! register so the peak detector can look at the last few points.
//!
//! Both registers are seeded with the first reading, so they are always
//! fully populated.

/// Number of taps of the moving-average filter.
pub const FILTER_TAPS: usize = 4;

/// Fixed-size shift register, oldest at index 0 and newest at `N - 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftRegister<const N: usize> {
    values: [f32; N],
}

impl<const N: usize> ShiftRegister<N> {
    /// Every slot set to `value`.
    pub fn filled(value: f32) -> Self {
        Self { values: [value; N] }
    }

    /// Shift left by one and append `value` at the newest slot.
    pub fn push(&mut self, value: f32) {
        self.values.copy_within(1.., 0);
        self.values[N - 1] = value;
    }

    pub fn latest(&self) -> f32 {
        self.values[N - 1]
    }

    /// Arithmetic mean of every slot.
    pub fn mean(&self) -> f32 {
        self.values.iter().sum::<f32>() / N as f32
    }

    pub fn as_array(&self) -> &[f32; N] {
        &self.values
    }
}

/// Raw and filtered history of one thermometer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureChannel {
    raw: ShiftRegister<FILTER_TAPS>,
    filtered: ShiftRegister<FILTER_TAPS>,
}

impl TemperatureChannel {
    pub fn seeded(value: f32) -> Self {
        Self {
            raw: ShiftRegister::filled(value),
            filtered: ShiftRegister::filled(value),
        }
    }

    pub fn update(&mut self, raw: f32) {
        self.raw.push(raw);
        let mean = self.raw.mean();
        self.filtered.push(mean);
    }

    /// Latest filtered value.
    pub fn filtered(&self) -> f32 {
        self.filtered.latest()
    }

    pub fn raw_history(&self) -> &[f32; FILTER_TAPS] {
        self.raw.as_array()
    }

    pub fn filtered_history(&self) -> &[f32; FILTER_TAPS] {
        self.filtered.as_array()
    }
}

/// Beer and chamber filters of one control session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureFilter {
    beer: TemperatureChannel,
    chamber: TemperatureChannel,
}

impl TemperatureFilter {
    /// Seed every slot of both channels from the instantaneous readings.
    pub fn new(beer: f32, chamber: f32) -> Self {
        Self {
            beer: TemperatureChannel::seeded(beer),
            chamber: TemperatureChannel::seeded(chamber),
        }
    }

    pub fn update(&mut self, raw_beer: f32, raw_chamber: f32) {
        self.chamber.update(raw_chamber);
        self.beer.update(raw_beer);
    }

    /// Latest filtered beer temperature.
    pub fn beer(&self) -> f32 {
        self.beer.filtered()
    }

    /// Latest filtered chamber temperature.
    pub fn chamber(&self) -> f32 {
        self.chamber.filtered()
    }

    pub fn beer_channel(&self) -> &TemperatureChannel {
        &self.beer
    }

    pub fn chamber_channel(&self) -> &TemperatureChannel {
        &self.chamber
    }
}
