//! Control algorithms for one fermenter.
//!
//! | Module      | Responsibility                                  |
//! |-------------|-------------------------------------------------|
//! | `filter`    | 4-tap moving average of beer and chamber        |
//! | `slope`     | beer change over a 30-sample window             |
//! | `setpoint`  | chamber target from beer error, drifting gains  |
//! | `overshoot` | drift prediction and peak-driven self-tuning    |
//! | `session`   | the per-tick pipeline tying them together       |

pub mod filter;
pub mod overshoot;
pub mod session;
pub mod setpoint;
pub mod slope;

pub use session::{ControlSession, TickReport};
