//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                 |
//! |-------------|---------------------|-----------------------------|
//! | `hardware`  | SensorPort          | any sensor backend          |
//! |             | ActuatorPort        | any actuator backend        |
//! | `log_sink`  | EventSink           | `log` facade                |
//! | `memory`    | SensorPort          | in-memory reading cache     |
//! |             | FermenterConfigPort | in-memory fermenter table   |
//! | `relay`     | ActuatorPort        | `embedded-hal` output pins  |
//! | `time`      | ClockPort           | `std::time::Instant` / sim  |

pub mod hardware;
pub mod log_sink;
pub mod memory;
pub mod relay;
pub mod time;
