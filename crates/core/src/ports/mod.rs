//! Ports for time and identifiers
//!
//! The store never reads the system clock directly, so tests can drive
//! ids and note timestamps deterministically.

mod clock;
mod id_gen;

pub use clock::{Clock, ManualClock, SystemClock};
pub use id_gen::{IdGenerator, TimestampIdGenerator};
