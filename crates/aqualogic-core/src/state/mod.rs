//! Controller state
//!
//! Holds everything learned from the bus during one connection: the LED
//! bitmasks and the readings scraped from display updates and pump telemetry.

mod bits;
mod device;

pub use bits::{StateBit, StateSet};
pub use device::DeviceState;
