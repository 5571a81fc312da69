//! Application boundary.
//!
//! - [`ports`]: traits the core consumes (firmware, attribute host).

pub mod ports;
