//! # braillink-probe: interactive service probe
//!
//! Connects to a braille display service, takes a terminal slot, and
//! walks through key filtering and display writes while the user
//! presses keys on the device.

pub mod config;
pub mod probe;
