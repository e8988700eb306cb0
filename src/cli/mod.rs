//! Command-line interface for jobscout.

mod commands;
pub mod icons;
pub mod progress;

pub use commands::{is_verbose, run};
