//! Shared utilities for the Tangle storage tools.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat, ParseLogFormatError};
pub use time::format_duration;
