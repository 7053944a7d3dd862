//! Foundation module - shared utilities
//!
//! Small building blocks used by the runtime and by applications:
//! - Frame and elapsed-time measurement
//! - Logging utilities

pub mod logging;
pub mod time;
