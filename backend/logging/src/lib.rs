//! Structured logging for roomscribe.
//!
//! Sets up the global `tracing` subscriber and scrubs credentials from
//! strings that are about to be logged.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogFormat, LogOptions};
pub use redact::redact_sensitive_data;
