//! Telemetry
//!
//! Structured logging setup. The crate itself only emits `tracing` events
//! and spans; hosts decide where they go.

pub mod logging;

pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
