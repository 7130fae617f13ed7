//! Resilience patterns.

mod retry;

pub use retry::*;
