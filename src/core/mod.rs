//! Core Components
//!
//! HTTP transport abstraction shared by the pipeline and the refresher.

pub mod transport;

pub use transport::*;
