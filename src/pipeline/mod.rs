//! Request pipeline: immutable request descriptors and the executor that
//! runs them through the session interceptors.

mod executor;
mod request;

pub use executor::*;
pub use request::*;
