//! Session Tokens
//!
//! Token persistence, expiry checks and single-flight refresh.

mod claims;
mod refresh;
mod store;

pub use claims::*;
pub use refresh::*;
pub use store::*;
