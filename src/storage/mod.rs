//! Client-side persistence.
//!
//! The admin console keeps its session in browser local storage and a
//! cookie, and sends the user to the login screen when the session ends.
//! These traits give a host process the same three collaborators.

mod cookie;
mod local;
mod navigator;

pub use cookie::*;
pub use local::*;
pub use navigator::*;
