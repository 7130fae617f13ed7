//! Southbay API types.

mod api;
mod auth;
mod beneficiary;
mod segmentation;
mod status;
mod store;
mod user;

pub use api::*;
pub use auth::*;
pub use beneficiary::*;
pub use segmentation::*;
pub use status::*;
pub use store::*;
pub use user::*;
