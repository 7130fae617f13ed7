//! Southbay API service implementations.

mod auth;
mod people;
mod segmentations;
mod stores;
mod support;
mod users;

pub use auth::*;
pub use people::*;
pub use segmentations::*;
pub use stores::*;
pub use support::content_disposition_filename;
pub use users::*;
