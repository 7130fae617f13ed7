//! Bulk spreadsheet uploads.
//!
//! Files are checked locally before any network call; see [`validate`].

mod file;
mod validator;

pub use file::*;
pub use validator::*;
