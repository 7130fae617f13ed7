//! Southbay Admin API Integration
//!
//! Async client for the Southbay employee-discount administration API.
//!
//! # Features
//!
//! - **Session handling**: access and refresh tokens persisted through
//!   pluggable local storage and cookie backends
//! - **Single-flight refresh**: concurrent requests that find the session
//!   stale share one refresh call
//! - **Interceptors**: bearer header on every request, one transparent
//!   resend after a 401, login redirect when the session cannot be renewed
//! - **Bulk uploads**: `.xlsx` files validated locally (type, size, header
//!   row, data rows) before anything is sent
//! - **Resources**: stores, people, segmentations, users and password
//!   management, with paginated listing and spreadsheet export
//!
//! # Example
//!
//! ```no_run
//! use integrations_southbay_admin::{SouthbayClient, SouthbayConfig, UploadFile};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SouthbayClient::new(SouthbayConfig::from_env()?)?;
//!
//! let file = UploadFile::from_path("tiendas.xlsx").await?;
//! match client.stores().upload(file).await {
//!     Ok(receipt) => println!("import queued: {:?}", receipt.job_id),
//!     Err(error) => eprintln!("{}", error.user_message()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `token`: token store, JWT expiry decoding, refresh coordinator
//! - `pipeline`: request descriptors and the interceptor pipeline
//! - `core`: HTTP transport abstraction (reqwest and mock)
//! - `storage`: local storage, cookie jar and navigator collaborators
//! - `upload`: spreadsheet validation
//! - `services`: typed resource operations
//! - `client`: wires everything into one session-owning client

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod pagination;
pub mod password;
pub mod pipeline;
pub mod resilience;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod token;
pub mod types;
pub mod upload;

pub use client::{SouthbayClient, SouthbayClientBuilder};

pub use config::{Endpoints, SouthbayConfig, SouthbayConfigBuilder};

pub use error::{
    ApiError, ApiErrorResponse, AuthenticationError, ConfigurationError, NetworkError,
    ProtocolError, RequestError, SouthbayError, SouthbayResult, StorageError,
    UploadValidationError,
};

pub use core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

pub use pagination::{ListParams, Page};

pub use password::{check_password_policy, evaluate_password_policy, PasswordPolicyStatus};

pub use pipeline::{ApiRequest, AuthPipeline};

pub use services::{
    content_disposition_filename, AuthService, PasswordResetVerification, PeopleService,
    SegmentationsService, StoresService, UsersService,
};

pub use storage::{
    Cookie, CookieJar, FileCookieJar, FileLocalStorage, InMemoryCookieJar, InMemoryLocalStorage,
    LocalStorage, Navigator, NoopNavigator, RecordingNavigator,
};

pub use token::{RefreshCoordinator, TokenRefresher, TokenStore};

pub use types::*;

pub use upload::{UploadFile, UploadValidator, PEOPLE_UPLOAD_HEADERS, STORE_UPLOAD_HEADERS};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::SouthbayClient;
    pub use crate::config::SouthbayConfig;
    pub use crate::error::{SouthbayError, SouthbayResult};
    pub use crate::pagination::{ListParams, Page};
    pub use crate::types::{EntityStatus, StoredAuthTokens};
    pub use crate::upload::UploadFile;
}
