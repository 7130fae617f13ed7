//! Configuration module for the Southbay admin client.
//!
//! Provides the API base URL, timeouts, upload limits and the endpoint
//! paths. Paths are configuration so a deployment can remap them without
//! touching the services.

use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, SouthbayResult};

/// Default request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum upload size in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// API endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub initiate_password_reset: String,
    pub verify_password_reset_token: String,
    pub password_reset: String,
    pub users_me: String,
    pub users: String,
    pub users_me_password: String,
    pub stores: String,
    pub stores_export: String,
    pub stores_upload: String,
    pub people: String,
    pub people_export: String,
    pub people_upload: String,
    pub segmentations: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            refresh: "/auth/refresh".to_string(),
            logout: "/auth/logout".to_string(),
            initiate_password_reset: "/auth/initiate/password/reset".to_string(),
            verify_password_reset_token: "/auth/password/reset/verify-token".to_string(),
            password_reset: "/auth/password/reset".to_string(),
            users_me: "/v1/users/me".to_string(),
            users: "/v1/users".to_string(),
            users_me_password: "/v1/users/me/password".to_string(),
            stores: "/v1/stores".to_string(),
            stores_export: "/v1/stores/export".to_string(),
            stores_upload: "/v1/stores/upload".to_string(),
            people: "/v1/people".to_string(),
            people_export: "/v1/people/export".to_string(),
            people_upload: "/v1/people/upload".to_string(),
            segmentations: "/v1/segmentations".to_string(),
        }
    }
}

impl Endpoints {
    /// Paths whose requests never trigger a session refresh.
    pub fn auth_excluded(&self) -> [&str; 5] {
        [
            self.login.as_str(),
            self.refresh.as_str(),
            self.initiate_password_reset.as_str(),
            self.verify_password_reset_token.as_str(),
            self.password_reset.as_str(),
        ]
    }

    /// Check whether a request path targets an authentication endpoint.
    /// Matching is a case-insensitive substring test.
    pub fn is_auth_path(&self, path: &str) -> bool {
        let path = path.to_lowercase();
        self.auth_excluded()
            .iter()
            .any(|excluded| path.contains(&excluded.to_lowercase()))
    }

    pub fn store(&self, id: u64) -> String {
        format!("{}/{}", self.stores, id)
    }

    pub fn person(&self, id: u64) -> String {
        format!("{}/{}", self.people, id)
    }

    pub fn segmentation(&self, id: u64) -> String {
        format!("{}/{}", self.segmentations, id)
    }

    pub fn user(&self, id: u64) -> String {
        format!("{}/{}", self.users, id)
    }
}

/// Configuration for the Southbay admin client.
#[derive(Clone)]
pub struct SouthbayConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum accepted upload size in megabytes.
    pub max_upload_mb: u64,
    /// Whether cookies are written with the `Secure` attribute.
    pub secure_context: bool,
    /// Whether the session interceptors run. Hosts without a session
    /// (batch tools, health probes) switch them off.
    pub interceptors_enabled: bool,
    /// Endpoint paths.
    pub endpoints: Endpoints,
}

impl SouthbayConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SouthbayConfigBuilder {
        SouthbayConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SOUTHBAY_BASE_URL` (required): API base URL
    /// - `SOUTHBAY_TIMEOUT_SECS` (optional): request timeout in seconds
    /// - `SOUTHBAY_MAX_UPLOAD_MB` (optional): upload size limit
    /// - `SOUTHBAY_SECURE_CONTEXT` (optional): `true`/`false`, defaults to
    ///   whether the base URL is https
    pub fn from_env() -> SouthbayResult<Self> {
        let base_url = std::env::var("SOUTHBAY_BASE_URL").map_err(|_| {
            ConfigurationError::MissingRequired {
                field: "SOUTHBAY_BASE_URL".to_string(),
            }
        })?;

        let mut builder = SouthbayConfigBuilder::new().base_url(base_url);

        if let Ok(timeout_str) = std::env::var("SOUTHBAY_TIMEOUT_SECS") {
            let secs = parse_env_value::<u64>("SOUTHBAY_TIMEOUT_SECS", &timeout_str)?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Ok(max_str) = std::env::var("SOUTHBAY_MAX_UPLOAD_MB") {
            builder = builder.max_upload_mb(parse_env_value("SOUTHBAY_MAX_UPLOAD_MB", &max_str)?);
        }

        if let Ok(secure_str) = std::env::var("SOUTHBAY_SECURE_CONTEXT") {
            builder =
                builder.secure_context(parse_env_value("SOUTHBAY_SECURE_CONTEXT", &secure_str)?);
        }

        builder.build()
    }

    /// Returns the full URL for an API path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}

impl std::fmt::Debug for SouthbayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SouthbayConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_upload_mb", &self.max_upload_mb)
            .field("secure_context", &self.secure_context)
            .field("interceptors_enabled", &self.interceptors_enabled)
            .finish_non_exhaustive()
    }
}

fn parse_env_value<T: std::str::FromStr>(field: &str, raw: &str) -> SouthbayResult<T> {
    raw.trim().parse::<T>().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            message: format!("cannot parse '{}'", raw),
        }
        .into()
    })
}

/// Builder for `SouthbayConfig`.
#[derive(Default)]
pub struct SouthbayConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    max_upload_mb: Option<u64>,
    secure_context: Option<bool>,
    interceptors_enabled: Option<bool>,
    endpoints: Option<Endpoints>,
}

impl SouthbayConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the upload size limit in megabytes.
    pub fn max_upload_mb(mut self, max_upload_mb: u64) -> Self {
        self.max_upload_mb = Some(max_upload_mb);
        self
    }

    /// Overrides the cookie `Secure` flag.
    pub fn secure_context(mut self, secure: bool) -> Self {
        self.secure_context = Some(secure);
        self
    }

    /// Enables or disables the session interceptors.
    pub fn interceptors_enabled(mut self, enabled: bool) -> Self {
        self.interceptors_enabled = Some(enabled);
        self
    }

    /// Replaces the endpoint paths.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SouthbayResult<SouthbayConfig> {
        let raw = self.base_url.ok_or_else(|| ConfigurationError::MissingRequired {
            field: "base_url".to_string(),
        })?;

        let parsed = Url::parse(raw.trim())
            .map_err(|_| ConfigurationError::InvalidBaseUrl { url: raw.clone() })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidBaseUrl { url: raw }.into());
        }

        let base_url = raw.trim().trim_end_matches('/').to_string();

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                field: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(SouthbayConfig {
            secure_context: self
                .secure_context
                .unwrap_or_else(|| parsed.scheme() == "https"),
            base_url,
            timeout,
            max_upload_mb: self.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB),
            interceptors_enabled: self.interceptors_enabled.unwrap_or(true),
            endpoints: self.endpoints.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder_defaults() {
        let config = SouthbayConfig::builder()
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_upload_mb, 10);
        assert!(!config.secure_context);
        assert!(config.interceptors_enabled);
        assert_eq!(config.url_for("/v1/stores"), "http://localhost:8080/v1/stores");
    }

    #[test]
    fn test_secure_context_follows_scheme() {
        let config = SouthbayConfig::builder()
            .base_url("https://admin.southbay.example")
            .build()
            .unwrap();
        assert!(config.secure_context);

        let config = SouthbayConfig::builder()
            .base_url("https://admin.southbay.example")
            .secure_context(false)
            .build()
            .unwrap();
        assert!(!config.secure_context);
    }

    #[test]
    fn test_config_requires_base_url() {
        assert!(SouthbayConfig::builder().build().is_err());
        assert!(SouthbayConfig::builder().base_url("not a url").build().is_err());
        assert!(SouthbayConfig::builder().base_url("ftp://files.example").build().is_err());
    }

    #[test]
    fn test_auth_path_matching_is_case_insensitive() {
        let endpoints = Endpoints::default();
        assert!(endpoints.is_auth_path("/auth/login"));
        assert!(endpoints.is_auth_path("/AUTH/Refresh"));
        assert!(endpoints.is_auth_path("/auth/password/reset/verify-token"));
        assert!(!endpoints.is_auth_path("/auth/logout"));
        assert!(!endpoints.is_auth_path("/v1/stores"));
    }

    #[test]
    fn test_resource_paths() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.store(7), "/v1/stores/7");
        assert_eq!(endpoints.segmentation(3), "/v1/segmentations/3");
    }
}
