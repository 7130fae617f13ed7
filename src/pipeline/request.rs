//! Request descriptors.

use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::config::SouthbayConfig;
use crate::core::{HttpMethod, HttpRequest, MultipartFile, RequestBody};
use crate::error::{NetworkError, ProtocolError, SouthbayResult};
use crate::resilience::RetryPolicy;

/// Immutable description of one API call. The pipeline may send it more
/// than once (retries, a post-refresh resend); it never changes.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: RequestBody,
    skip_auth_refresh: bool,
    retry: RetryPolicy,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            skip_auth_refresh: false,
            retry: RetryPolicy::default(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body.
    pub fn json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> SouthbayResult<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| NetworkError::RequestBuild {
            message: e.to_string(),
        })?;
        self.body = RequestBody::Json(Bytes::from(bytes));
        Ok(self)
    }

    /// Attach a single-file multipart body.
    pub fn multipart(mut self, file: MultipartFile) -> Self {
        self.body = RequestBody::Multipart(file);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Exclude this request from the session interceptors.
    pub fn skip_auth_refresh(mut self) -> Self {
        self.skip_auth_refresh = true;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn is_skip_auth_refresh(&self) -> bool {
        self.skip_auth_refresh
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Build the wire request, optionally with an `Authorization` value.
    pub fn to_http(
        &self,
        config: &SouthbayConfig,
        authorization: Option<&str>,
    ) -> SouthbayResult<HttpRequest> {
        let raw = config.url_for(&self.path);
        let mut url =
            Url::parse(&raw).map_err(|_| ProtocolError::InvalidUrl { url: raw.clone() })?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }

        let mut headers: HashMap<String, String> = HashMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        if matches!(self.body, RequestBody::Json(_)) {
            headers.insert("content-type".to_string(), "application/json".to_string());
        }
        for (name, value) in &self.headers {
            headers.insert(name.to_lowercase(), value.clone());
        }
        if let Some(authorization) = authorization {
            headers.insert("authorization".to_string(), authorization.to_string());
        }

        Ok(HttpRequest {
            method: self.method,
            url: url.to_string(),
            headers,
            body: self.body.clone(),
            timeout: Some(self.timeout.unwrap_or(config.timeout)),
        })
    }
}
