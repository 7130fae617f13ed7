//! Authenticated request pipeline.
//!
//! Every API call goes through [`AuthPipeline::execute`], which applies the
//! session interceptors around the transport:
//!
//! - before sending, a stale access token is refreshed (single-flight) and
//!   the `Authorization` header attached;
//! - a 401 answer triggers one refresh and one resend; a second 401 ends
//!   the session.
//!
//! Authentication endpoints and requests flagged `skip_auth_refresh` bypass
//! both steps.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::SouthbayConfig;
use crate::core::{HttpResponse, HttpTransport};
use crate::error::{ApiError, SouthbayResult};
use crate::storage::Navigator;
use crate::token::{RefreshCoordinator, TokenStore};

use super::request::ApiRequest;

/// Initial send plus the resend after a refresh.
const MAX_AUTH_ATTEMPTS: u32 = 2;

/// Outcome of the request interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Authorization {
    /// Interceptors do not apply to this request.
    Bypassed,
    /// Header to attach; a 401 may still be recovered.
    Header(String),
    /// No session could be obtained; sent unauthenticated, never recovered.
    Unavailable,
}

/// Request pipeline with session interceptors.
pub struct AuthPipeline {
    config: Arc<SouthbayConfig>,
    transport: Arc<dyn HttpTransport>,
    store: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    navigator: Arc<dyn Navigator>,
}

impl AuthPipeline {
    pub fn new(
        config: Arc<SouthbayConfig>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            coordinator,
            navigator,
        }
    }

    pub fn config(&self) -> &SouthbayConfig {
        &self.config
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Execute a request. Non-2xx answers become [`ApiError`]s.
    #[instrument(
        name = "southbay.request",
        skip(self, request),
        fields(method = request.method().as_str(), path = request.path())
    )]
    pub async fn execute(&self, request: &ApiRequest) -> SouthbayResult<HttpResponse> {
        let (mut authorization, recoverable) = match self.authorize(request).await {
            Authorization::Header(header) => (Some(header), true),
            Authorization::Bypassed | Authorization::Unavailable => (None, false),
        };

        let mut attempt = 1;
        loop {
            let response = self.dispatch(request, authorization.as_deref(), attempt).await?;
            if response.status != 401 || !recoverable {
                return into_result(response);
            }

            if attempt >= MAX_AUTH_ATTEMPTS {
                warn!("request rejected after session refresh, ending session");
                self.end_session();
                return into_result(response);
            }

            match self.coordinator.trigger_refresh().await {
                Some(tokens) => {
                    debug!("session refreshed after 401, resending");
                    authorization = Some(tokens.authorization_header());
                    attempt += 1;
                }
                None => {
                    self.end_session();
                    return into_result(response);
                }
            }
        }
    }

    /// Execute and deserialize a JSON body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> SouthbayResult<T> {
        self.execute(request).await?.json_body()
    }

    /// Execute, discarding the body.
    pub async fn execute_empty(&self, request: &ApiRequest) -> SouthbayResult<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Clear the session and send the user to the login screen.
    pub fn end_session(&self) {
        self.store.clear();
        self.navigator.redirect_to_login();
    }

    fn intercepts(&self, request: &ApiRequest) -> bool {
        self.config.interceptors_enabled
            && !request.is_skip_auth_refresh()
            && !self.config.endpoints.is_auth_path(request.path())
    }

    async fn authorize(&self, request: &ApiRequest) -> Authorization {
        if !self.intercepts(request) {
            return Authorization::Bypassed;
        }

        if !self.store.is_access_token_valid() {
            debug!("access token stale, refreshing before send");
            return match self.coordinator.trigger_refresh().await {
                Some(tokens) => Authorization::Header(tokens.authorization_header()),
                None => {
                    self.end_session();
                    Authorization::Unavailable
                }
            };
        }

        match self.store.authorization_header() {
            Some(header) => Authorization::Header(header),
            None => Authorization::Unavailable,
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        authorization: Option<&str>,
        attempt: u32,
    ) -> SouthbayResult<HttpResponse> {
        let http = request.to_http(&self.config, authorization)?;
        debug!(attempt = attempt, authenticated = authorization.is_some(), "sending request");

        let response = request
            .retry_policy()
            .execute(request.path(), |_| self.transport.send(http.clone()))
            .await?;

        debug!(status = response.status, "received response");
        Ok(response)
    }
}

fn into_result(response: HttpResponse) -> SouthbayResult<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response.status, &response.body).into())
    }
}
