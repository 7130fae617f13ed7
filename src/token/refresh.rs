//! Token Refresh
//!
//! Exchanges the refresh token for a new session. However many requests
//! discover a stale token at once, only one exchange is in flight and every
//! caller receives its outcome.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::SouthbayConfig;
use crate::core::HttpTransport;
use crate::error::{ApiError, SouthbayResult};
use crate::pipeline::ApiRequest;
use crate::resilience::RetryPolicy;
use crate::types::{LoginTokensResponse, MaybeWrapped, StoredAuthTokens};

use super::store::TokenStore;

/// Performs the refresh-token exchange.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> SouthbayResult<LoginTokensResponse>;
}

/// Refresher calling the API's refresh endpoint directly on the transport,
/// outside the session interceptors.
pub struct HttpTokenRefresher {
    config: Arc<SouthbayConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl HttpTokenRefresher {
    pub fn new(config: Arc<SouthbayConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> SouthbayResult<LoginTokensResponse> {
        let request = ApiRequest::post(self.config.endpoints.refresh.as_str())
            .json(&serde_json::json!({ "refresh_token": refresh_token }))?
            .skip_auth_refresh()
            .retry(RetryPolicy::refresh());
        let http = request.to_http(&self.config, None)?;

        let response = request
            .retry_policy()
            .execute("refresh", |_| self.transport.send(http.clone()))
            .await?;

        if !response.is_success() {
            return Err(ApiError::from_response(response.status, &response.body).into());
        }

        Ok(response
            .json_body::<MaybeWrapped<LoginTokensResponse>>()?
            .into_inner())
    }
}

type RefreshOutcome = Option<StoredAuthTokens>;

struct PendingRefresh {
    generation: u64,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

/// Single-flight refresh coordinator.
///
/// One instance per client; the pending slot is not global, so tests and
/// multiple clients stay isolated.
pub struct RefreshCoordinator {
    store: Arc<TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
    generation: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<TokenStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            pending: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Refresh the session, joining an in-flight refresh when there is one.
    ///
    /// Resolves to the new tokens, or `None` after clearing the store when
    /// there is no refresh token or the exchange fails in any way.
    pub async fn trigger_refresh(&self) -> Option<StoredAuthTokens> {
        let outcome = self.pending_or_start();
        outcome.await
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refresh_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Number of refreshes started over the coordinator's lifetime.
    pub fn refreshes_started(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn pending_or_start(&self) -> Shared<BoxFuture<'static, RefreshOutcome>> {
        let mut pending = self.pending.lock();
        if let Some(in_flight) = pending.as_ref() {
            debug!(generation = in_flight.generation, "joining in-flight refresh");
            return in_flight.outcome.clone();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let store = Arc::clone(&self.store);
        let refresher = Arc::clone(&self.refresher);
        let slot = Arc::clone(&self.pending);

        let outcome = async move {
            let result = execute_refresh(&store, refresher.as_ref()).await;
            let mut pending = slot.lock();
            if pending.as_ref().is_some_and(|p| p.generation == generation) {
                *pending = None;
            }
            result
        }
        .boxed()
        .shared();

        *pending = Some(PendingRefresh {
            generation,
            outcome: outcome.clone(),
        });
        outcome
    }
}

#[instrument(skip_all)]
async fn execute_refresh(
    store: &TokenStore,
    refresher: &dyn TokenRefresher,
) -> Option<StoredAuthTokens> {
    let Some(refresh_token) = store.refresh_token() else {
        debug!("no refresh token, ending session");
        store.clear();
        return None;
    };

    let response = match refresher.refresh(&refresh_token).await {
        Ok(response) => response,
        Err(error) => {
            warn!(error = %error, "session refresh failed");
            store.clear();
            return None;
        }
    };

    if response.token.is_empty() {
        warn!("refresh response carried no access token");
        store.clear();
        return None;
    }

    let mut tokens = StoredAuthTokens::from(response);
    // Keep the current refresh token when the server does not rotate it.
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token);
    }

    if let Err(error) = store.write(&tokens) {
        warn!(error = %error, "failed to persist refreshed session");
    }
    info!("session refreshed");
    Some(tokens)
}
