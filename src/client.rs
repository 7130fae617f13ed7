//! Southbay admin API client.

use std::sync::Arc;

use crate::config::SouthbayConfig;
use crate::core::{HttpTransport, ReqwestHttpTransport};
use crate::error::{ConfigurationError, SouthbayResult};
use crate::pipeline::AuthPipeline;
use crate::services::{
    AuthService, PeopleService, SegmentationsService, StoresService, UsersService,
};
use crate::storage::{
    CookieJar, InMemoryCookieJar, InMemoryLocalStorage, LocalStorage, Navigator, NoopNavigator,
};
use crate::token::{HttpTokenRefresher, RefreshCoordinator, TokenRefresher, TokenStore};

/// Southbay admin API client.
///
/// Owns one session: a token store, a refresh coordinator and the request
/// pipeline every service goes through. Clients never share session state.
///
/// # Example
///
/// ```no_run
/// use integrations_southbay_admin::{ListParams, SouthbayClient, SouthbayConfig};
/// use secrecy::SecretString;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SouthbayConfig::builder()
///     .base_url("https://admin-api.southbay.example")
///     .build()?;
/// let client = SouthbayClient::new(config)?;
///
/// client
///     .auth()
///     .login("ops@southbay.example", &SecretString::new("Clave#2024".into()))
///     .await?;
/// let stores = client.stores().list(&ListParams::new().with_page(1)).await?;
/// println!("{} stores", stores.total);
/// # Ok(())
/// # }
/// ```
pub struct SouthbayClient {
    config: Arc<SouthbayConfig>,
    pipeline: AuthPipeline,
}

impl SouthbayClient {
    /// Client with the reqwest transport and in-memory session storage.
    pub fn new(config: SouthbayConfig) -> SouthbayResult<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> SouthbayClientBuilder {
        SouthbayClientBuilder::new()
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.pipeline)
    }

    pub fn stores(&self) -> StoresService<'_> {
        StoresService::new(&self.pipeline)
    }

    pub fn people(&self) -> PeopleService<'_> {
        PeopleService::new(&self.pipeline)
    }

    pub fn segmentations(&self) -> SegmentationsService<'_> {
        SegmentationsService::new(&self.pipeline)
    }

    pub fn users(&self) -> UsersService<'_> {
        UsersService::new(&self.pipeline)
    }

    pub fn config(&self) -> &SouthbayConfig {
        &self.config
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        self.pipeline.token_store()
    }

    pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
        self.pipeline.coordinator()
    }

    /// The request pipeline, for calls no service covers.
    pub fn pipeline(&self) -> &AuthPipeline {
        &self.pipeline
    }
}

/// Builder for [`SouthbayClient`]. Only the configuration is required.
#[derive(Default)]
pub struct SouthbayClientBuilder {
    config: Option<SouthbayConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    local_storage: Option<Arc<dyn LocalStorage>>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    navigator: Option<Arc<dyn Navigator>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl SouthbayClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SouthbayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn local_storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.local_storage = Some(storage);
        self
    }

    pub fn cookie_jar(mut self, cookies: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(cookies);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Replace the HTTP refresh exchange, e.g. for tests.
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn build(self) -> SouthbayResult<SouthbayClient> {
        let config = Arc::new(self.config.ok_or_else(|| ConfigurationError::MissingRequired {
            field: "config".to_string(),
        })?);

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestHttpTransport::new(config.timeout)?),
        };
        let local_storage: Arc<dyn LocalStorage> = match self.local_storage {
            Some(storage) => storage,
            None => Arc::new(InMemoryLocalStorage::new()),
        };
        let cookie_jar: Arc<dyn CookieJar> = match self.cookie_jar {
            Some(cookies) => cookies,
            None => Arc::new(InMemoryCookieJar::new()),
        };
        let navigator: Arc<dyn Navigator> = match self.navigator {
            Some(navigator) => navigator,
            None => Arc::new(NoopNavigator),
        };

        let store = Arc::new(TokenStore::new(local_storage, cookie_jar, config.secure_context));
        let refresher: Arc<dyn TokenRefresher> = match self.refresher {
            Some(refresher) => refresher,
            None => Arc::new(HttpTokenRefresher::new(config.clone(), transport.clone())),
        };
        let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), refresher));
        let pipeline = AuthPipeline::new(config.clone(), transport, store, coordinator, navigator);

        Ok(SouthbayClient { config, pipeline })
    }
}
