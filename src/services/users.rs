//! Admin-console account service.

use tracing::instrument;

use crate::error::SouthbayResult;
use crate::pagination::{ListParams, ListResponse, Page};
use crate::pipeline::{ApiRequest, AuthPipeline};
use crate::resilience::RetryPolicy;
use crate::types::{MaybeWrapped, User, UserPayload};

/// Service for console accounts.
pub struct UsersService<'a> {
    pipeline: &'a AuthPipeline,
}

impl<'a> UsersService<'a> {
    pub fn new(pipeline: &'a AuthPipeline) -> Self {
        Self { pipeline }
    }

    /// The signed-in account.
    #[instrument(name = "southbay.users.me", skip_all)]
    pub async fn me(&self) -> SouthbayResult<User> {
        let request = ApiRequest::get(self.pipeline.config().endpoints.users_me.as_str());
        let user: MaybeWrapped<User> = self.pipeline.execute_json(&request).await?;
        Ok(user.into_inner())
    }

    /// Lists accounts; the search text filters by email and the role
    /// filter is sent as given.
    pub async fn list(&self, params: &ListParams) -> SouthbayResult<Page<User>> {
        let request = params.apply(
            ApiRequest::get(self.pipeline.config().endpoints.users.as_str()),
            "email",
        );
        let response: ListResponse<User> = self.pipeline.execute_json(&request).await?;
        Ok(response.into_page(params))
    }

    pub async fn create(&self, payload: &UserPayload) -> SouthbayResult<User> {
        let request = ApiRequest::post(self.pipeline.config().endpoints.users.as_str())
            .json(payload)?
            .retry(RetryPolicy::none());
        let user: MaybeWrapped<User> = self.pipeline.execute_json(&request).await?;
        Ok(user.into_inner())
    }

    pub async fn update(&self, id: u64, payload: &UserPayload) -> SouthbayResult<User> {
        let request = ApiRequest::put(self.pipeline.config().endpoints.user(id))
            .json(payload)?
            .retry(RetryPolicy::none());
        let user: MaybeWrapped<User> = self.pipeline.execute_json(&request).await?;
        Ok(user.into_inner())
    }

    pub async fn delete(&self, id: u64) -> SouthbayResult<()> {
        let request = ApiRequest::delete(self.pipeline.config().endpoints.user(id))
            .retry(RetryPolicy::none());
        self.pipeline.execute_empty(&request).await
    }
}
