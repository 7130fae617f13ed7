//! Session and password operations.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{AuthenticationError, SouthbayResult};
use crate::password::check_password_policy;
use crate::pipeline::{ApiRequest, AuthPipeline};
use crate::resilience::RetryPolicy;
use crate::types::{ApiMessageResponse, LoginTokensResponse, MaybeWrapped, StoredAuthTokens};

use super::support::decode_or_default;

/// UTC offset of the API's local time (Buenos Aires).
const API_UTC_OFFSET_SECS: i32 = -3 * 3600;

/// Service for login, logout and password management.
pub struct AuthService<'a> {
    pipeline: &'a AuthPipeline,
}

impl<'a> AuthService<'a> {
    pub fn new(pipeline: &'a AuthPipeline) -> Self {
        Self { pipeline }
    }

    /// Exchange credentials for a session and store it.
    #[instrument(name = "southbay.login", skip_all)]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> SouthbayResult<StoredAuthTokens> {
        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let request = ApiRequest::post(self.endpoints().login.as_str())
            .json(&body)?
            .skip_auth_refresh()
            .retry(RetryPolicy::none());

        let response: MaybeWrapped<LoginTokensResponse> =
            self.pipeline.execute_json(&request).await?;
        let response = response.into_inner();
        if response.token.is_empty() {
            return Err(AuthenticationError::MissingAccessToken.into());
        }

        let tokens = StoredAuthTokens::from(response);
        self.pipeline.token_store().write(&tokens)?;
        info!("logged in");
        Ok(tokens)
    }

    /// End the session. The server call is best effort; local state is
    /// always cleared and the login screen shown.
    #[instrument(name = "southbay.logout", skip_all)]
    pub async fn logout(&self) {
        let request = ApiRequest::post(self.endpoints().logout.as_str()).retry(RetryPolicy::none());
        if let Err(error) = self.pipeline.execute_empty(&request).await {
            warn!(error = %error, "logout request failed, clearing session anyway");
        }
        self.pipeline.end_session();
        info!("logged out");
    }

    /// Whether a usable access token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.pipeline.token_store().is_access_token_valid()
    }

    /// Ask the API to email a password reset link.
    pub async fn initiate_password_reset(&self, email: &str) -> SouthbayResult<ApiMessageResponse> {
        let request = ApiRequest::post(self.endpoints().initiate_password_reset.as_str())
            .json(&serde_json::json!({ "email": email }))?
            .retry(RetryPolicy::none());
        let response = self.pipeline.execute(&request).await?;
        Ok(decode_or_default(&response))
    }

    /// Check a reset token taken from the emailed link.
    pub async fn verify_password_reset_token(
        &self,
        reset_token: &str,
    ) -> SouthbayResult<PasswordResetVerification> {
        let request = ApiRequest::post(self.endpoints().verify_password_reset_token.as_str())
            .json(&serde_json::json!({ "reset_token": reset_token }))?
            .retry(RetryPolicy::none());
        let response = self.pipeline.execute(&request).await?;
        Ok(decode_or_default(&response))
    }

    /// Set a new password with a verified reset token. The password policy
    /// is checked before anything is sent.
    pub async fn reset_password(
        &self,
        reset_token: &str,
        password: &SecretString,
    ) -> SouthbayResult<ApiMessageResponse> {
        check_password_policy(password.expose_secret())?;

        let request = ApiRequest::patch(self.endpoints().password_reset.as_str())
            .json(&serde_json::json!({
                "reset_token": reset_token,
                "password": password.expose_secret(),
            }))?
            .retry(RetryPolicy::none());
        let response = self.pipeline.execute(&request).await?;
        Ok(decode_or_default(&response))
    }

    /// Change the signed-in user's password.
    pub async fn change_password(
        &self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> SouthbayResult<ApiMessageResponse> {
        check_password_policy(new_password.expose_secret())?;

        let request = ApiRequest::patch(self.endpoints().users_me_password.as_str())
            .json(&serde_json::json!({
                "current_password": current_password.expose_secret(),
                "password": new_password.expose_secret(),
            }))?
            .retry(RetryPolicy::none());
        let response = self.pipeline.execute(&request).await?;
        Ok(decode_or_default(&response))
    }

    fn endpoints(&self) -> &crate::config::Endpoints {
        &self.pipeline.config().endpoints
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Answer of the reset-token verification endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PasswordResetVerification {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<PasswordResetTokenInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PasswordResetTokenInfo {
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl PasswordResetVerification {
    /// Whether the server accepted the token.
    pub fn is_valid(&self) -> bool {
        self.success && self.data.is_some()
    }

    /// Token expiry. Timestamps without an offset are in API local time.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.data.as_ref()?.expires_at.as_deref()?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?;
        let offset = FixedOffset::east_opt(API_UTC_OFFSET_SECS)?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
    }

    /// Whether the token had expired at `now`. A valid token without an
    /// expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| expires_at <= now)
    }
}
