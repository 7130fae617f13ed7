//! Session token types.

use serde::{Deserialize, Serialize};

/// Token type assumed when the server omits one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Tokens returned by `/auth/login` and `/auth/refresh`.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginTokensResponse {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for LoginTokensResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginTokensResponse")
            .field("token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Session credentials as held by the token store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredAuthTokens {
    /// Access token (a JWT).
    pub token: String,
    /// Refresh token; persisted in a cookie, never in local storage.
    pub refresh_token: Option<String>,
    /// Expiry timestamp as sent by the server.
    pub expires_at: Option<String>,
    pub token_type: String,
}

impl StoredAuthTokens {
    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        let token_type = if self.token_type.trim().is_empty() {
            DEFAULT_TOKEN_TYPE
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", token_type, self.token)
    }
}

impl From<LoginTokensResponse> for StoredAuthTokens {
    fn from(response: LoginTokensResponse) -> Self {
        Self {
            token: response.token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_at: response.expires_at.filter(|t| !t.is_empty()),
            token_type: response
                .token_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        }
    }
}

impl std::fmt::Debug for StoredAuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAuthTokens")
            .field("token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}
