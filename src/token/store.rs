//! Token Store
//!
//! Persists the session the way the admin console does: access token and
//! expiry as JSON in local storage, refresh token in its own cookie.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SouthbayResult;
use crate::storage::{Cookie, CookieJar, LocalStorage, SameSite};
use crate::types::{StoredAuthTokens, DEFAULT_TOKEN_TYPE};

use super::claims::decode_claims;

/// Local-storage key of the persisted session.
pub const AUTH_STORAGE_KEY: &str = "southbay:auth";

/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "southbay_refresh_token";

/// Lifetime of the refresh-token cookie (30 days).
pub const REFRESH_TOKEN_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Access tokens closer than this to expiry are treated as stale.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Local-storage representation. The refresh token is never written here;
/// it is only read back for sessions persisted by older builds.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedTokens {
    #[serde(default)]
    token: String,
    #[serde(default, skip_serializing)]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
}

/// Token store over a local storage and a cookie jar.
pub struct TokenStore {
    storage: Arc<dyn LocalStorage>,
    cookies: Arc<dyn CookieJar>,
    secure_context: bool,
}

impl TokenStore {
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        cookies: Arc<dyn CookieJar>,
        secure_context: bool,
    ) -> Self {
        Self {
            storage,
            cookies,
            secure_context,
        }
    }

    /// Current session, merging the stored blob with the refresh cookie.
    /// Unreadable or corrupt storage counts as no session.
    pub fn read(&self) -> Option<StoredAuthTokens> {
        let persisted = self.read_persisted()?;
        let refresh_token = persisted
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| self.refresh_cookie());

        Some(StoredAuthTokens {
            token: persisted.token,
            refresh_token,
            expires_at: persisted.expires_at.filter(|value| !value.is_empty()),
            token_type: persisted
                .token_type
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        })
    }

    /// Replace the stored session.
    pub fn write(&self, tokens: &StoredAuthTokens) -> SouthbayResult<()> {
        let persisted = PersistedTokens {
            token: tokens.token.clone(),
            refresh_token: None,
            expires_at: tokens.expires_at.clone(),
            token_type: Some(tokens.token_type.clone()),
        };
        let raw = serde_json::to_string(&persisted).map_err(|e| {
            crate::error::StorageError::WriteFailed {
                message: e.to_string(),
            }
        })?;
        self.storage.set_item(AUTH_STORAGE_KEY, &raw)?;

        if let Some(refresh_token) = tokens.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            self.cookies.set(
                Cookie::new(REFRESH_TOKEN_COOKIE, refresh_token)
                    .with_max_age(REFRESH_TOKEN_MAX_AGE)
                    .with_same_site(SameSite::Strict)
                    .with_secure(self.secure_context),
            );
        }

        debug!("session tokens stored");
        Ok(())
    }

    /// Remove the stored session and the refresh cookie.
    pub fn clear(&self) {
        if let Err(error) = self.storage.remove_item(AUTH_STORAGE_KEY) {
            warn!(error = %error, "failed to remove stored session");
        }
        self.cookies.set(
            Cookie::new(REFRESH_TOKEN_COOKIE, "")
                .with_max_age(Duration::ZERO)
                .with_same_site(SameSite::Strict),
        );
        debug!("session tokens cleared");
    }

    /// Refresh token from the stored session, else from the cookie.
    pub fn refresh_token(&self) -> Option<String> {
        self.read_persisted()
            .and_then(|persisted| persisted.refresh_token)
            .filter(|token| !token.is_empty())
            .or_else(|| self.refresh_cookie())
    }

    /// `"<type> <token>"` for the stored access token.
    pub fn authorization_header(&self) -> Option<String> {
        self.read()
            .filter(|tokens| !tokens.token.is_empty())
            .map(|tokens| tokens.authorization_header())
    }

    /// Whether the stored access token can be sent as is.
    pub fn is_access_token_valid(&self) -> bool {
        self.is_access_token_valid_at(Utc::now())
    }

    /// Validity check against an explicit clock.
    ///
    /// The JWT `exp` claim wins over the stored `expires_at`. A token with
    /// neither is assumed valid. A token already past expiry is dropped from
    /// local storage; the refresh cookie stays so the session can still be
    /// renewed.
    pub fn is_access_token_valid_at(&self, now: DateTime<Utc>) -> bool {
        let Some(tokens) = self.read() else {
            return false;
        };
        if tokens.token.is_empty() {
            return false;
        }

        let Some(expires_at) = effective_expiry(&tokens) else {
            return true;
        };

        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        if (expires_at as f64) <= now_secs {
            debug!("access token expired");
            if let Err(error) = self.storage.remove_item(AUTH_STORAGE_KEY) {
                warn!(error = %error, "failed to remove expired session");
            }
            return false;
        }

        (expires_at - EXPIRY_LEEWAY_SECS) as f64 > now_secs
    }

    fn read_persisted(&self) -> Option<PersistedTokens> {
        let raw = match self.storage.get_item(AUTH_STORAGE_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(error) => {
                warn!(error = %error, "failed to read stored session");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(persisted) => Some(persisted),
            Err(error) => {
                warn!(error = %error, "ignoring unreadable stored session");
                None
            }
        }
    }

    fn refresh_cookie(&self) -> Option<String> {
        self.cookies
            .get(REFRESH_TOKEN_COOKIE)
            .filter(|value| !value.is_empty())
    }
}

/// Expiry in seconds: JWT `exp`, else the stored timestamp.
fn effective_expiry(tokens: &StoredAuthTokens) -> Option<i64> {
    decode_claims(&tokens.token)
        .and_then(|claims| claims.expires_at())
        .or_else(|| tokens.expires_at.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &str) -> Option<i64> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryCookieJar, InMemoryLocalStorage};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::TimeZone;

    struct Fixture {
        storage: Arc<InMemoryLocalStorage>,
        cookies: Arc<InMemoryCookieJar>,
        store: TokenStore,
    }

    fn fixture(secure: bool) -> Fixture {
        let storage = Arc::new(InMemoryLocalStorage::new());
        let cookies = Arc::new(InMemoryCookieJar::new());
        let store = TokenStore::new(storage.clone(), cookies.clone(), secure);
        Fixture {
            storage,
            cookies,
            store,
        }
    }

    fn jwt(exp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
        format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", payload)
    }

    fn tokens(token: String, expires_at: Option<&str>) -> StoredAuthTokens {
        StoredAuthTokens {
            token,
            refresh_token: Some("refresh-1".to_string()),
            expires_at: expires_at.map(str::to_string),
            token_type: "Bearer".to_string(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_write_splits_refresh_token_into_cookie() {
        let f = fixture(true);
        f.store.write(&tokens("access".into(), None)).unwrap();

        let raw = f.storage.get_item(AUTH_STORAGE_KEY).unwrap().unwrap();
        assert!(!raw.contains("refresh-1"));
        assert!(raw.contains("\"tokenType\":\"Bearer\""));

        let cookie = f.cookies.get_cookie(REFRESH_TOKEN_COOKIE).unwrap();
        assert_eq!(cookie.value, "refresh-1");
        assert_eq!(cookie.max_age, Some(REFRESH_TOKEN_MAX_AGE));
        assert_eq!(cookie.same_site, SameSite::Strict);
        assert!(cookie.secure);

        let read = f.store.read().unwrap();
        assert_eq!(read.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(f.store.authorization_header().as_deref(), Some("Bearer access"));
    }

    #[test]
    fn test_insecure_context_omits_secure_flag() {
        let f = fixture(false);
        f.store.write(&tokens("access".into(), None)).unwrap();
        assert!(!f.cookies.get_cookie(REFRESH_TOKEN_COOKIE).unwrap().secure);
    }

    #[test]
    fn test_legacy_blob_refresh_token_wins_over_cookie() {
        let f = fixture(false);
        f.storage
            .set_item(AUTH_STORAGE_KEY, r#"{"token":"a","refreshToken":"legacy"}"#)
            .unwrap();
        f.cookies.set(Cookie::new(REFRESH_TOKEN_COOKIE, "from-cookie"));

        assert_eq!(f.store.refresh_token().as_deref(), Some("legacy"));
        assert_eq!(f.store.read().unwrap().token_type, "Bearer");
    }

    #[test]
    fn test_refresh_token_falls_back_to_cookie_without_session() {
        let f = fixture(false);
        f.cookies.set(Cookie::new(REFRESH_TOKEN_COOKIE, "from-cookie"));

        assert!(f.store.read().is_none());
        assert_eq!(f.store.refresh_token().as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_corrupt_blob_reads_as_absent() {
        let f = fixture(false);
        f.storage.set_item(AUTH_STORAGE_KEY, "{not json").unwrap();
        assert!(f.store.read().is_none());
        assert!(!f.store.is_access_token_valid());
    }

    #[test]
    fn test_validity_flips_at_leeway() {
        let f = fixture(false);
        let exp = 1_900_000_000;
        f.store.write(&tokens(jwt(exp), None)).unwrap();

        assert!(f.store.is_access_token_valid_at(at(exp - 31)));
        assert!(!f.store.is_access_token_valid_at(at(exp - 30)));
        assert!(!f.store.is_access_token_valid_at(at(exp - 10)));
        // Inside the leeway the session is kept for refresh.
        assert!(f.store.read().is_some());
    }

    #[test]
    fn test_expired_token_is_dropped_but_refresh_cookie_kept() {
        let f = fixture(false);
        let exp = 1_900_000_000;
        f.store.write(&tokens(jwt(exp), None)).unwrap();

        assert!(!f.store.is_access_token_valid_at(at(exp + 1)));
        assert!(f.store.read().is_none());
        assert_eq!(f.store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_expires_at_used_when_token_is_opaque() {
        let f = fixture(false);
        f.store
            .write(&tokens("opaque".into(), Some("2030-01-01T00:00:00Z")))
            .unwrap();
        let expiry = at(1_893_456_000);

        assert!(f.store.is_access_token_valid_at(expiry - chrono::Duration::seconds(60)));
        assert!(!f.store.is_access_token_valid_at(expiry - chrono::Duration::seconds(29)));
    }

    #[test]
    fn test_no_expiry_information_is_valid() {
        let f = fixture(false);
        f.store.write(&tokens("opaque".into(), None)).unwrap();
        assert!(f.store.is_access_token_valid());
    }

    #[test]
    fn test_clear_invalidates_immediately() {
        let f = fixture(false);
        f.store.write(&tokens("opaque".into(), None)).unwrap();
        assert!(f.store.is_access_token_valid());

        f.store.clear();
        assert!(!f.store.is_access_token_valid());
        assert!(f.store.refresh_token().is_none());
        assert!(f.store.authorization_header().is_none());
    }

    #[test]
    fn test_parse_timestamp_without_offset() {
        assert_eq!(parse_timestamp("2030-01-01T00:00:00"), Some(1_893_456_000));
        assert_eq!(parse_timestamp("2030-01-01T00:00:00.000Z"), Some(1_893_456_000));
        assert_eq!(parse_timestamp("soon"), None);
    }
}
