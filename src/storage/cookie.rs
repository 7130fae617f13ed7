//! Cookie jar abstraction.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::{SouthbayResult, StorageError};

/// Characters left unescaped by `encodeURIComponent`.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// A cookie with the attributes the session uses.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// `None` is a session cookie; zero deletes.
    pub max_age: Option<Duration>,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            max_age: None,
            same_site: SameSite::Lax,
            secure: false,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut header = format!(
            "{}={}",
            self.name,
            utf8_percent_encode(&self.value, COOKIE_VALUE)
        );
        if let Some(max_age) = self.max_age {
            header.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        header.push_str(&format!("; Path={}", self.path));
        header.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("path", &self.path)
            .field("max_age", &self.max_age)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Cookie storage.
pub trait CookieJar: Send + Sync {
    /// Current value of a cookie, if set and not expired.
    fn get(&self, name: &str) -> Option<String>;

    /// Set a cookie. A zero `max_age` removes it.
    fn set(&self, cookie: Cookie);

    /// Remove a cookie.
    fn remove(&self, name: &str);
}

struct JarEntry {
    cookie: Cookie,
    expires: Option<Instant>,
}

/// In-memory cookie jar honouring `Max-Age`.
#[derive(Default)]
pub struct InMemoryCookieJar {
    cookies: Mutex<HashMap<String, JarEntry>>,
}

impl InMemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full cookie, attributes included.
    pub fn get_cookie(&self, name: &str) -> Option<Cookie> {
        let cookies = self.cookies.lock();
        cookies
            .get(name)
            .filter(|entry| entry.expires.map_or(true, |at| at > Instant::now()))
            .map(|entry| entry.cookie.clone())
    }
}

impl CookieJar for InMemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.get_cookie(name).map(|cookie| cookie.value)
    }

    fn set(&self, cookie: Cookie) {
        let mut cookies = self.cookies.lock();
        if cookie.max_age.is_some_and(|age| age.is_zero()) {
            cookies.remove(&cookie.name);
            return;
        }
        let expires = cookie.max_age.map(|age| Instant::now() + age);
        cookies.insert(cookie.name.clone(), JarEntry { cookie, expires });
    }

    fn remove(&self, name: &str) {
        self.cookies.lock().remove(name);
    }
}

/// Cookie as written to disk, with `Max-Age` resolved to a wall-clock
/// expiry so it still applies after a restart.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCookie {
    value: String,
    path: String,
    same_site: SameSite,
    secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl PersistedCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Cookie jar persisted as JSON in a single file, the counterpart of
/// [`FileLocalStorage`](super::FileLocalStorage) for the refresh cookie.
///
/// I/O failures are logged; an unreadable jar behaves as an empty one.
pub struct FileCookieJar {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> SouthbayResult<HashMap<String, PersistedCookie>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    message: e.to_string(),
                }
                .into())
            }
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::CorruptedData {
                message: format!("{}: {}", self.path.display(), e),
            }
            .into()
        })
    }

    fn save(&self, cookies: &HashMap<String, PersistedCookie>) -> SouthbayResult<()> {
        let write_failed = |message: String| StorageError::WriteFailed { message };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(cookies).map_err(|e| write_failed(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }

    fn load_or_empty(&self) -> HashMap<String, PersistedCookie> {
        self.load().unwrap_or_else(|error| {
            warn!(error = %error, path = %self.path.display(), "cookie jar unreadable");
            HashMap::new()
        })
    }

    fn update(&self, change: impl FnOnce(&mut HashMap<String, PersistedCookie>)) {
        let _guard = self.lock.lock();
        let mut cookies = self.load_or_empty();
        let now = Utc::now();
        cookies.retain(|_, cookie| cookie.is_live(now));
        change(&mut cookies);
        if let Err(error) = self.save(&cookies) {
            warn!(error = %error, path = %self.path.display(), "failed to persist cookie jar");
        }
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let _guard = self.lock.lock();
        self.load_or_empty()
            .remove(name)
            .filter(|cookie| cookie.is_live(Utc::now()))
            .map(|cookie| cookie.value)
    }

    fn set(&self, cookie: Cookie) {
        if cookie.max_age.is_some_and(|age| age.is_zero()) {
            self.remove(&cookie.name);
            return;
        }
        let expires_at = cookie
            .max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
            .map(|age| Utc::now() + age);
        self.update(|cookies| {
            cookies.insert(
                cookie.name,
                PersistedCookie {
                    value: cookie.value,
                    path: cookie.path,
                    same_site: cookie.same_site,
                    secure: cookie.secure,
                    expires_at,
                },
            );
        });
    }

    fn remove(&self, name: &str) {
        self.update(|cookies| {
            cookies.remove(name);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_encodes_and_lists_attributes() {
        let cookie = Cookie::new("southbay_refresh_token", "a b/c")
            .with_max_age(Duration::from_secs(60))
            .with_same_site(SameSite::Strict)
            .with_secure(true);

        assert_eq!(
            cookie.to_header_value(),
            "southbay_refresh_token=a%20b%2Fc; Max-Age=60; Path=/; SameSite=Strict; Secure"
        );
    }

    #[test]
    fn test_zero_max_age_removes() {
        let jar = InMemoryCookieJar::new();
        jar.set(Cookie::new("c", "v"));
        assert_eq!(jar.get("c").as_deref(), Some("v"));

        jar.set(Cookie::new("c", "").with_max_age(Duration::ZERO));
        assert_eq!(jar.get("c"), None);
    }

    #[test]
    fn test_debug_hides_value() {
        let cookie = Cookie::new("c", "very-secret");
        assert!(!format!("{:?}", cookie).contains("very-secret"));
    }

    #[test]
    fn test_file_jar_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        FileCookieJar::new(&path).set(
            Cookie::new("southbay_refresh_token", "r1")
                .with_max_age(Duration::from_secs(3600))
                .with_same_site(SameSite::Strict),
        );

        let reopened = FileCookieJar::new(&path);
        assert_eq!(reopened.get("southbay_refresh_token").as_deref(), Some("r1"));

        reopened.set(Cookie::new("southbay_refresh_token", "").with_max_age(Duration::ZERO));
        assert_eq!(FileCookieJar::new(&path).get("southbay_refresh_token"), None);
    }

    #[test]
    fn test_file_jar_drops_expired_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let expired = serde_json::json!({
            "southbay_refresh_token": {
                "value": "old",
                "path": "/",
                "same_site": "Strict",
                "secure": false,
                "expires_at": "2020-01-01T00:00:00Z"
            }
        });
        std::fs::write(&path, expired.to_string()).unwrap();

        let jar = FileCookieJar::new(&path);
        assert_eq!(jar.get("southbay_refresh_token"), None);

        jar.set(Cookie::new("other", "v"));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("southbay_refresh_token"));
    }

    #[test]
    fn test_file_jar_treats_corrupt_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();

        let jar = FileCookieJar::new(&path);
        assert_eq!(jar.get("c"), None);

        jar.set(Cookie::new("c", "v"));
        assert_eq!(jar.get("c").as_deref(), Some("v"));
    }
}
