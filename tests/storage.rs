//! Session persistence through the file-backed local storage and cookie jar.

mod common;

use common::{jwt, now, session};
use integrations_southbay_admin::token::AUTH_STORAGE_KEY;
use integrations_southbay_admin::{
    CookieJar, FileCookieJar, FileLocalStorage, LocalStorage, MockHttpTransport, SouthbayClient,
    SouthbayConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Profile {
    _dir: tempfile::TempDir,
    storage: PathBuf,
    cookies: PathBuf,
}

impl Profile {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("session.json");
        let cookies = dir.path().join("cookies.json");
        Self {
            _dir: dir,
            storage,
            cookies,
        }
    }

    /// A client reading both stores from disk, as after a process restart.
    fn client(&self, transport: Arc<MockHttpTransport>) -> SouthbayClient {
        client(&self.storage, &self.cookies, transport)
    }
}

fn client(storage: &Path, cookies: &Path, transport: Arc<MockHttpTransport>) -> SouthbayClient {
    SouthbayClient::builder()
        .config(
            SouthbayConfig::builder()
                .base_url("https://api.test")
                .build()
                .unwrap(),
        )
        .transport(transport)
        .local_storage(Arc::new(FileLocalStorage::new(storage)))
        .cookie_jar(Arc::new(FileCookieJar::new(cookies)))
        .build()
        .unwrap()
}

#[test]
fn test_session_survives_client_restart() {
    let profile = Profile::new();
    let token = jwt(now() + 3600);
    profile
        .client(Arc::new(MockHttpTransport::new()))
        .token_store()
        .write(&session(token.clone(), Some("refresh-1")))
        .unwrap();

    let restarted = profile.client(Arc::new(MockHttpTransport::new()));
    assert!(restarted.auth().is_authenticated());
    assert_eq!(
        restarted.token_store().authorization_header(),
        Some(format!("Bearer {}", token))
    );
    assert_eq!(
        restarted.token_store().refresh_token().as_deref(),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn test_expired_session_is_renewed_after_restart() {
    let profile = Profile::new();
    profile
        .client(Arc::new(MockHttpTransport::new()))
        .token_store()
        .write(&session(jwt(now() - 60), Some("refresh-1")))
        .unwrap();

    let transport = Arc::new(MockHttpTransport::new());
    transport
        .on_path_json(
            "/auth/refresh",
            200,
            &serde_json::json!({"token": "renewed", "token_type": "Bearer"}),
        )
        .on_path_json(
            "/v1/users/me",
            200,
            &serde_json::json!({
                "email": "admin@southbay.test",
                "uuid": "u-1",
                "account_type": "ADMIN"
            }),
        );
    let restarted = profile.client(transport.clone());

    let user = restarted.users().me().await.unwrap();

    assert_eq!(user.email, "admin@southbay.test");
    let refresh = transport.requests_to("/auth/refresh");
    assert_eq!(refresh.len(), 1);
    assert_eq!(
        refresh[0].body.as_json().unwrap()["refresh_token"],
        "refresh-1"
    );
    let sent = transport.requests_to("/v1/users/me");
    assert_eq!(sent[0].header("authorization"), Some("Bearer renewed"));
}

#[test]
fn test_refresh_token_is_kept_out_of_local_storage() {
    let profile = Profile::new();
    profile
        .client(Arc::new(MockHttpTransport::new()))
        .token_store()
        .write(&session("abc", Some("refresh-secret")))
        .unwrap();

    let raw = std::fs::read_to_string(&profile.storage).unwrap();
    assert!(raw.contains("abc"));
    assert!(!raw.contains("refresh-secret"));

    let jar: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&profile.cookies).unwrap()).unwrap();
    let cookie = &jar["southbay_refresh_token"];
    assert_eq!(cookie["value"], "refresh-secret");
    assert_eq!(cookie["secure"], true);
    assert_eq!(cookie["same_site"], "Strict");
    assert!(cookie["expires_at"].is_string());
}

#[test]
fn test_corrupt_session_file_counts_as_signed_out() {
    let profile = Profile::new();
    FileLocalStorage::new(&profile.storage)
        .set_item(AUTH_STORAGE_KEY, "{not json")
        .unwrap();

    let client = profile.client(Arc::new(MockHttpTransport::new()));

    assert!(client.token_store().read().is_none());
    assert!(!client.auth().is_authenticated());
}

#[test]
fn test_logout_state_is_persisted() {
    let profile = Profile::new();
    let first = profile.client(Arc::new(MockHttpTransport::new()));
    first
        .token_store()
        .write(&session("abc", Some("r1")))
        .unwrap();
    first.token_store().clear();

    let restarted = profile.client(Arc::new(MockHttpTransport::new()));
    assert!(restarted.token_store().read().is_none());
    assert!(restarted.token_store().refresh_token().is_none());
    assert_eq!(
        FileCookieJar::new(&profile.cookies).get("southbay_refresh_token"),
        None
    );
}
