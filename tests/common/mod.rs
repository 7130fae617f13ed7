//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use integrations_southbay_admin::StoredAuthTokens;
use rust_xlsxwriter::Workbook;

/// Unsigned JWT whose payload carries `exp`.
pub fn jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp, "sub": "ops" }).to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn session(token: impl Into<String>, refresh_token: Option<&str>) -> StoredAuthTokens {
    StoredAuthTokens {
        token: token.into(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: None,
        token_type: "Bearer".to_string(),
    }
}

/// Workbook with one sheet holding `rows`, cells written as text from A1.
pub fn workbook(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.write_string(r as u32, c as u16, *value).unwrap();
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Workbook with a single empty sheet.
pub fn empty_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    workbook.add_worksheet();
    workbook.save_to_buffer().unwrap()
}
