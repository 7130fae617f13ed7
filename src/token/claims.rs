//! JWT claim decoding.
//!
//! Only the payload segment is read and only `exp` matters. Signatures are
//! not verified; the server does that.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

/// Claims read from an access token.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<f64>,
}

impl TokenClaims {
    /// Expiry in whole seconds, ignoring zero or negative values.
    pub fn expires_at(&self) -> Option<i64> {
        self.exp.filter(|exp| *exp > 0.0).map(|exp| exp as i64)
    }
}

/// Decode the payload segment of a JWT. Returns `None` for anything that is
/// not a three-part token with a Base64URL JSON payload.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
        _ => return None,
    };

    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}
