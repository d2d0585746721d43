//! Peek at access-token claims without verifying the signature.
//!
//! Only used to pick a user identifier for API paths; the token is never
//! trusted on the strength of these claims.

use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    serde::Deserialize,
};

#[derive(Debug, Deserialize)]
struct Claims {
    oid: Option<String>,
    sub: Option<String>,
}

/// Object id (`oid`) of the token's subject, falling back to `sub`.
///
/// Returns `None` for opaque (non-JWT) tokens.
pub fn user_id(access_token: &str) -> Option<String> {
    let payload = access_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims
        .oid
        .filter(|s| !s.is_empty())
        .or(claims.sub.filter(|s| !s.is_empty()))
}
