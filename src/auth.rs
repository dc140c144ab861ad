use anyhow::Context;
use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{
    config::AuthConfig,
    errors::AppResult,
    metadata::Metadata,
    sessions::{self, SessionStore},
};

/// Header carrying the shared upload key or a signed token.
pub const AUTH_HEADER: &str = "x-auth";

/// Issued tokens stay valid for two hours; there is no refresh, expired
/// tokens just stop validating and the caller fetches a new one.
const TOKEN_VALIDITY: i64 = 2 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    exp: i64,
}

/// Compare two secrets without leaking where they diverge. Hashing both
/// sides first equalizes lengths, so the comparison itself is always over
/// the same number of bytes.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let a_hash = Sha256::digest(a);
    let b_hash = Sha256::digest(b);
    a_hash.ct_eq(&b_hash).into()
}

/// Gate for upload/delete operations: the `X-Auth` header must carry
/// either the shared upload key or a still-valid token signed with it.
pub fn check_upload_auth(headers: &HeaderMap, key: &str) -> bool {
    let Some(candidate) = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    if constant_time_eq(candidate.as_bytes(), key.as_bytes()) {
        return true;
    }

    validate_token(candidate, key)
}

/// Issue a fresh HS256 token signed with the shared key.
pub fn issue_token(key: &str) -> AppResult<String> {
    let claims = Claims {
        exp: (Utc::now() + Duration::seconds(TOKEN_VALIDITY)).timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
    .context("signing token")?;
    Ok(token)
}

/// A token is valid only if it is signed HS256 with our key and carries a
/// future `exp` claim. Pinning the algorithm rejects downgrade tricks; a
/// missing `exp` is as bad as an expired one.
fn validate_token(token: &str, key: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(key.as_bytes()), &validation)
        .is_ok()
}

/// Basic-auth gate for the listing, token and last-upload endpoints. Both
/// halves of the pair are compared in constant time.
pub fn check_basic_auth(headers: &HeaderMap, cfg: &AuthConfig) -> bool {
    let Some((username, password)) = basic_credentials(headers) else {
        return false;
    };

    let username_ok = constant_time_eq(username.as_bytes(), cfg.username.as_bytes());
    let password_ok = constant_time_eq(password.as_bytes(), cfg.password.as_bytes());
    username_ok && password_ok
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Verdict of the per-item password gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAccess {
    Authorized,
    NeedsPassword,
}

/// Decide whether a fetch of `filename` may proceed: unprotected items are
/// always readable; protected ones need a session cookie bound to this
/// exact file.
pub fn check_item_access(
    meta: &Metadata,
    headers: &HeaderMap,
    sessions: &SessionStore,
    filename: &str,
) -> ItemAccess {
    if meta.password_hash.is_none() {
        return ItemAccess::Authorized;
    }

    if let Some(token) = sessions::cookie_token(headers) {
        if sessions.validate(&token, filename) {
            return ItemAccess::Authorized;
        }
    }

    ItemAccess::NeedsPassword
}
