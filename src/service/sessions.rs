//! Session lifecycle: creation, validation, extension, destruction, and the
//! cookie that carries the token.
//!
//! The sessions table is the sole source of truth; every check is a fresh
//! read so revocation and expiry are visible to the very next request.
//! Expired rows are left in place (no background sweep) and cleaned up
//! opportunistically when the same token is logged out.

use crate::config::AuthSettings;
use crate::db::models::{Principal, SessionRow};
use crate::db::store::AuthStore;
use crate::error::GateError;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use uuid::Uuid;

const TOKEN_BYTES: usize = 32;

/// Unguessable session token: 256 bits from the OS RNG, URL-safe base64.
pub fn new_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Open a session for a freshly authenticated user. One row per login;
/// concurrent sessions for the same user are allowed.
pub async fn create<S: AuthStore>(
    store: &S,
    auth: &AuthSettings,
    user_id: Uuid,
) -> Result<SessionRow, GateError> {
    let now = Utc::now();
    let session = SessionRow {
        id: new_token(),
        user_id,
        expires_at: now + Duration::seconds(auth.session_ttl_secs),
        created_at: now,
    };
    store.insert_session(&session).await?;
    Ok(session)
}

/// Resolve a cookie value to a principal.
///
/// `NotLoggedIn` when no cookie was presented at all; `SessionExpired` for
/// everything else (row missing, expired, or owner inactive). The cases are
/// deliberately not distinguishable, so a probe cannot learn account state.
pub async fn validate<S: AuthStore>(
    store: &S,
    token: Option<&str>,
) -> Result<Principal, GateError> {
    let token = token.ok_or(GateError::NotLoggedIn)?;
    store
        .session_principal(token, Utc::now())
        .await?
        .ok_or(GateError::SessionExpired)
}

/// Extend a live session by a full TTL from now. Expired sessions are not
/// revived; the caller must log in again.
pub async fn extend<S: AuthStore>(
    store: &S,
    auth: &AuthSettings,
    session_id: &str,
) -> Result<DateTime<Utc>, GateError> {
    let now = Utc::now();
    let new_expiry = now + Duration::seconds(auth.session_ttl_secs);
    store
        .extend_session(session_id, now, new_expiry)
        .await?
        .ok_or(GateError::SessionExpired)
}

/// Idempotent logout; reports whether a row actually existed.
pub async fn destroy<S: AuthStore>(store: &S, session_id: &str) -> Result<bool, GateError> {
    store.delete_session(session_id).await
}

/// Session cookie: httpOnly, path `/`, max-age = TTL. Production gets
/// Secure + SameSite=None (dashboard and API live on different origins);
/// development keeps Lax so plain-http localhost works.
pub fn build_cookie(
    name: &str,
    token: String,
    ttl_secs: i64,
    production: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_owned(), token))
        .http_only(true)
        .secure(production)
        .same_site(if production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .path("/")
        .max_age(time::Duration::seconds(ttl_secs))
        .build()
}

/// Expired cookie used to clear the browser regardless of whether the
/// logout matched a session row.
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), String::new()))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}
