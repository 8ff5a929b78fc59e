//! Session endpoints: login, logout, who-am-i, extend.

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::db::models::Principal;
use crate::error::GateError;
use crate::router::GateState;
use crate::service::{credentials, sessions};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// POST /auth/login: verify credentials, open a session, set the cookie.
pub async fn login(
    State(state): State<GateState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, GateError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(GateError::Validation(
            "Email and password required".to_string(),
        ));
    }
    let store = state.require_store()?;
    let auth = &state.config().auth;
    let outcome = credentials::login(&store, auth, &body.email, &body.password).await?;

    let cookie = sessions::build_cookie(
        &auth.session_cookie,
        outcome.session.id.clone(),
        auth.session_ttl_secs,
        state.config().basic.production,
    );
    Ok((
        jar.add(cookie),
        Json(json!({
            "user": { "id": outcome.user_id, "email": outcome.email },
            "expires_at": outcome.session.expires_at,
        })),
    ))
}

/// POST /auth/logout: idempotent; the cookie is cleared even when no row
/// matched or the database is down.
pub async fn logout(
    State(state): State<GateState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, GateError> {
    let cookie_name = state.config().auth.session_cookie.clone();
    if let (Some(store), Some(cookie)) = (state.store(), jar.get(&cookie_name)) {
        match sessions::destroy(&store, cookie.value()).await {
            Ok(existed) => info!(existed, "logout"),
            Err(e) => warn!(error = %e, "session delete failed during logout"),
        }
    }
    Ok((
        jar.add(sessions::removal_cookie(&cookie_name)),
        Json(json!({ "ok": true })),
    ))
}

/// GET /auth/me: the principal the gate resolved for this request.
pub async fn me(Extension(principal): Extension<Principal>) -> Json<serde_json::Value> {
    Json(json!({
        "user": { "id": principal.user_id, "email": principal.email },
        "expires_at": principal.session_expires_at,
    }))
}

/// POST /auth/extend-session: push the expiry a full TTL forward; expired
/// sessions are not revived.
pub async fn extend_session(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let expires_at = sessions::extend(&store, &state.config().auth, &principal.session_id).await?;
    Ok(Json(json!({ "expires_at": expires_at })))
}
