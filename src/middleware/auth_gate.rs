//! Path classification and the session auth gate.
//!
//! Every inbound path is classified before any handler runs; protected
//! paths resolve the session cookie to a [`Principal`] (fresh database read,
//! no cache) and inject it into request extensions. A failed check
//! short-circuits here, so no handler side effect can happen on a rejected
//! request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::error::GateError;
use crate::router::GateState;
use crate::service::sessions;

/// Exact paths that never require a session.
const PUBLIC_PATHS: &[&str] = &[
    "/api/health",
    "/api/server-info",
    "/api/tunnel-url",
    "/auth/login",
    // Logout only clears state; an expired session must still be able to
    // drop its cookie.
    "/auth/logout",
];

/// Read-only prefixes exposed without a session when the `public_reads`
/// feature flag is set at process start.
const CONDITIONAL_PREFIXES: &[&str] = &["/api/signals"];

/// Protected read-only paths that degrade to an explicit "not connected"
/// payload instead of a 503 when no database handle exists (there is nobody
/// to authenticate against, and the reads carry no mutation risk).
const DEGRADABLE_READS: &[&str] = &["/api/trades"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Public,
    ConditionallyPublic,
    Protected,
}

/// Pure lookup against the fixed path sets; total over arbitrary input.
/// Anything not explicitly public is protected.
pub fn classify(path: &str, public_reads: bool) -> PathClass {
    if PUBLIC_PATHS.contains(&path) {
        return PathClass::Public;
    }
    if public_reads && CONDITIONAL_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return PathClass::ConditionallyPublic;
    }
    PathClass::Protected
}

/// Conditionally-public reads are decided at classify time; with the flag
/// off they stay fully protected and get the same 503 as everything else,
/// disclosing nothing.
fn is_degradable_read(path: &str) -> bool {
    DEGRADABLE_READS.contains(&path)
}

/// Outermost state-touching middleware. Must run before anything that talks
/// to the database or the execution service.
pub async fn auth_gate(
    State(state): State<GateState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let path = req.uri().path().to_owned();
    match classify(&path, state.config().basic.public_reads) {
        PathClass::Public | PathClass::ConditionallyPublic => Ok(next.run(req).await),
        PathClass::Protected => {
            let Some(store) = state.store() else {
                if req.method() == axum::http::Method::GET && is_degradable_read(&path) {
                    // Degraded mode: the handler reports "not connected".
                    return Ok(next.run(req).await);
                }
                return Err(GateError::ServiceUnavailable);
            };
            let cookie_name = state.config().auth.session_cookie.as_str();
            let token = jar.get(cookie_name).map(|c| c.value().to_owned());
            let principal = sessions::validate(&store, token.as_deref()).await?;
            debug!(user = %principal.email, %path, "session validated");
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
    }
}
