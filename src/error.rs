use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// Error taxonomy for the gateway.
///
/// Authentication and authorization failures are terminal: they are produced
/// before any handler body runs (gate) or before the execution proxy is
/// invoked (authorizer), so a rejected request never has partial side effects.
#[derive(Debug, ThisError)]
pub enum GateError {
    #[error("no session cookie present")]
    NotLoggedIn,

    #[error("session missing, expired or user inactive")]
    SessionExpired,

    /// Single generic credential failure. Covers unknown email, wrong
    /// password and a currently locked account; the sub-cases are
    /// deliberately indistinguishable to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sensitive-action password re-verification failed for an otherwise
    /// valid session.
    #[error("action password mismatch")]
    PasswordMismatch,

    #[error("validation error: {0}")]
    Validation(String),

    /// No database handle. Permanent until restart; consumers degrade
    /// instead of crashing.
    #[error("database not connected")]
    ServiceUnavailable,

    #[error("downstream execution service unreachable: {0}")]
    DownstreamUnavailable(String),

    #[error("downstream execution service timed out: {0}")]
    DownstreamTimeout(String),

    /// The POST was delivered but the response body could not be decoded.
    /// Distinct from unreachable: the command may well have executed, so the
    /// caller must check trade state instead of re-issuing.
    #[error("downstream execution service sent an unreadable response: {0}")]
    DownstreamMalformed(String),

    #[error("database error: {0}")]
    Database(#[from] SqlxError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            GateError::NotLoggedIn => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("NOT_LOGGED_IN", "Not logged in."),
            ),
            GateError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("SESSION_EXPIRED", "Session expired, please log in again."),
            ),
            GateError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("INVALID_CREDENTIALS", "Invalid credentials"),
            ),
            GateError::PasswordMismatch => (
                StatusCode::FORBIDDEN,
                ApiErrorBody::new("PASSWORD_MISMATCH", "Password verification failed."),
            ),
            GateError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ApiErrorBody::new("VALIDATION", &msg))
            }
            GateError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody::new("DB_UNAVAILABLE", "Database not connected."),
            ),
            GateError::DownstreamUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new(
                    "EXEC_UNAVAILABLE",
                    "Trade execution service could not be reached.",
                ),
            ),
            GateError::DownstreamTimeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiErrorBody::new("EXEC_TIMEOUT", "Trade execution service timed out."),
            ),
            GateError::DownstreamMalformed(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new(
                    "EXEC_BAD_RESPONSE",
                    "Trade execution service responded, but the response was unreadable. Verify trade state before retrying.",
                ),
            ),
            GateError::Database(_) | GateError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
            ),
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiErrorBody {
    fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
