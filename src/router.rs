//! Shared state and router assembly.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::api::ExecApi;
use crate::config::Config;
use crate::db::store::{DbPool, PgStore};
use crate::error::GateError;
use crate::handlers::{auth, records, system, trading};
use crate::middleware::auth_gate::auth_gate;

/// Process-wide state. The database handle is deliberately optional: when
/// startup could not connect, the service runs degraded instead of exiting.
#[derive(Clone)]
pub struct GateState {
    cfg: Arc<Config>,
    db: Option<DbPool>,
    exec: Arc<ExecApi>,
}

impl GateState {
    pub fn new(cfg: Config, db: Option<DbPool>, exec: ExecApi) -> Self {
        Self {
            cfg: Arc::new(cfg),
            db,
            exec: Arc::new(exec),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn exec(&self) -> &ExecApi {
        &self.exec
    }

    pub fn db_connected(&self) -> bool {
        self.db.is_some()
    }

    pub fn store(&self) -> Option<PgStore> {
        self.db.clone().map(PgStore::new)
    }

    /// Store or 503; used by handlers that cannot degrade.
    pub fn require_store(&self) -> Result<PgStore, GateError> {
        self.store().ok_or(GateError::ServiceUnavailable)
    }
}

pub fn gate_router(state: GateState) -> Router {
    Router::new()
        // Public
        .route("/api/health", get(system::health))
        .route("/api/server-info", get(system::server_info))
        .route("/api/tunnel-url", get(system::tunnel_url))
        // Session lifecycle
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/extend-session", post(auth::extend_session))
        // Reads
        .route("/api/trades", get(records::list_trades))
        .route("/api/signals-status", get(records::signals_status))
        .route("/api/signals/{table}", get(records::signal_rows))
        // Sensitive trading actions (password re-verified per request)
        .route("/api/trading/autopilot", post(trading::toggle_autopilot))
        .route("/api/trading/order", post(trading::execute_order))
        .route("/api/trading/close-order", post(trading::close_order))
        .route("/api/trading/end-trade", post(trading::end_trade))
        .route("/api/trading/hedge", post(trading::hedge))
        .route("/api/trading/partial-close", post(trading::partial_close))
        .route("/api/trading/stop-price", post(trading::adjust_stop))
        .route("/api/trading/add-investment", post(trading::add_investment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .with_state(state)
}
