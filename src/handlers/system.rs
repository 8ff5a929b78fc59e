//! Public system endpoints: health, server info, tunnel discovery.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::Instant;

use crate::router::GateState;

static STARTED: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Pin the start instant; called once from `main` before serving.
pub fn mark_started() {
    let _ = *STARTED;
}

/// GET /api/health
pub async fn health(State(state): State<GateState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tradegate",
        "db_connected": state.db_connected(),
    }))
}

/// GET /api/server-info
pub async fn server_info(State(state): State<GateState>) -> Json<Value> {
    Json(json!({
        "name": "tradegate",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": STARTED.elapsed().as_secs(),
        "db_connected": state.db_connected(),
        "production": state.config().basic.production,
    }))
}

/// GET /api/tunnel-url: advertised public URL, if any.
pub async fn tunnel_url(State(state): State<GateState>) -> Json<Value> {
    Json(json!({ "url": state.config().basic.tunnel_url }))
}
