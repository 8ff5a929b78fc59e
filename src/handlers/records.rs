//! Read-only record endpoints. All of them degrade to an explicit
//! `connected: false` payload when the database handle is absent, so the
//! dashboard keeps rendering instead of erroring out.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::db::registry;
use crate::db::store::AuthStore;
use crate::error::GateError;
use crate::router::GateState;

const SIGNAL_ROW_LIMIT: i64 = 200;

/// GET /api/trades
pub async fn list_trades(State(state): State<GateState>) -> Result<Json<Value>, GateError> {
    let Some(store) = state.store() else {
        return Ok(Json(json!({ "connected": false, "trades": [] })));
    };
    let trades = store.list_trades().await?;
    Ok(Json(json!({ "connected": true, "trades": trades })))
}

/// GET /api/signals/{table}. The table name is resolved against the allow-list
/// registry; nothing request-derived reaches SQL.
pub async fn signal_rows(
    State(state): State<GateState>,
    Path(table): Path<String>,
) -> Result<Json<Value>, GateError> {
    let Some(table) = registry::signal_table(&table) else {
        return Err(GateError::Validation(format!(
            "Unknown signal table: {table:?}"
        )));
    };
    let Some(store) = state.store() else {
        return Ok(Json(json!({ "connected": false, "table": table, "rows": [] })));
    };
    let rows = store.signal_rows(table, SIGNAL_ROW_LIMIT).await?;
    Ok(Json(json!({ "connected": true, "table": table, "rows": rows })))
}

/// GET /api/signals-status: registry contents plus persisted autopilot flags.
pub async fn signals_status(State(state): State<GateState>) -> Result<Json<Value>, GateError> {
    let tables = registry::signal_tables();
    let Some(store) = state.store() else {
        return Ok(Json(json!({
            "connected": false,
            "tables": tables,
            "autopilot": [],
        })));
    };
    let autopilot = store.autopilot_flags().await?;
    Ok(Json(json!({
        "connected": true,
        "tables": tables,
        "autopilot": autopilot,
    })))
}
