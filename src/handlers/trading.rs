//! Sensitive trading actions.
//!
//! Each command follows the same strict order: re-verify the action
//! password for the authenticated principal, normalize parameters, then
//! forward exactly one call downstream. The downstream response is returned
//! verbatim; for end-trade and close-order a successful response triggers a
//! best-effort local mark-closed that never changes what the caller sees,
//! since the authoritative action already happened downstream.
//!
//! The command runners are generic over [`AuthStore`] so the ordering
//! invariants are testable against the in-memory store and a local stand-in
//! for the execution service.

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::api::{ExecApi, ExecCommand, ExecReply};
use crate::db::models::Principal;
use crate::db::store::AuthStore;
use crate::error::GateError;
use crate::router::GateState;
use crate::service::authorizer;
use crate::types::trading::{
    AddInvestmentBody, AutopilotBody, CloseOrderBody, EndTradeBody, HedgeBody, OrderBody,
    PartialCloseBody, StopPriceBody, normalize_symbol,
};

/// Password check, parameter build, one forward. Shared by every command
/// that has no local follow-up write.
async fn verify_then_forward<S: AuthStore>(
    store: &S,
    exec: &ExecApi,
    principal: &Principal,
    password: Option<&str>,
    command: ExecCommand,
    build_payload: impl FnOnce() -> Result<Value, GateError>,
) -> Result<ExecReply, GateError> {
    authorizer::verify_action_password(store, principal, password).await?;
    let payload = build_payload()?;
    exec.forward(command, &payload).await
}

fn respond(reply: ExecReply) -> axum::response::Response {
    (reply.status, Json(reply.body)).into_response()
}

/// POST /api/trading/autopilot
pub async fn toggle_autopilot(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AutopilotBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = run_toggle_autopilot(&store, state.exec(), &principal, body).await?;
    Ok(respond(reply))
}

async fn run_toggle_autopilot<S: AuthStore>(
    store: &S,
    exec: &ExecApi,
    principal: &Principal,
    body: AutopilotBody,
) -> Result<ExecReply, GateError> {
    authorizer::verify_action_password(store, principal, body.password.as_deref()).await?;
    let symbol = normalize_symbol(&body.symbol)?;
    let payload = json!({ "symbol": symbol, "enabled": body.enabled });

    let reply = exec.forward(ExecCommand::ToggleAutopilot, &payload).await?;
    if reply.status.is_success() {
        // Persisted flag store; survives restarts and multiple instances.
        if let Err(e) = store.set_autopilot(&symbol, body.enabled).await {
            warn!(%symbol, error = %e, "autopilot flag persist failed");
        }
    }
    Ok(reply)
}

/// POST /api/trading/order
pub async fn execute_order(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<OrderBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = verify_then_forward(
        &store,
        state.exec(),
        &principal,
        body.password.as_deref(),
        ExecCommand::ExecuteOrder,
        || {
            let symbol = normalize_symbol(&body.symbol)?;
            Ok(json!({
                "symbol": symbol,
                "positionSide": body.side.as_str(),
                "amount": body.amount,
                "leverage": body.leverage,
            }))
        },
    )
    .await?;
    Ok(respond(reply))
}

/// POST /api/trading/close-order
pub async fn close_order(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CloseOrderBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = run_close_order(&store, state.exec(), &principal, body).await?;
    Ok(respond(reply))
}

async fn run_close_order<S: AuthStore>(
    store: &S,
    exec: &ExecApi,
    principal: &Principal,
    body: CloseOrderBody,
) -> Result<ExecReply, GateError> {
    authorizer::verify_action_password(store, principal, body.password.as_deref()).await?;
    let symbol = normalize_symbol(&body.symbol)?;
    let payload = json!({
        "symbol": symbol,
        "positionSide": body.side.map(|s| s.as_str()),
    });

    let reply = exec.forward(ExecCommand::CloseOrder, &payload).await?;
    if reply.status.is_success() {
        mark_closed_best_effort(store, &symbol).await;
    }
    Ok(reply)
}

/// POST /api/trading/end-trade
pub async fn end_trade(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<EndTradeBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = run_end_trade(&store, state.exec(), &principal, body).await?;
    Ok(respond(reply))
}

async fn run_end_trade<S: AuthStore>(
    store: &S,
    exec: &ExecApi,
    principal: &Principal,
    body: EndTradeBody,
) -> Result<ExecReply, GateError> {
    authorizer::verify_action_password(store, principal, body.password.as_deref()).await?;
    let symbol = normalize_symbol(&body.symbol)?;
    let payload = json!({ "symbol": symbol });

    let reply = exec.forward(ExecCommand::EndTrade, &payload).await?;
    if reply.status.is_success() {
        mark_closed_best_effort(store, &symbol).await;
    }
    Ok(reply)
}

/// POST /api/trading/hedge
pub async fn hedge(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<HedgeBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = verify_then_forward(
        &store,
        state.exec(),
        &principal,
        body.password.as_deref(),
        ExecCommand::Hedge,
        || {
            let symbol = normalize_symbol(&body.symbol)?;
            Ok(json!({ "symbol": symbol, "ratio": body.ratio }))
        },
    )
    .await?;
    Ok(respond(reply))
}

/// POST /api/trading/partial-close
pub async fn partial_close(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<PartialCloseBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = verify_then_forward(
        &store,
        state.exec(),
        &principal,
        body.password.as_deref(),
        ExecCommand::PartialClose,
        || {
            let symbol = normalize_symbol(&body.symbol)?;
            if !(body.fraction > 0.0 && body.fraction <= 1.0) {
                return Err(GateError::Validation(
                    "Fraction must be in (0, 1]".to_string(),
                ));
            }
            Ok(json!({ "symbol": symbol, "fraction": body.fraction }))
        },
    )
    .await?;
    Ok(respond(reply))
}

/// POST /api/trading/stop-price
pub async fn adjust_stop(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<StopPriceBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = verify_then_forward(
        &store,
        state.exec(),
        &principal,
        body.password.as_deref(),
        ExecCommand::AdjustStop,
        || {
            let symbol = normalize_symbol(&body.symbol)?;
            if !body.stop_price.is_finite() || body.stop_price <= 0.0 {
                return Err(GateError::Validation(
                    "Stop price must be positive".to_string(),
                ));
            }
            Ok(json!({ "symbol": symbol, "stopPrice": body.stop_price }))
        },
    )
    .await?;
    Ok(respond(reply))
}

/// POST /api/trading/add-investment
pub async fn add_investment(
    State(state): State<GateState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AddInvestmentBody>,
) -> Result<impl IntoResponse, GateError> {
    let store = state.require_store()?;
    let reply = verify_then_forward(
        &store,
        state.exec(),
        &principal,
        body.password.as_deref(),
        ExecCommand::AddInvestment,
        || {
            let symbol = normalize_symbol(&body.symbol)?;
            if !body.amount.is_finite() || body.amount <= 0.0 {
                return Err(GateError::Validation("Amount must be positive".to_string()));
            }
            Ok(json!({ "symbol": symbol, "amount": body.amount }))
        },
    )
    .await?;
    Ok(respond(reply))
}

/// Independently failable follow-up after a confirmed downstream close. A
/// failure is logged and nothing else; the response already reflects the
/// authoritative downstream outcome.
async fn mark_closed_best_effort<S: AuthStore>(store: &S, symbol: &str) {
    match store.mark_trades_closed(symbol).await {
        Ok(marked) => info!(%symbol, marked, "local trades marked closed"),
        Err(e) => warn!(%symbol, error = %e, "local mark-closed failed"),
    }
}
