//! HTTP client for the downstream trade-execution service.
//!
//! One outbound call per authorized request, with a command-specific bounded
//! timeout and no retry of any kind: the downstream side effects (placing
//! and closing real exchange orders) are not idempotent, and a blind retry
//! could duplicate a trade. Ordering between concurrent commands for the
//! same symbol is owned downstream, not here.

use crate::config::ExecSettings;
use crate::error::GateError;
use axum::http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecCommand {
    ToggleAutopilot,
    ExecuteOrder,
    CloseOrder,
    EndTrade,
    Hedge,
    PartialClose,
    AdjustStop,
    AddInvestment,
    Status,
    RecalcSignals,
}

impl ExecCommand {
    /// Config key for per-command timeout overrides.
    pub fn slug(&self) -> &'static str {
        match self {
            ExecCommand::ToggleAutopilot => "toggle_autopilot",
            ExecCommand::ExecuteOrder => "execute_order",
            ExecCommand::CloseOrder => "close_order",
            ExecCommand::EndTrade => "end_trade",
            ExecCommand::Hedge => "hedge",
            ExecCommand::PartialClose => "partial_close",
            ExecCommand::AdjustStop => "adjust_stop",
            ExecCommand::AddInvestment => "add_investment",
            ExecCommand::Status => "status",
            ExecCommand::RecalcSignals => "recalc_signals",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            ExecCommand::ToggleAutopilot => "/api/bot/autopilot",
            ExecCommand::ExecuteOrder => "/api/bot/order",
            ExecCommand::CloseOrder => "/api/bot/close-order",
            ExecCommand::EndTrade => "/api/bot/end-trade",
            ExecCommand::Hedge => "/api/bot/hedge",
            ExecCommand::PartialClose => "/api/bot/partial-close",
            ExecCommand::AdjustStop => "/api/bot/stop-price",
            ExecCommand::AddInvestment => "/api/bot/add-investment",
            ExecCommand::Status => "/api/bot/status",
            ExecCommand::RecalcSignals => "/api/bot/recalc-signals",
        }
    }

    /// Built-in timeout bound. Status is a lightweight query; signal
    /// recalculation can legitimately run for minutes.
    pub fn default_timeout_secs(&self) -> u64 {
        match self {
            ExecCommand::Status => 10,
            ExecCommand::RecalcSignals => 300,
            _ => 30,
        }
    }
}

/// Downstream response, forwarded verbatim to the dashboard caller.
#[derive(Debug)]
pub struct ExecReply {
    pub status: StatusCode,
    pub body: Value,
}

pub struct ExecApi {
    client: reqwest::Client,
    base_url: Url,
    timeouts: HashMap<String, u64>,
    calls: AtomicU64,
}

impl ExecApi {
    pub fn new(cfg: &ExecSettings) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tradegate/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("FATAL: initialize execution-proxy HTTP client failed");
        Self {
            client,
            base_url: cfg.base_url.clone(),
            timeouts: cfg.timeouts.clone(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn timeout_for(&self, command: ExecCommand) -> Duration {
        let secs = self
            .timeouts
            .get(command.slug())
            .copied()
            .unwrap_or_else(|| command.default_timeout_secs());
        Duration::from_secs(secs)
    }

    /// Total outbound calls issued since startup. Exists so tests (and a
    /// curious operator) can verify the one-call-per-request invariant.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Issue exactly one POST for this command. Network failure and timeout
    /// are reported as distinct errors; neither triggers a retry.
    pub async fn forward(
        &self,
        command: ExecCommand,
        params: &Value,
    ) -> Result<ExecReply, GateError> {
        let url = self
            .base_url
            .join(command.path())
            .map_err(|e| GateError::Internal(format!("exec url: {e}")))?;

        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(command = command.slug(), %url, "forwarding to execution service");

        let response = self
            .client
            .post(url)
            .timeout(self.timeout_for(command))
            .json(params)
            .send()
            .await
            .map_err(|e| classify_send_error(command, e))?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GateError::DownstreamTimeout(format!("{}: {e}", command.slug()))
            } else {
                // The POST was delivered; only the reply is unreadable. Must
                // not look like "never reached", or an operator re-issues a
                // trade that may have executed.
                GateError::DownstreamMalformed(format!("{}: {e}", command.slug()))
            }
        })?;

        Ok(ExecReply { status, body })
    }
}

fn classify_send_error(command: ExecCommand, e: reqwest::Error) -> GateError {
    if e.is_timeout() {
        GateError::DownstreamTimeout(format!("{}: {e}", command.slug()))
    } else {
        GateError::DownstreamUnavailable(format!("{}: {e}", command.slug()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_with(overrides: &[(&str, u64)]) -> ExecApi {
        let mut cfg = ExecSettings::default();
        for (k, v) in overrides {
            cfg.timeouts.insert((*k).to_string(), *v);
        }
        ExecApi::new(&cfg)
    }

    #[test]
    fn timeout_bounds_per_command() {
        let api = api_with(&[]);
        assert_eq!(api.timeout_for(ExecCommand::Status), Duration::from_secs(10));
        assert_eq!(
            api.timeout_for(ExecCommand::RecalcSignals),
            Duration::from_secs(300)
        );
        assert_eq!(
            api.timeout_for(ExecCommand::CloseOrder),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn config_overrides_win() {
        let api = api_with(&[("close_order", 60)]);
        assert_eq!(
            api.timeout_for(ExecCommand::CloseOrder),
            Duration::from_secs(60)
        );
    }

    #[tokio::test]
    async fn unreachable_downstream_is_reported_without_retry() {
        let mut cfg = ExecSettings::default();
        // Port 1 is never listening locally; the connect fails immediately.
        cfg.base_url = Url::parse("http://127.0.0.1:1").unwrap();
        let api = ExecApi::new(&cfg);

        let result = api
            .forward(ExecCommand::CloseOrder, &serde_json::json!({"symbol": "BTCUSDT"}))
            .await;
        assert!(matches!(result, Err(GateError::DownstreamUnavailable(_))));
        assert_eq!(api.calls(), 1, "exactly one outbound attempt");
    }

    #[tokio::test]
    async fn unreadable_response_is_not_reported_as_unreachable() {
        use axum::Router;

        // A downstream that answers, but not with JSON.
        let app = Router::new().fallback(|| async { "pong" });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut cfg = ExecSettings::default();
        cfg.base_url = Url::parse(&format!("http://{addr}/")).unwrap();
        let api = ExecApi::new(&cfg);

        let result = api.forward(ExecCommand::Status, &serde_json::json!({})).await;
        assert!(matches!(result, Err(GateError::DownstreamMalformed(_))));
        assert_eq!(api.calls(), 1);
    }
}
