//! Request bodies and parameter normalization for sensitive trading
//! commands. Normalization happens only after authorization succeeds.

use crate::error::GateError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Position side allow-list. Anything outside {LONG, SHORT, BOTH} is a
/// validation error before it can reach the downstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PositionSide {
    Long,
    Short,
    Both,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
            PositionSide::Both => "BOTH",
        }
    }
}

impl TryFrom<String> for PositionSide {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LONG" => Ok(PositionSide::Long),
            "SHORT" => Ok(PositionSide::Short),
            "BOTH" => Ok(PositionSide::Both),
            other => Err(format!("invalid position side: {other:?}")),
        }
    }
}

/// Uppercased, trimmed exchange symbol. Rejects empty and non-alphanumeric
/// input so a symbol can never smuggle structure into a downstream payload.
pub fn normalize_symbol(raw: &str) -> Result<String, GateError> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() || symbol.len() > 20 {
        return Err(GateError::Validation("Symbol required".to_string()));
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GateError::Validation(format!("Invalid symbol: {raw:?}")));
    }
    Ok(symbol)
}

/// Accepts a JSON number or a numeric string; browsers and the legacy
/// dashboard send both.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid number {s:?}: {e}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected number, got {other}"
        ))),
    }
}

pub fn lenient_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid number {s:?}: {e}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected number, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct AutopilotBody {
    pub password: Option<String>,
    pub symbol: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrderBody {
    pub password: Option<String>,
    pub symbol: String,
    pub side: PositionSide,
    #[serde(deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient_f64_opt")]
    pub leverage: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CloseOrderBody {
    pub password: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub side: Option<PositionSide>,
}

#[derive(Debug, Deserialize)]
pub struct EndTradeBody {
    pub password: Option<String>,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct HedgeBody {
    pub password: Option<String>,
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_f64_opt")]
    pub ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialCloseBody {
    pub password: Option<String>,
    pub symbol: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub fraction: f64,
}

#[derive(Debug, Deserialize)]
pub struct StopPriceBody {
    pub password: Option<String>,
    pub symbol: String,
    #[serde(alias = "stopPrice", deserialize_with = "lenient_f64")]
    pub stop_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct AddInvestmentBody {
    pub password: Option<String>,
    pub symbol: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub amount: f64,
}
