use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row of the `users` table. Mutated only by the credential verifier
/// (failure counter / lock) and the bootstrap seeder.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One row of the `sessions` table. `id` is the opaque cookie token.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Authenticated identity injected into request extensions by the auth gate.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub session_id: String,
    pub session_expires_at: DateTime<Utc>,
}

/// Local trade record, marked closed best-effort after the downstream
/// service confirms an end-trade / close-order command.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRow {
    pub id: i64,
    pub symbol: String,
    pub side: String,
    pub status: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Persisted autopilot toggle, one row per symbol.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AutopilotFlag {
    pub symbol: String,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}
