use crate::db::models::{AutopilotFlag, Principal, SessionRow, TradeRow, UserRow};
use crate::db::schema::PG_INIT;
use crate::error::GateError;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

pub type DbPool = Pool<Postgres>;

/// Storage operations the auth and trading layers depend on.
///
/// Production uses [`PgStore`]; unit tests drive the same service code
/// against an in-memory double (`crate::db::mem`).
#[allow(async_fn_in_trait)]
pub trait AuthStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>, GateError>;

    /// Stored hash for a known principal, used by sensitive-action
    /// re-verification.
    async fn password_hash_for(&self, user_id: Uuid) -> Result<Option<String>, GateError>;

    /// Increment the failure counter for `email`, arming the lock once the
    /// post-increment counter reaches `threshold`. A no-op for unknown
    /// emails so failed lookups leave no observable trace.
    async fn record_login_failure(
        &self,
        email: &str,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<(), GateError>;

    async fn clear_login_failures(&self, user_id: Uuid) -> Result<(), GateError>;

    async fn insert_session(&self, session: &SessionRow) -> Result<(), GateError>;

    /// Fresh session-to-user join; succeeds only for an unexpired session
    /// owned by an active user. No session cache exists anywhere.
    async fn session_principal(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, GateError>;

    /// Push the expiry forward; never shortens it and never revives an
    /// already-expired session. Returns the new expiry when a row matched.
    async fn extend_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        new_expiry: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, GateError>;

    /// Idempotent; reports whether a row was actually removed.
    async fn delete_session(&self, session_id: &str) -> Result<bool, GateError>;

    async fn list_trades(&self) -> Result<Vec<TradeRow>, GateError>;

    /// Best-effort follow-up after a confirmed downstream close; returns the
    /// number of rows marked.
    async fn mark_trades_closed(&self, symbol: &str) -> Result<u64, GateError>;

    async fn set_autopilot(&self, symbol: &str, enabled: bool) -> Result<(), GateError>;

    async fn autopilot_flags(&self) -> Result<Vec<AutopilotFlag>, GateError>;

    async fn count_users(&self) -> Result<i64, GateError>;

    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<(), GateError>;

    /// Read rows from an allow-listed signal table (`db::registry`). The
    /// identifier is `'static` by construction and never request-derived.
    async fn signal_rows(
        &self,
        table: &'static str,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>, GateError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), GateError> {
        // sqlx::query runs one statement at a time; split the bundled DDL.
        for stmt in PG_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl AuthStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>, GateError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, email, password_hash, is_active, failed_attempts, locked_until, created_at
               FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn password_hash_for(&self, user_id: Uuid) -> Result<Option<String>, GateError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1 AND is_active")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hash)
    }

    async fn record_login_failure(
        &self,
        email: &str,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<(), GateError> {
        sqlx::query(
            r#"UPDATE users
               SET failed_attempts = failed_attempts + 1,
                   locked_until = CASE
                       WHEN failed_attempts + 1 >= $2 THEN $3
                       ELSE locked_until
                   END
               WHERE email = $1"#,
        )
        .bind(email)
        .bind(threshold)
        .bind(lock_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_login_failures(&self, user_id: Uuid) -> Result<(), GateError> {
        sqlx::query("UPDATE users SET failed_attempts = 0, locked_until = NULL WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_session(&self, session: &SessionRow) -> Result<(), GateError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn session_principal(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, GateError> {
        let principal = sqlx::query_as::<_, Principal>(
            r#"SELECT u.id AS user_id, u.email, s.id AS session_id, s.expires_at AS session_expires_at
               FROM sessions s
               JOIN users u ON u.id = s.user_id
               WHERE s.id = $1 AND s.expires_at > $2 AND u.is_active"#,
        )
        .bind(session_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(principal)
    }

    async fn extend_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        new_expiry: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, GateError> {
        let expiry: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"UPDATE sessions
               SET expires_at = GREATEST(expires_at, $3)
               WHERE id = $1 AND expires_at > $2
               RETURNING expires_at"#,
        )
        .bind(session_id)
        .bind(now)
        .bind(new_expiry)
        .fetch_optional(&self.pool)
        .await?;
        Ok(expiry)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, GateError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_trades(&self) -> Result<Vec<TradeRow>, GateError> {
        let rows = sqlx::query_as::<_, TradeRow>(
            r#"SELECT id, symbol, side, status, opened_at, closed_at
               FROM trades ORDER BY opened_at DESC LIMIT 500"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_trades_closed(&self, symbol: &str) -> Result<u64, GateError> {
        let result = sqlx::query(
            r#"UPDATE trades SET status = 'CLOSED', closed_at = now()
               WHERE symbol = $1 AND status = 'OPEN'"#,
        )
        .bind(symbol)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn set_autopilot(&self, symbol: &str, enabled: bool) -> Result<(), GateError> {
        sqlx::query(
            r#"INSERT INTO autopilot_flags (symbol, enabled, updated_at)
               VALUES ($1, $2, now())
               ON CONFLICT (symbol) DO UPDATE SET
                   enabled = excluded.enabled,
                   updated_at = excluded.updated_at"#,
        )
        .bind(symbol)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn autopilot_flags(&self) -> Result<Vec<AutopilotFlag>, GateError> {
        let rows = sqlx::query_as::<_, AutopilotFlag>(
            "SELECT symbol, enabled, updated_at FROM autopilot_flags ORDER BY symbol",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_users(&self) -> Result<i64, GateError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<(), GateError> {
        sqlx::query("INSERT INTO users (email, password_hash) VALUES ($1, $2)")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn signal_rows(
        &self,
        table: &'static str,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>, GateError> {
        // `table` comes from the static registry, never from the request.
        let sql = format!("SELECT row_to_json(t)::text FROM {table} t LIMIT $1");
        let rows: Vec<String> = sqlx::query_scalar(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|s| {
                serde_json::from_str(&s)
                    .map_err(|e| GateError::Internal(format!("signal row decode: {e}")))
            })
            .collect()
    }
}
