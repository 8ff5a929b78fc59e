//! In-memory [`AuthStore`] double for unit tests. Mirrors the Postgres
//! semantics closely enough that the service layer's invariants can be
//! exercised without a live database.

use crate::db::models::{AutopilotFlag, Principal, SessionRow, TradeRow, UserRow};
use crate::db::store::AuthStore;
use crate::error::GateError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

#[derive(Default)]
pub struct MemStore {
    users: Mutex<Vec<UserRow>>,
    sessions: Mutex<Vec<SessionRow>>,
    trades: Mutex<Vec<TradeRow>>,
    autopilot: Mutex<HashMap<String, bool>>,
    /// Counts password-hash reads so tests can assert the authorizer makes
    /// zero store calls when the password field is absent.
    pub hash_lookups: AtomicUsize,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, email: &str, password: &str) -> Uuid {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: crate::service::credentials::hash_password(password)
                .expect("hash seed password"),
            is_active: true,
            failed_attempts: 0,
            locked_until: None,
            created_at: Utc::now(),
        };
        let id = row.id;
        self.users.lock().unwrap().push(row);
        id
    }

    pub fn deactivate_user(&self, user_id: Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == user_id) {
            u.is_active = false;
        }
    }

    pub fn user(&self, email: &str) -> Option<UserRow> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn hash_lookups(&self) -> usize {
        self.hash_lookups.load(Ordering::SeqCst)
    }

    pub fn push_trade(&self, symbol: &str, status: &str) {
        let mut trades = self.trades.lock().unwrap();
        let id = trades.len() as i64 + 1;
        trades.push(TradeRow {
            id,
            symbol: symbol.to_string(),
            side: "LONG".to_string(),
            status: status.to_string(),
            opened_at: Utc::now(),
            closed_at: None,
        });
    }
}

impl AuthStore for MemStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>, GateError> {
        Ok(self.user(email))
    }

    async fn password_hash_for(&self, user_id: Uuid) -> Result<Option<String>, GateError> {
        self.hash_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id && u.is_active)
            .map(|u| u.password_hash.clone()))
    }

    async fn record_login_failure(
        &self,
        email: &str,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<(), GateError> {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.email == email) {
            u.failed_attempts += 1;
            if u.failed_attempts >= threshold {
                u.locked_until = Some(lock_until);
            }
        }
        Ok(())
    }

    async fn clear_login_failures(&self, user_id: Uuid) -> Result<(), GateError> {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == user_id) {
            u.failed_attempts = 0;
            u.locked_until = None;
        }
        Ok(())
    }

    async fn insert_session(&self, session: &SessionRow) -> Result<(), GateError> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn session_principal(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, GateError> {
        let sessions = self.sessions.lock().unwrap();
        let Some(s) = sessions
            .iter()
            .find(|s| s.id == session_id && s.expires_at > now)
        else {
            return Ok(None);
        };
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.id == s.user_id && u.is_active)
            .map(|u| Principal {
                user_id: u.id,
                email: u.email.clone(),
                session_id: s.id.clone(),
                session_expires_at: s.expires_at,
            }))
    }

    async fn extend_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        new_expiry: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, GateError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.expires_at > now)
        {
            Some(s) => {
                s.expires_at = s.expires_at.max(new_expiry);
                Ok(Some(s.expires_at))
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, GateError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.id != session_id);
        Ok(sessions.len() < before)
    }

    async fn list_trades(&self) -> Result<Vec<TradeRow>, GateError> {
        Ok(self.trades.lock().unwrap().clone())
    }

    async fn mark_trades_closed(&self, symbol: &str) -> Result<u64, GateError> {
        let mut trades = self.trades.lock().unwrap();
        let mut marked = 0;
        for t in trades.iter_mut() {
            if t.symbol == symbol && t.status == "OPEN" {
                t.status = "CLOSED".to_string();
                t.closed_at = Some(Utc::now());
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn set_autopilot(&self, symbol: &str, enabled: bool) -> Result<(), GateError> {
        self.autopilot
            .lock()
            .unwrap()
            .insert(symbol.to_string(), enabled);
        Ok(())
    }

    async fn autopilot_flags(&self) -> Result<Vec<AutopilotFlag>, GateError> {
        let now = Utc::now();
        let mut flags: Vec<AutopilotFlag> = self
            .autopilot
            .lock()
            .unwrap()
            .iter()
            .map(|(symbol, enabled)| AutopilotFlag {
                symbol: symbol.clone(),
                enabled: *enabled,
                updated_at: now,
            })
            .collect();
        flags.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(flags)
    }

    async fn count_users(&self) -> Result<i64, GateError> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<(), GateError> {
        self.users.lock().unwrap().push(UserRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            failed_attempts: 0,
            locked_until: None,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn signal_rows(
        &self,
        _table: &'static str,
        _limit: i64,
    ) -> Result<Vec<serde_json::Value>, GateError> {
        Ok(Vec::new())
    }
}
