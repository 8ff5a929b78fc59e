//! Credential verification and the login flow, including the lockout
//! counter. This is the only code that mutates user rows.

use crate::config::AuthSettings;
use crate::db::models::SessionRow;
use crate::db::store::AuthStore;
use crate::error::GateError;
use crate::service::lockout::LockoutState;
use crate::service::sessions;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, password_hash::rand_core::OsRng};
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

pub fn hash_password(password: &str) -> Result<String, GateError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| GateError::Internal(format!("password hashing failed: {e}")))
}

/// Constant-time verify against a stored PHC hash. A malformed stored hash
/// is an internal error, not a credential failure.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, GateError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| GateError::Internal(format!("stored password hash unparseable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub email: String,
    pub session: SessionRow,
}

/// Authenticate and open a session.
///
/// Every failure sub-case (unknown email, inactive account, active lock
/// even with the correct password, wrong password) records a failure for
/// the presented email and collapses into the one generic
/// [`GateError::InvalidCredentials`]. The failure UPDATE is a no-op for
/// unknown emails, so the two cases are indistinguishable by side effect too.
pub async fn login<S: AuthStore>(
    store: &S,
    auth: &AuthSettings,
    email: &str,
    password: &str,
) -> Result<LoginOutcome, GateError> {
    let email = email.trim().to_lowercase();
    let now = Utc::now();

    if let Some(user) = store.find_user_by_email(&email).await? {
        let unlocked = !LockoutState::derive(user.locked_until, now).is_locked();
        if user.is_active && unlocked && verify_password(password, &user.password_hash)? {
            store.clear_login_failures(user.id).await?;
            let session = sessions::create(store, auth, user.id).await?;
            info!(user = %user.email, "login succeeded");
            return Ok(LoginOutcome {
                user_id: user.id,
                email: user.email,
                session,
            });
        }
    }

    let lock_until = now + Duration::seconds(auth.lockout_window_secs);
    store
        .record_login_failure(&email, auth.lockout_threshold, lock_until)
        .await?;
    Err(GateError::InvalidCredentials)
}

/// Seed one active user into an empty users table so a fresh deployment has
/// an operator account. Does nothing unless both bootstrap values are set.
pub async fn bootstrap_admin<S: AuthStore>(
    store: &S,
    auth: &AuthSettings,
) -> Result<(), GateError> {
    let (Some(email), Some(password)) = (&auth.bootstrap_email, &auth.bootstrap_password) else {
        return Ok(());
    };
    if store.count_users().await? > 0 {
        return Ok(());
    }
    let hash = hash_password(password)?;
    store
        .insert_user(&email.trim().to_lowercase(), &hash)
        .await?;
    info!(user = %email, "bootstrap admin user created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mem::MemStore;

    fn auth() -> AuthSettings {
        AuthSettings::default()
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_fail_identically() {
        let store = MemStore::new();
        store.seed_user("ops@x.com", "hunter2!");

        let unknown = login(&store, &auth(), "ghost@x.com", "whatever").await;
        let wrong = login(&store, &auth(), "ops@x.com", "not-it").await;
        assert!(matches!(unknown, Err(GateError::InvalidCredentials)));
        assert!(matches!(wrong, Err(GateError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn correct_login_resets_counter_and_creates_session() {
        let store = MemStore::new();
        store.seed_user("ops@x.com", "hunter2!");
        for _ in 0..3 {
            let _ = login(&store, &auth(), "ops@x.com", "bad").await;
        }
        assert_eq!(store.user("ops@x.com").unwrap().failed_attempts, 3);

        let outcome = login(&store, &auth(), "ops@x.com", "hunter2!")
            .await
            .expect("login should succeed");
        assert_eq!(store.user("ops@x.com").unwrap().failed_attempts, 0);
        assert_eq!(store.session_count(), 1);
        assert_eq!(outcome.session.user_id, outcome.user_id);
    }

    #[tokio::test]
    async fn eighth_failure_locks_and_correct_password_still_fails() {
        let store = MemStore::new();
        store.seed_user("ops@x.com", "hunter2!");
        for _ in 0..7 {
            let _ = login(&store, &auth(), "ops@x.com", "bad").await;
        }
        assert!(store.user("ops@x.com").unwrap().locked_until.is_none());

        let _ = login(&store, &auth(), "ops@x.com", "bad").await;
        let user = store.user("ops@x.com").unwrap();
        assert_eq!(user.failed_attempts, 8);
        assert!(user.locked_until.is_some(), "threshold arms the lock");

        // 9th attempt with the *correct* password during the window.
        let locked_out = login(&store, &auth(), "ops@x.com", "hunter2!").await;
        assert!(matches!(locked_out, Err(GateError::InvalidCredentials)));
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn login_succeeds_once_the_lock_window_elapses() {
        let store = MemStore::new();
        let mut cfg = auth();
        cfg.lockout_window_secs = -1; // lock expires immediately
        store.seed_user("ops@x.com", "hunter2!");
        for _ in 0..8 {
            let _ = login(&store, &cfg, "ops@x.com", "bad").await;
        }
        assert!(store.user("ops@x.com").unwrap().locked_until.is_some());

        login(&store, &cfg, "ops@x.com", "hunter2!")
            .await
            .expect("elapsed lock no longer gates");
        let user = store.user("ops@x.com").unwrap();
        assert_eq!(user.failed_attempts, 0);
        assert!(user.locked_until.is_none());
    }

    #[tokio::test]
    async fn inactive_user_cannot_log_in() {
        let store = MemStore::new();
        let id = store.seed_user("ops@x.com", "hunter2!");
        store.deactivate_user(id);
        let result = login(&store, &auth(), "ops@x.com", "hunter2!").await;
        assert!(matches!(result, Err(GateError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn email_is_trimmed_and_lowercased() {
        let store = MemStore::new();
        store.seed_user("ops@x.com", "hunter2!");
        login(&store, &auth(), "  Ops@X.com ", "hunter2!")
            .await
            .expect("normalized email matches");
    }

    #[tokio::test]
    async fn bootstrap_seeds_only_an_empty_table() {
        let store = MemStore::new();
        let mut cfg = auth();
        cfg.bootstrap_email = Some("admin@x.com".into());
        cfg.bootstrap_password = Some("first-light".into());

        bootstrap_admin(&store, &cfg).await.unwrap();
        assert!(store.user("admin@x.com").is_some());

        store.seed_user("second@x.com", "pw");
        bootstrap_admin(&store, &cfg).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 2);
    }
}
