//! Sensitive-action authorization.
//!
//! Every money-moving command re-proves intent with a password in the
//! request body, independent of session validity. A stolen session cookie
//! alone is not enough to move money. Authorization is a strict
//! precondition: on any failure here the execution proxy is never invoked.

use crate::db::models::Principal;
use crate::db::store::AuthStore;
use crate::error::GateError;
use crate::service::credentials;

/// Re-verify `password` against the stored hash of the *same* principal the
/// session resolved to.
///
/// Failure modes, in order:
/// - missing/blank password: `Validation`, with zero store calls
/// - principal no longer resolvable (deactivated mid-session): `SessionExpired`
/// - hash mismatch: `PasswordMismatch`
pub async fn verify_action_password<S: AuthStore>(
    store: &S,
    principal: &Principal,
    password: Option<&str>,
) -> Result<(), GateError> {
    let password = password
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| GateError::Validation("Password required".to_string()))?;

    let hash = store
        .password_hash_for(principal.user_id)
        .await?
        .ok_or(GateError::SessionExpired)?;

    if credentials::verify_password(password, &hash)? {
        Ok(())
    } else {
        Err(GateError::PasswordMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::db::mem::MemStore;
    use crate::service::sessions;

    async fn seeded() -> (MemStore, Principal) {
        let store = MemStore::new();
        let user_id = store.seed_user("ops@x.com", "hunter2!");
        let session = sessions::create(&store, &AuthSettings::default(), user_id)
            .await
            .unwrap();
        let principal = sessions::validate(&store, Some(&session.id)).await.unwrap();
        (store, principal)
    }

    #[tokio::test]
    async fn missing_password_is_validation_error_with_no_store_call() {
        let (store, principal) = seeded().await;
        let before = store.hash_lookups();

        let missing = verify_action_password(&store, &principal, None).await;
        let blank = verify_action_password(&store, &principal, Some("   ")).await;

        assert!(matches!(missing, Err(GateError::Validation(_))));
        assert!(matches!(blank, Err(GateError::Validation(_))));
        assert_eq!(store.hash_lookups(), before, "no hash lookup may happen");
    }

    #[tokio::test]
    async fn wrong_password_is_password_mismatch() {
        let (store, principal) = seeded().await;
        let result = verify_action_password(&store, &principal, Some("not-it")).await;
        assert!(matches!(result, Err(GateError::PasswordMismatch)));
    }

    #[tokio::test]
    async fn correct_password_authorizes() {
        let (store, principal) = seeded().await;
        verify_action_password(&store, &principal, Some("hunter2!"))
            .await
            .expect("correct password authorizes the action");
    }

    #[tokio::test]
    async fn deactivated_principal_is_rejected() {
        let (store, principal) = seeded().await;
        store.deactivate_user(principal.user_id);
        let result = verify_action_password(&store, &principal, Some("hunter2!")).await;
        assert!(matches!(result, Err(GateError::SessionExpired)));
    }
}
