//! Account lockout state, derived on the fly from the user row.

use chrono::{DateTime, Utc};

/// Derived lockout state. Not stored anywhere; always recomputed from
/// `failed_attempts` / `locked_until` so it is fresh on every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Unlocked,
    Locked { until: DateTime<Utc> },
}

impl LockoutState {
    /// The lock is a hard gate: while `locked_until` is in the future the
    /// account rejects logins regardless of password correctness.
    pub fn derive(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match locked_until {
            Some(until) if until > now => LockoutState::Locked { until },
            _ => LockoutState::Unlocked,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LockoutState::Locked { .. })
    }
}
