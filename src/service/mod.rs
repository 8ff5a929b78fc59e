//! Service layer: credential verification, lockout, session lifecycle and
//! sensitive-action authorization. All functions are generic over
//! [`crate::db::store::AuthStore`] so the invariants are testable without a
//! live database.

pub mod authorizer;
pub mod credentials;
pub mod lockout;
pub mod sessions;
