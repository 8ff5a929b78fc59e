//! Database module: models, schema and access for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (Postgres)
//! - `store.rs`: the `AuthStore` trait and its Postgres implementation
//! - `connect.rs`: candidate-based connection bootstrap
//! - `registry.rs`: allow-listed signal table identifiers

pub mod connect;
#[cfg(test)]
pub mod mem;
pub mod models;
pub mod registry;
pub mod schema;
pub mod store;

pub use connect::{CandidateWalk, ConnectionCandidate, WalkStep, connect};
pub use models::{Principal, SessionRow, TradeRow, UserRow};
pub use schema::PG_INIT;
pub use store::{AuthStore, DbPool, PgStore};
