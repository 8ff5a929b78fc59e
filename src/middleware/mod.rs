pub mod auth_gate;

pub use auth_gate::{PathClass, auth_gate, classify};
