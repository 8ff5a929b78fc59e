//! Process configuration.
//!
//! Defaults are merged with `TRADEGATE_*` environment variables (nested keys
//! separated by `__`, e.g. `TRADEGATE_AUTH__LOCKOUT_THRESHOLD=8`). Tests build
//! a `Config` directly instead of going through the `CONFIG` static.

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: invalid tradegate configuration"));

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub basic: Basic,
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
    pub exec: ExecSettings,
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("TRADEGATE_").split("__"))
            .extract()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basic {
    pub bind: String,
    pub loglevel: String,
    /// Enables secure + SameSite=None cookies; off for local development.
    pub production: bool,
    /// Feature flag: expose the read-only signal endpoints without a session.
    pub public_reads: bool,
    /// Advertised public tunnel URL, if the dashboard is reached through one.
    pub tunnel_url: Option<Url>,
}

impl Default for Basic {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            production: false,
            public_reads: false,
            tunnel_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Consecutive failures after which an account locks.
    pub lockout_threshold: i32,
    /// Lock duration in seconds once the threshold is reached.
    pub lockout_window_secs: i64,
    /// Session lifetime in seconds; also the cookie max-age.
    pub session_ttl_secs: i64,
    pub session_cookie: String,
    /// Seeded into an empty users table at startup so a fresh deployment is
    /// reachable. Both must be set for seeding to happen.
    pub bootstrap_email: Option<String>,
    pub bootstrap_password: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            lockout_threshold: 8,
            lockout_window_secs: 15 * 60,
            session_ttl_secs: 7 * 24 * 60 * 60,
            session_cookie: "tradegate_session".to_string(),
            bootstrap_email: None,
            bootstrap_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "tradegate".to_string(),
            password: String::new(),
            name: "tradegate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecSettings {
    /// Base URL of the downstream trade-execution service.
    pub base_url: Url,
    /// Per-command timeout overrides in seconds, keyed by command slug
    /// (e.g. `close_order`). Commands keep their built-in bound otherwise.
    pub timeouts: HashMap<String, u64>,
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:9001").expect("static exec base url"),
            timeouts: HashMap::new(),
        }
    }
}
