//! Database connection bootstrap.
//!
//! Builds an ordered list of connection candidates from deployment
//! heuristics, then walks them with a bounded round counter. The walk itself
//! is a pure state machine (`CandidateWalk`) so candidate exhaustion, round
//! exhaustion and success are each unit-testable without a live server.

use crate::config::DatabaseSettings;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::time::Duration;
use tracing::{info, warn};

/// Full candidate list is retried this many times before giving up.
pub const CONNECT_ROUNDS: u32 = 2;
/// Pause between rounds.
pub const ROUND_BACKOFF: Duration = Duration::from_secs(5);

const CANDIDATE_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_MAX_CONNECTIONS: u32 = 5;

/// Suffixes of managed-database hosts that commonly terminate TLS at a proxy,
/// so a plain connection is worth trying first.
const MANAGED_HOST_SUFFIXES: &[&str] = &[".railway.internal", ".rds.amazonaws.com", ".neon.tech"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Disable,
    Require,
}

/// One fully specified connection attempt. Generated per connect cycle,
/// discarded once a usable handle exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionCandidate {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub tls: TlsMode,
}

impl ConnectionCandidate {
    fn options(&self) -> PgConnectOptions {
        let ssl = match self.tls {
            TlsMode::Disable => PgSslMode::Disable,
            TlsMode::Require => PgSslMode::Require,
        };
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(ssl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostClass {
    Local,
    ManagedCloud,
    Other,
}

fn classify_host(host: &str) -> HostClass {
    if host == "localhost" || host == "127.0.0.1" || host == "::1" {
        return HostClass::Local;
    }
    if MANAGED_HOST_SUFFIXES.iter().any(|s| host.ends_with(s)) {
        return HostClass::ManagedCloud;
    }
    HostClass::Other
}

/// Ordered candidate list for one connect cycle.
///
/// Local hosts rarely speak TLS, managed-cloud proxies usually accept plain
/// connections on the internal leg, and anything else is assumed to be a
/// public host where TLS comes first and plain is a last resort.
pub fn candidates(db: &DatabaseSettings) -> Vec<ConnectionCandidate> {
    let with = |tls| ConnectionCandidate {
        host: db.host.clone(),
        port: db.port,
        user: db.user.clone(),
        password: db.password.clone(),
        database: db.name.clone(),
        tls,
    };
    match classify_host(&db.host) {
        HostClass::Local => vec![with(TlsMode::Disable)],
        HostClass::ManagedCloud => vec![with(TlsMode::Disable), with(TlsMode::Require)],
        HostClass::Other => vec![with(TlsMode::Require), with(TlsMode::Disable)],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Attempt candidate at this index.
    Try(usize),
    /// Round exhausted; sleep before the next one.
    Backoff,
    /// All rounds exhausted; the caller must treat the handle as absent.
    GiveUp,
}

/// Pure iteration state for the bounded retry: N candidates per round,
/// `rounds` rounds, one backoff between rounds, then give up for good.
#[derive(Debug)]
pub struct CandidateWalk {
    candidates: usize,
    rounds: u32,
    next: usize,
    round: u32,
    done: bool,
}

impl CandidateWalk {
    pub fn new(candidates: usize, rounds: u32) -> Self {
        Self {
            candidates,
            rounds,
            next: 0,
            round: 0,
            done: candidates == 0 || rounds == 0,
        }
    }

    pub fn advance(&mut self) -> WalkStep {
        if self.done {
            return WalkStep::GiveUp;
        }
        if self.next < self.candidates {
            let step = WalkStep::Try(self.next);
            self.next += 1;
            return step;
        }
        self.round += 1;
        if self.round >= self.rounds {
            self.done = true;
            return WalkStep::GiveUp;
        }
        self.next = 0;
        WalkStep::Backoff
    }
}

/// Establish the process-lifetime database handle.
///
/// Returns `None` when every candidate in every round fails. Callers must
/// degrade (empty results, 503) rather than crash; the state is permanent
/// until restart.
pub async fn connect(db: &DatabaseSettings) -> Option<PgPool> {
    let cands = candidates(db);
    let mut walk = CandidateWalk::new(cands.len(), CONNECT_ROUNDS);
    loop {
        match walk.advance() {
            WalkStep::Try(i) => {
                let cand = &cands[i];
                match try_candidate(cand).await {
                    Ok(pool) => {
                        info!(
                            host = %cand.host,
                            port = cand.port,
                            tls = ?cand.tls,
                            "database connection established"
                        );
                        return Some(pool);
                    }
                    Err(e) => {
                        warn!(host = %cand.host, tls = ?cand.tls, error = %e, "candidate failed");
                    }
                }
            }
            WalkStep::Backoff => {
                info!(backoff = ?ROUND_BACKOFF, "candidate list exhausted, retrying after backoff");
                tokio::time::sleep(ROUND_BACKOFF).await;
            }
            WalkStep::GiveUp => {
                warn!(rounds = CONNECT_ROUNDS, "database unavailable, running degraded");
                return None;
            }
        }
    }
}

async fn try_candidate(cand: &ConnectionCandidate) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(POOL_MAX_CONNECTIONS)
        .acquire_timeout(CANDIDATE_ACQUIRE_TIMEOUT)
        .connect_with(cand.options())
        .await?;
    // Lightweight liveness probe; a pool that cannot run SELECT 1 is no handle.
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}
