use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tradegate::api::ExecApi;
use tradegate::db;
use tradegate::db::store::PgStore;
use tradegate::handlers::system;
use tradegate::router::{GateState, gate_router};
use tradegate::service::credentials;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = tradegate::config::CONFIG.clone();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        bind = %cfg.basic.bind,
        db_host = %cfg.database.host,
        exec = %cfg.exec.base_url,
        public_reads = cfg.basic.public_reads,
        production = cfg.basic.production,
        "starting tradegate"
    );

    // Bounded candidate walk; None means we run degraded until restart.
    let pool = db::connect(&cfg.database).await;
    if let Some(pool) = &pool {
        let store = PgStore::new(pool.clone());
        store.init_schema().await?;
        if let Err(e) = credentials::bootstrap_admin(&store, &cfg.auth).await {
            warn!(error = %e, "bootstrap admin seeding failed");
        }
    } else {
        warn!("starting without a database handle; auth and writes will 503");
    }

    let exec = ExecApi::new(&cfg.exec);
    let state = GateState::new(cfg.clone(), pool, exec);
    let app = gate_router(state);

    system::mark_started();
    let listener = TcpListener::bind(&cfg.basic.bind).await?;
    info!("HTTP server listening on {}", cfg.basic.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}
