//! Casting API
//!
//! Entry point for the casting agency service.

use casting_api::config::Config;
use casting_api::observability::metrics::init_metrics_recorder;
use casting_api::routes::{self, AppState};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STATEMENT_TIMEOUT_SECS: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("Starting Casting API");

    let config =
        Config::from_env().inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        bind_address = %config.bind_address,
        jwks_url = %config.jwks_url,
        api_audience = %config.api_audience,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder()
        .inspect_err(|e| error!("Failed to install metrics recorder: {}", e))?;

    let pool = connect_database(&config.database_url).await?;

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .inspect_err(|e| error!("Invalid bind address: {}", e))?;
    let drain = Duration::from_secs(config.drain_seconds);

    let app = routes::build_routes(Arc::new(AppState { pool, config }), metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Casting API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain))
    .await?;

    info!("Casting API shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casting_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Open the pool with a per-statement timeout and apply pending migrations.
async fn connect_database(database_url: &str) -> Result<PgPool, Box<dyn std::error::Error>> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&add_query_timeout(database_url, STATEMENT_TIMEOUT_SECS))
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .inspect_err(|e| error!("Failed to run migrations: {}", e))?;

    info!("Database ready");
    Ok(pool)
}

/// Waits for SIGINT or SIGTERM, then for the drain period.
async fn shutdown_signal(drain: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    if drain.is_zero() {
        return;
    }
    warn!(drain_secs = drain.as_secs(), "Draining connections");
    tokio::time::sleep(drain).await;
    info!("Drain period complete");
}

/// Appends a `statement_timeout` to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}options=-c%20statement_timeout%3D{timeout_secs}s")
}
