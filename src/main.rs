use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use channel_manager::availability::HttpCalendarFeed;
use channel_manager::config::Config;
use channel_manager::db::{MemoryStore, PgStore, Store};
use channel_manager::routes::build_router;
use channel_manager::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections)
                .await
                .context("failed to connect to Postgres")?;
            tracing::info!("Connected to database, migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let client = reqwest::Client::builder()
        .user_agent(concat!("channel-manager/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let feed = Arc::new(HttpCalendarFeed::new(client, config.feed_timeout));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid HOST/PORT")?;

    tracing::info!(
        stay_range_policy = ?config.stay_range_policy,
        feed_failure_policy = ?config.feed_failure_policy,
        feed_timeout_secs = config.feed_timeout.as_secs(),
        "Configuration loaded"
    );

    let state = AppState::new(store, feed, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Channel manager listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, finishing in-flight requests");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
