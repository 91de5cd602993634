use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use sforum::config::{Config, DatabaseConfig};
use sforum::infrastructure::logger::Logger;
use sforum::infrastructure::store::{ForumStore, MemoryStore};
use sforum::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    let _guard = Logger::init(&config.logging)?;
    info!("Starting SForum server...");

    let store = open_store(&config.database).await?;
    let state = AppState::new(store, &config).context("invalid topic pipeline")?;
    let app = router(state, &config);

    let listener = TcpListener::bind(config.server.address())
        .await
        .with_context(|| format!("failed to bind {}", config.server.address()))?;
    let addr = listener.local_addr()?;

    info!("🚀 SForum server running on http://{}", addr);
    info!("📖 Available endpoints:");
    info!("   GET  /health                - Health check");
    info!("   GET  /topics                - List topics (?page=1&limit=10)");
    info!("   POST /topics                - Create topic (X-User-Id header)");
    info!("   GET  /topics/:id            - Show topic");
    info!("   PUT  /topics/:id/status     - Lock or publish topic");
    info!("   POST /topics/:id/likes      - Toggle like");
    info!("   GET  /topics/:id/comments   - List comments");
    info!("   POST /topics/:id/comments   - Create comment");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(feature = "database")]
async fn open_store(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn ForumStore>> {
    use sforum::infrastructure::database::DatabaseManager;
    use sforum::infrastructure::store::PgStore;

    match &config.url {
        Some(url) => {
            let database = DatabaseManager::new(url, config).await?;
            database.migrate().await?;
            Ok(Arc::new(PgStore::new(database.get_pool().clone())))
        }
        None => {
            info!("No database configured, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "database"))]
async fn open_store(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn ForumStore>> {
    if config.url.is_some() {
        anyhow::bail!("database support is not compiled in, rebuild with --features database");
    }
    info!("Using in-memory store");
    Ok(Arc::new(MemoryStore::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
