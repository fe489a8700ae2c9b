use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod config;
mod db;
mod error;
mod i18n;
mod ingestion;
mod processing;
mod service;
mod storage;

use crate::config::ServiceConfig;
use crate::db::Database;
use crate::service::DokeepService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("Starting Dokeep service v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        uploads_dir = %config.storage.uploads_dir.display(),
        "Configuration loaded"
    );

    let db_path = config.storage.database_path();
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let service = Arc::new(DokeepService::new(config, db)?);
    let app = api::router(service);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dokeep_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
