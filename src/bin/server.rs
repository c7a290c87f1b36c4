use clap::Parser;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use tag_registry::db::schema::sync_schema;
use tag_registry::server::config::ServerConfig;
use tag_registry::server::logging::init_logging;
use tag_registry::web::{AppState, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
        return;
    }
    info!("Shutdown signal received, draining connections.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging needs LOG_DIR, so configuration errors go to stderr.
    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&server_config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), config = ?server_config, "Starting server.");

    // --- Database Pool Setup ---
    let mut opt = ConnectOptions::new(server_config.database_url.clone());
    opt.max_connections(10)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db_pool: DatabaseConnection = match Database::connect(opt).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to connect to the database.");
            return Err(e.into());
        }
    };
    sync_schema(&db_pool).await?;

    let app_state = Arc::new(AppState::new(db_pool, server_config.clone())?);
    app_state.image_store.ensure_dirs().await?;

    let app = create_axum_router(app_state);

    let listener = tokio::net::TcpListener::bind(&server_config.listen_addr).await?;
    info!(address = %server_config.listen_addr, "HTTP server listening.");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
