//! `mocardsd`: the MOCARDS server binary.
//!
//! Usage:
//!   mocardsd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/mocards/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mocards_core::Module;
use tracing::info;

use config::ServerConfig;

/// MOCARDS server.
#[derive(Parser, Debug)]
#[command(name = "mocardsd", about = "MOCARDS dental perk card server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = mocards_core::ServiceConfig {
        data_dir: Some(data_dir),
        sqlite_path: server_config.storage.sqlite_path.as_ref().map(PathBuf::from),
        listen: cli.listen.clone(),
    };

    let sqlite_path = core_config.resolve_sqlite_path();
    let sql: Arc<dyn mocards_sql::SQLStore> = Arc::new(
        mocards_sql::SqliteStore::open(&sqlite_path)
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    info!("SQLite store at {}", sqlite_path.display());

    let service = mocards::service::CardService::new(sql)
        .map_err(|e| anyhow::anyhow!("failed to initialize schema: {}", e))?;
    bootstrap::ensure_code_format(&service, &server_config)?;

    let mocards_module = mocards::MocardsModule::new(service);
    info!("MOCARDS module initialized");

    let module_routes = vec![(mocards_module.name(), mocards_module.routes())];
    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("MOCARDS server listening on {}", core_config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
