//! `strafficd`, the S-MaaS server binary.
//!
//! Usage:
//!   strafficd -c <path/to/strafficd.toml> [--listen <addr>]

mod bootstrap;
mod config;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use straffic_core::Module;
use tracing::info;

use config::ServerConfig;

/// Parking and transit server.
#[derive(Parser, Debug)]
#[command(name = "strafficd", about = "S-MaaS parking and transit server")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: PathBuf,

    /// Listen address.
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

    info!("Loading configuration from {}", cli.config.display());
    let server_config = ServerConfig::load(&cli.config)?;
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = straffic_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn straffic_sql::SQLStore> = Arc::new(
        straffic_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    // ── Modules ──

    let parking_module = straffic_parking::ParkingModule::new(sql, &server_config.parking)?;
    info!("Parking module initialized");

    let transit_module = straffic_transit::TransitModule::new(&server_config.transit)?;
    info!("Transit module initialized");

    let module_routes = vec![
        (parking_module.name(), parking_module.routes()),
        (transit_module.name(), transit_module.routes()),
    ];

    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("S-MaaS server listening on {}", core_config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
