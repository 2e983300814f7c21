use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tokio::net::TcpListener;

use plant_core::config::AppConfig;
use plant_core::error::ConfigError;
use plant_db::monitor::TracingEventSink;
use plant_db::{ConnectionMonitor, ConnectionOptions, MongoPlantStore};
use plant_http::{shutdown_signal, AppState, HttpServer};
use plant_media::cloudinary_connect;

#[derive(Args, Default)]
pub struct ServeArgs {
    /// Listen on this port instead of $PORT
    #[arg(long)]
    pub port: Option<u16>,
}

/// Validate the environment or stop before touching the network.
pub fn load_config() -> anyhow::Result<AppConfig> {
    match AppConfig::from_env() {
        Ok(config) => Ok(config),
        Err(ConfigError::MissingEnv(missing)) => {
            tracing::error!(?missing, "Missing required environment variables");
            tracing::error!("Please create a .env file with the required variables");
            Err(ConfigError::MissingEnv(missing).into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn execute(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        db_profile = %config.db_profile,
        frontend_url = %config.frontend_url,
        "Configuration loaded"
    );

    let monitor = Arc::new(ConnectionMonitor::new().with_sink(Arc::new(TracingEventSink)));
    let options = ConnectionOptions::for_profile(config.db_profile);

    // Listening waits for the connection; a failure here ends the process.
    let db = plant_db::connect(&config.database_url, &options, monitor)
        .await
        .context("Database connection failed")?;

    let media = cloudinary_connect(&config.media);
    let state = AppState::new(
        Arc::new(MongoPlantStore::new(db.clone())),
        Arc::new(media),
        &config,
    );

    let server = HttpServer::new(&config, state).context("HTTP server setup failed")?;
    let listener = TcpListener::bind(server.addr())
        .await
        .with_context(|| format!("Cannot bind {}", server.addr()))?;

    let served = server.run(listener, shutdown_signal()).await;

    db.close().await;
    served.context("HTTP server failed")?;

    tracing::info!("Shutdown complete");
    Ok(())
}
