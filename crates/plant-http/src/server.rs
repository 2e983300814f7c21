//! HTTP server setup: middleware, listener, graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use plant_core::config::AppConfig;
use plant_core::error::{ConfigError, PlantResult};

use crate::routes::build_router;
use crate::state::AppState;
use crate::upload::prepare_temp_dir;

/// CORS for the single configured frontend origin, with credentials.
pub fn cors_layer(frontend_url: &str) -> PlantResult<CorsLayer> {
    let origin = HeaderValue::from_str(frontend_url).map_err(|e| ConfigError::Invalid {
        var: "FRONTEND_URL".into(),
        reason: e.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]))
}

/// HTTP server for the plant API.
pub struct HttpServer {
    router: Router,
    addr: SocketAddr,
    environment: String,
}

impl HttpServer {
    /// Fails when upload buffering or CORS cannot be configured.
    pub fn new(config: &AppConfig, state: AppState) -> PlantResult<Self> {
        prepare_temp_dir(&config.upload)?;
        let cors = cors_layer(&config.frontend_url)?;

        Ok(Self {
            router: build_router(state, cors),
            addr: config.addr(),
            environment: config.environment.clone(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            address = %local_addr,
            port = local_addr.port(),
            environment = %self.environment,
            "App is running"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
