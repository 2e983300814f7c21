use std::sync::Arc;

use mongodb::bson::doc;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

use plant_core::config::Secret;
use plant_core::error::{PlantError, PlantResult};

use crate::monitor::{ConnectionEvent, ConnectionMonitor, ConnectionState};
use crate::options::ConnectionOptions;

/// Used when the connection string carries no default database.
pub const DEFAULT_DATABASE: &str = "plants";

const APP_NAME: &str = "plant-backend";

/// Owned, cloneable handle to the single database connection.
#[derive(Clone)]
pub struct DbHandle {
    client: Client,
    database: Database,
    options: ConnectionOptions,
    monitor: Arc<ConnectionMonitor>,
}

impl DbHandle {
    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn name(&self) -> &str {
        self.database.name()
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    /// Fail fast instead of queueing when the connection is not usable.
    pub fn ensure_ready(&self) -> PlantResult<()> {
        let state = self.monitor.state();
        if self.options.buffer_commands || state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(PlantError::NotConnected(state.to_string()))
        }
    }

    /// Close the client. Later operations fail with `NotConnected`.
    pub async fn close(&self) {
        self.monitor.set_state(ConnectionState::Disconnecting);
        self.client.clone().shutdown().immediate(true).await;
        self.monitor.record(ConnectionEvent::Closed);
        tracing::info!("MongoDB connection closed through app termination");
    }
}

/// Open the connection, verify it with a ping and start monitoring driver events.
///
/// No retry: a failure here is meant to stop startup.
pub async fn connect(
    url: &Secret,
    options: &ConnectionOptions,
    monitor: Arc<ConnectionMonitor>,
) -> PlantResult<DbHandle> {
    monitor.set_state(ConnectionState::Connecting);

    match open(url, options, monitor.clone()).await {
        Ok(handle) => {
            monitor.set_state(ConnectionState::Connected);
            tracing::info!(
                database = handle.name(),
                max_pool_size = options.max_pool_size,
                retry_writes = ?options.retry_writes,
                "Connected to MongoDB successfully"
            );
            Ok(handle)
        }
        Err(e) => {
            monitor.set_state(ConnectionState::Disconnected);
            let endpoint = if url.expose().is_empty() { "Not set" } else { "Set" };
            tracing::error!(error = %e, mongodb_url = endpoint, "Error connecting to MongoDB");
            Err(PlantError::Connection(e))
        }
    }
}

async fn open(
    url: &Secret,
    options: &ConnectionOptions,
    monitor: Arc<ConnectionMonitor>,
) -> anyhow::Result<DbHandle> {
    let mut client_options = ClientOptions::parse(url.expose())
        .await
        .map_err(|e| anyhow::anyhow!("Invalid MongoDB connection string: {e}"))?;

    options.apply(&mut client_options);
    client_options.app_name = Some(APP_NAME.to_string());

    let observer = monitor.clone();
    client_options.sdam_event_handler = Some(EventHandler::callback(move |event| {
        observer.observe(event)
    }));

    let database_name = client_options
        .default_database
        .clone()
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(client_options)
        .map_err(|e| anyhow::anyhow!("MongoDB client setup failed: {e}"))?;

    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| anyhow::anyhow!("MongoDB ping failed: {e}"))?;

    let database = client.database(&database_name);
    Ok(DbHandle {
        client,
        database,
        options: options.clone(),
        monitor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn malformed_url_fails_and_leaves_state_disconnected() {
        let monitor = Arc::new(ConnectionMonitor::new());
        let result = connect(
            &Secret::new("not-a-mongodb-url"),
            &ConnectionOptions::default(),
            monitor.clone(),
        )
        .await;

        assert!(matches!(result, Err(PlantError::Connection(_))));
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn unreachable_server_fails_within_selection_timeout() {
        let options = ConnectionOptions {
            server_selection_timeout: Duration::from_millis(200),
            connect_timeout: Duration::from_millis(200),
            ..ConnectionOptions::default()
        };
        let monitor = Arc::new(ConnectionMonitor::new());

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            connect(
                &Secret::new("mongodb://127.0.0.1:9/plants?directConnection=true"),
                &options,
                monitor.clone(),
            ),
        )
        .await
        .expect("connect should give up on its own");

        assert!(matches!(result, Err(PlantError::Connection(_))));
        assert!(!monitor.is_connected());
    }

    #[tokio::test]
    async fn close_marks_handle_closed_and_rejects_operations() {
        let client_options = ClientOptions::parse("mongodb://127.0.0.1:9/plants")
            .await
            .unwrap();
        let client = Client::with_options(client_options).unwrap();
        let monitor = Arc::new(ConnectionMonitor::new());
        monitor.set_state(ConnectionState::Connected);

        let handle = DbHandle {
            database: client.database("plants"),
            client,
            options: ConnectionOptions::default(),
            monitor: monitor.clone(),
        };
        assert!(handle.ensure_ready().is_ok());

        handle.close().await;

        assert_eq!(monitor.state(), ConnectionState::Closed);
        match handle.ensure_ready() {
            Err(PlantError::NotConnected(state)) => assert_eq!(state, "closed"),
            other => panic!("expected NotConnected, got {other:?}"),
        }
    }
}
