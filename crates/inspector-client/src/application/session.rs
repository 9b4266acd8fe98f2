//! One connection wired to one complete set of observers.
//!
//! [`InspectorSession`] is the composition root of the client library.  It
//! replaces process-wide singletons: every session owns its own
//! [`Connection`] and observers, so several sessions can live side by side
//! (which the integration tests rely on).

use std::sync::Arc;

use inspector_core::CommandError;
use tracing::info;
use uuid::Uuid;

use super::{CommandCatalogObserver, CommandSink, LogStreamObserver, NetworkObserver, UiTreeObserver};
use crate::domain::ClientConfig;
use crate::infrastructure::transport::{
    ConnectError, Connection, ConnectionStatus, HostWindow, TransportSettings,
};

/// A connection plus the observers fed by it.
pub struct InspectorSession {
    id: Uuid,
    connection: Arc<Connection>,
    catalog: CommandCatalogObserver,
    logs: LogStreamObserver,
    network: NetworkObserver,
    ui: UiTreeObserver,
}

impl InspectorSession {
    /// Builds a disconnected session from `config`.
    ///
    /// `host` is needed only for `http(s)` URLs (the embedded-host transport).
    pub fn new(config: &ClientConfig, host: Option<Arc<dyn HostWindow>>) -> Self {
        let settings = TransportSettings {
            connect_timeout: config.connect_timeout(),
            handshake_timeout: config.handshake_timeout(),
        };
        let connection = Arc::new(Connection::new(settings, host));
        let sink: Arc<dyn CommandSink> = connection.clone();
        let source = connection.events();

        let session = Self {
            id: Uuid::new_v4(),
            catalog: CommandCatalogObserver::new(source, Arc::clone(&sink)),
            logs: LogStreamObserver::new(source, config.log_capacity),
            network: NetworkObserver::new(source, Arc::clone(&sink), config.network_capacity),
            ui: UiTreeObserver::new(source, sink),
            connection,
        };
        info!(session = %session.id, "inspector session created");
        session
    }

    /// Connects (or reconnects) to `url`.
    ///
    /// # Errors
    ///
    /// Any [`ConnectError`] from the connection facade.
    pub async fn connect(&self, url: &str) -> Result<String, ConnectError> {
        info!(session = %self.id, url, "connecting");
        self.connection.connect(url).await
    }

    /// Sends a raw command to the peer.
    pub fn send_command(&self, command: &str) -> Result<(), CommandError> {
        self.connection.send_command(command)
    }

    pub fn close(&self) {
        self.connection.close();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn catalog(&self) -> &CommandCatalogObserver {
        &self.catalog
    }

    pub fn logs(&self) -> &LogStreamObserver {
        &self.logs
    }

    pub fn network(&self) -> &NetworkObserver {
        &self.network
    }

    pub fn ui(&self) -> &UiTreeObserver {
        &self.ui
    }
}

impl Drop for InspectorSession {
    fn drop(&mut self) {
        self.connection.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
