//! Embedded-host transport.
//!
//! When the inspector UI is embedded inside the peer (for example a WebAssembly
//! build of the application hosting the inspector page), there is no socket:
//! the two sides exchange *host messages* instead.  The host is abstracted as
//! a [`HostWindow`]:
//!
//! - [`HostWindow::post_message`] delivers one command to the peer.
//! - [`HostWindow::attach_listener`] registers a channel that receives every
//!   message the peer posts back, already parsed as JSON.
//!
//! The connection counts as established once the listener is attached *and*
//! the host has sent its first message (the handshake).  That first message is
//! also forwarded as an ordinary peer event.
//!
//! [`ChannelHost`] is an in-memory host used by tests and by embedders that
//! bridge host messages from somewhere else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inspector_core::{encode_command, ClientEvent, CommandError, Dispatcher};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::lifecycle::{Begin, Lifecycle};
use super::{ConnectError, ConnectionStatus, Transport, TransportKind};

/// The host refused or could not deliver a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host could not deliver message: {0}")]
pub struct HostError(pub String);

/// The window (or other embedder) that hosts the inspector.
pub trait HostWindow: Send + Sync {
    /// Posts one command to the peer.
    fn post_message(&self, message: &str) -> Result<(), HostError>;

    /// Registers `listener` to receive every message the peer posts.
    fn attach_listener(&self, listener: mpsc::UnboundedSender<Value>);
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// A [`Transport`] over host messages.
pub struct HostTransport {
    lifecycle: Arc<Lifecycle>,
    host: Option<Arc<dyn HostWindow>>,
    handshake_timeout: Duration,
}

impl HostTransport {
    /// Creates a transport that publishes into `events`.
    ///
    /// With `host == None` every connect fails with [`ConnectError::NoHost`].
    pub fn new(
        events: Arc<Dispatcher<ClientEvent>>,
        host: Option<Arc<dyn HostWindow>>,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(events)),
            host,
            handshake_timeout,
        }
    }

    pub fn events(&self) -> &Arc<Dispatcher<ClientEvent>> {
        self.lifecycle.events()
    }

    /// Number of commands waiting for the handshake.
    pub fn queued_commands(&self) -> usize {
        self.lifecycle.pending_len()
    }
}

#[async_trait]
impl Transport for HostTransport {
    async fn connect(&self, url: &str) -> Result<String, ConnectError> {
        match TransportKind::from_url(url) {
            Ok(TransportKind::EmbeddedHost) => {}
            Ok(TransportKind::Socket) => {
                let scheme = url.split("://").next().unwrap_or_default().to_string();
                let error = ConnectError::UnsupportedScheme {
                    url: url.to_string(),
                    scheme,
                };
                return self.lifecycle.reject(url, error);
            }
            Err(error) => return self.lifecycle.reject(url, error),
        }
        let Some(host) = self.host.clone() else {
            return self.lifecycle.reject(url, ConnectError::NoHost);
        };

        let generation = match self.lifecycle.begin(url) {
            Begin::Join { generation } => generation,
            Begin::Start { generation } => {
                let task = tokio::spawn(run_host(
                    Arc::clone(&self.lifecycle),
                    host,
                    url.to_string(),
                    generation,
                    self.handshake_timeout,
                ));
                self.lifecycle.attach_task(generation, task);
                generation
            }
        };

        self.lifecycle.wait(generation, url).await
    }

    fn send_command(&self, command: &str) -> Result<(), CommandError> {
        let text = encode_command(command)?;
        self.lifecycle.send(text);
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::EmbeddedHost
    }

    fn current_url(&self) -> Option<String> {
        self.lifecycle.current_url()
    }

    fn status(&self) -> ConnectionStatus {
        self.lifecycle.status()
    }

    fn close(&self) {
        self.lifecycle.close();
    }
}

impl Drop for HostTransport {
    fn drop(&mut self) {
        self.lifecycle.abort();
    }
}

async fn run_host(
    lifecycle: Arc<Lifecycle>,
    host: Arc<dyn HostWindow>,
    url: String,
    generation: u64,
    handshake_timeout: Duration,
) {
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Value>();
    host.attach_listener(inbound_tx);

    let handshake = match timeout(handshake_timeout, inbound_rx.recv()).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            let reason = "host dropped the listener before the handshake".to_string();
            lifecycle.fail(generation, ConnectError::Failed { url, reason });
            return;
        }
        Err(_) => {
            lifecycle.fail(
                generation,
                ConnectError::Timeout {
                    url,
                    after: handshake_timeout,
                },
            );
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let Some(queued) = lifecycle.open(generation, outbound_tx) else {
        return;
    };
    for command in queued {
        if let Err(e) = host.post_message(&command) {
            let reason = format!("flushing queued commands: {e}");
            lifecycle.fail(generation, ConnectError::Failed { url, reason });
            return;
        }
    }
    lifecycle.announce_connected(generation);
    lifecycle.deliver_value(generation, handshake);

    loop {
        tokio::select! {
            command = outbound_rx.recv() => {
                let Some(command) = command else { break };
                debug!(url = %url, command = %command, "posting command to host");
                if let Err(e) = host.post_message(&command) {
                    warn!(url = %url, "{e}");
                    break;
                }
            }
            message = inbound_rx.recv() => match message {
                Some(message) => lifecycle.deliver_value(generation, message),
                None => {
                    debug!(url = %url, "host detached");
                    break;
                }
            },
        }
    }

    lifecycle.finish(generation);
}

// ── In-memory host ────────────────────────────────────────────────────────────

/// A [`HostWindow`] backed by in-process channels.
///
/// Messages posted by the transport are recorded and can be read with
/// [`ChannelHost::posted`]; messages from the "peer" are injected with
/// [`ChannelHost::deliver`].
#[derive(Default)]
pub struct ChannelHost {
    listeners: Mutex<Vec<mpsc::UnboundedSender<Value>>>,
    posted: Mutex<Vec<String>>,
    attached: Notify,
}

impl ChannelHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `message` to every attached listener.  Returns how many
    /// listeners received it; listeners whose transport is gone are dropped.
    pub fn deliver(&self, message: Value) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| !listener.is_closed());
        listeners
            .iter()
            .filter(|listener| listener.send(message.clone()).is_ok())
            .count()
    }

    /// Every command posted so far, oldest first.
    pub fn posted(&self) -> Vec<String> {
        self.posted.lock().clone()
    }

    /// Removes and returns the posted commands.
    pub fn take_posted(&self) -> Vec<String> {
        std::mem::take(&mut *self.posted.lock())
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| !listener.is_closed());
        listeners.len()
    }

    /// Resolves once at least one listener is attached.
    pub async fn listener_attached(&self) {
        loop {
            if self.listener_count() > 0 {
                return;
            }
            self.attached.notified().await;
        }
    }
}

impl HostWindow for ChannelHost {
    fn post_message(&self, message: &str) -> Result<(), HostError> {
        self.posted.lock().push(message.to_string());
        Ok(())
    }

    fn attach_listener(&self, listener: mpsc::UnboundedSender<Value>) {
        self.listeners.lock().push(listener);
        self.attached.notify_one();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
