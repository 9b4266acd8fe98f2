//! WebSocket transport.
//!
//! Connects to the inspector server that runs inside the peer application
//! (`ws://localhost:8765` by default).  One tokio task per attempt performs
//! the handshake and then pumps frames in both directions:
//!
//! ```text
//!                 ┌──────────── socket task ────────────┐
//! send_command ──►│ outbound channel ──► sink.send()    │──► peer
//!                 │                                     │
//! dispatcher  ◄───│ decode_frame ◄── stream.next()      │◄── peer
//!                 └─────────────────────────────────────┘
//! ```
//!
//! Commands sent before the socket opens are queued and written, in order,
//! before `connected` is published.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use inspector_core::{encode_command, ClientEvent, CommandError, Dispatcher};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, warn};

use super::lifecycle::{Begin, Lifecycle};
use super::{ConnectError, ConnectionStatus, Transport, TransportKind};

/// A [`Transport`] over a WebSocket connection.
pub struct SocketTransport {
    lifecycle: Arc<Lifecycle>,
    connect_timeout: Duration,
}

impl SocketTransport {
    /// Creates a transport that publishes into `events`.
    pub fn new(events: Arc<Dispatcher<ClientEvent>>, connect_timeout: Duration) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(events)),
            connect_timeout,
        }
    }

    /// The dispatcher this transport publishes into.
    pub fn events(&self) -> &Arc<Dispatcher<ClientEvent>> {
        self.lifecycle.events()
    }

    /// Number of commands waiting for the socket to open.
    pub fn queued_commands(&self) -> usize {
        self.lifecycle.pending_len()
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn connect(&self, url: &str) -> Result<String, ConnectError> {
        match TransportKind::from_url(url) {
            Ok(TransportKind::Socket) => {}
            Ok(TransportKind::EmbeddedHost) => {
                let scheme = url.split("://").next().unwrap_or_default().to_string();
                let error = ConnectError::UnsupportedScheme {
                    url: url.to_string(),
                    scheme,
                };
                return self.lifecycle.reject(url, error);
            }
            Err(error) => return self.lifecycle.reject(url, error),
        }

        let generation = match self.lifecycle.begin(url) {
            Begin::Join { generation } => generation,
            Begin::Start { generation } => {
                let task = tokio::spawn(run_socket(
                    Arc::clone(&self.lifecycle),
                    url.to_string(),
                    generation,
                    self.connect_timeout,
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
        TransportKind::Socket
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

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.lifecycle.abort();
    }
}

/// Runs one connection attempt from handshake to hang-up.
async fn run_socket(lifecycle: Arc<Lifecycle>, url: String, generation: u64, connect_timeout: Duration) {
    let stream = match timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            lifecycle.fail(
                generation,
                ConnectError::Failed {
                    url,
                    reason: e.to_string(),
                },
            );
            return;
        }
        Err(_) => {
            lifecycle.fail(
                generation,
                ConnectError::Timeout {
                    url,
                    after: connect_timeout,
                },
            );
            return;
        }
    };

    let (mut sink, mut source) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    let Some(queued) = lifecycle.open(generation, outbound_tx) else {
        return;
    };
    for command in queued {
        if let Err(e) = sink.send(WsMessage::Text(command)).await {
            lifecycle.fail(
                generation,
                ConnectError::Failed {
                    url,
                    reason: format!("flushing queued commands: {e}"),
                },
            );
            return;
        }
    }
    lifecycle.announce_connected(generation);

    loop {
        tokio::select! {
            command = outbound_rx.recv() => {
                let Some(command) = command else { break };
                debug!(url = %url, command = %command, "sending command");
                if let Err(e) = sink.send(WsMessage::Text(command)).await {
                    warn!(url = %url, "WebSocket send failed: {e}");
                    break;
                }
            }
            frame = source.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => lifecycle.deliver_frame(generation, &text),
                Some(Ok(WsMessage::Binary(_))) => {
                    debug!(url = %url, "unexpected binary frame (ignored)");
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!(url = %url, "peer closed the WebSocket");
                    break;
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(url = %url, "WebSocket error: {e}");
                    break;
                }
            },
        }
    }

    lifecycle.finish(generation);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
