//! Connection facade.
//!
//! [`Connection`] is what the rest of the client talks to.  It owns at most
//! one transport at a time and picks it from the URL scheme on every
//! `connect()`:
//!
//! | Scheme          | Transport                          |
//! |-----------------|------------------------------------|
//! | `ws`, `wss`     | [`SocketTransport`]                |
//! | `http`, `https` | [`HostTransport`]                  |
//! | anything else   | rejected, `connectionFailed` only  |
//!
//! # Event forwarding
//!
//! Each transport publishes into a private dispatcher.  The facade subscribes
//! to it with a closure tagged with the transport's *generation*; when the
//! transport is replaced the generation moves on and the old closure stops
//! forwarding.  Observers therefore only ever see events from the active
//! transport, on the facade's own dispatcher.
//!
//! # Commands before any transport exists
//!
//! Commands sent before the first `connect()` are held by the facade and
//! handed to the first transport it creates.  Commands queued inside a
//! transport are *not* carried over when the scheme changes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use inspector_core::{encode_command, ClientEvent, CommandError, Dispatcher};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::embedded_host::{HostTransport, HostWindow};
use super::socket::SocketTransport;
use super::{ConnectError, ConnectionStatus, Transport, TransportKind, TransportSettings};
use crate::application::CommandSink;

/// The transport currently owned by a [`Connection`].
#[derive(Clone)]
pub enum ActiveTransport {
    Socket(Arc<SocketTransport>),
    EmbeddedHost(Arc<HostTransport>),
}

impl ActiveTransport {
    fn as_transport(&self) -> &dyn Transport {
        match self {
            Self::Socket(transport) => transport.as_ref(),
            Self::EmbeddedHost(transport) => transport.as_ref(),
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.as_transport().kind()
    }
}

#[derive(Default)]
struct FacadeState {
    active: Option<ActiveTransport>,
    orphaned: VecDeque<String>,
}

/// Scheme-selecting front end over the two transports.
pub struct Connection {
    events: Arc<Dispatcher<ClientEvent>>,
    host: Option<Arc<dyn HostWindow>>,
    settings: TransportSettings,
    state: Mutex<FacadeState>,
    generation: Arc<AtomicU64>,
}

impl Connection {
    /// Creates a facade with no transport.
    ///
    /// `host` is the embedding host used for `http(s)` URLs; without one,
    /// such connects fail with [`ConnectError::NoHost`].
    pub fn new(settings: TransportSettings, host: Option<Arc<dyn HostWindow>>) -> Self {
        Self {
            events: Arc::new(Dispatcher::new()),
            host,
            settings,
            state: Mutex::new(FacadeState::default()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The dispatcher every observer subscribes to.
    pub fn events(&self) -> &Arc<Dispatcher<ClientEvent>> {
        &self.events
    }

    /// Connects to `url`, choosing the transport from its scheme.
    ///
    /// # Errors
    ///
    /// Any [`ConnectError`]; an invalid or unsupported URL fails before any
    /// transport is touched.
    pub async fn connect(&self, url: &str) -> Result<String, ConnectError> {
        let kind = match TransportKind::from_url(url) {
            Ok(kind) => kind,
            Err(error) => {
                info!(url, %error, "rejecting connection url");
                self.events.emit(&ClientEvent::ConnectionFailed {
                    url: url.to_string(),
                    reason: error.to_string(),
                });
                return Err(error);
            }
        };

        // Close a transport of the other kind first, while its events are
        // still forwarded, so observers see its `disconnected`.
        let stale = {
            let mut state = self.state.lock();
            let switching = state.active.as_ref().map_or(false, |a| a.kind() != kind);
            if switching {
                state.active.take()
            } else {
                None
            }
        };
        if let Some(stale) = stale {
            debug!(from = %stale.kind(), to = %kind, "switching transport");
            stale.as_transport().close();
        }

        let transport = self.transport_for(kind);
        transport.as_transport().connect(url).await
    }

    /// Returns the active transport of `kind`, creating it if needed.
    fn transport_for(&self, kind: TransportKind) -> ActiveTransport {
        let mut state = self.state.lock();
        if let Some(active) = state.active.as_ref().filter(|a| a.kind() == kind) {
            return active.clone();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::new(Dispatcher::new());
        let outer = Arc::clone(&self.events);
        let current = Arc::clone(&self.generation);
        inner.subscribe_any(move |event: &ClientEvent| {
            if current.load(Ordering::SeqCst) == generation {
                outer.emit(event);
            }
        });

        let transport = match kind {
            TransportKind::Socket => ActiveTransport::Socket(Arc::new(SocketTransport::new(
                inner,
                self.settings.connect_timeout,
            ))),
            TransportKind::EmbeddedHost => ActiveTransport::EmbeddedHost(Arc::new(
                HostTransport::new(inner, self.host.clone(), self.settings.handshake_timeout),
            )),
        };

        for command in state.orphaned.drain(..) {
            // Already validated when it was accepted.
            let _ = transport.as_transport().send_command(&command);
        }
        state.active = Some(transport.clone());
        transport
    }

    /// Sends a command through the active transport, or holds it until one
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for empty or multi-line commands.
    pub fn send_command(&self, command: &str) -> Result<(), CommandError> {
        let text = encode_command(command)?;
        let active = {
            let mut state = self.state.lock();
            match state.active.clone() {
                Some(active) => active,
                None => {
                    state.orphaned.push_back(text);
                    return Ok(());
                }
            }
        };
        active.as_transport().send_command(&text)
    }

    /// Closes the active transport (if any) and drops held commands.
    pub fn close(&self) {
        let active = {
            let mut state = self.state.lock();
            state.orphaned.clear();
            state.active.clone()
        };
        if let Some(active) = active {
            active.as_transport().close();
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.active()
            .map_or(ConnectionStatus::Disconnected, |a| a.as_transport().status())
    }

    pub fn current_url(&self) -> Option<String> {
        self.active().and_then(|a| a.as_transport().current_url())
    }

    /// Kind of the active transport, if one has been created.
    pub fn kind(&self) -> Option<TransportKind> {
        self.active().map(|a| a.kind())
    }

    /// The active transport, if one has been created.
    pub fn active(&self) -> Option<ActiveTransport> {
        self.state.lock().active.clone()
    }

    /// Commands held until the first transport is created.
    pub fn held_commands(&self) -> usize {
        self.state.lock().orphaned.len()
    }
}

impl CommandSink for Connection {
    fn send_command(&self, command: &str) -> Result<(), CommandError> {
        Connection::send_command(self, command)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
