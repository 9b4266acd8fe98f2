//! Transports that carry the inspector protocol.
//!
//! # Two ways to reach the peer (for beginners)
//!
//! The inspected application exposes its inspector in one of two ways:
//!
//! ```text
//! ws://host:8765   ──► SocketTransport        a WebSocket server inside the app
//! http://host/…    ──► HostTransport          the app *embeds* the inspector UI
//!                                             and talks to it with host messages
//! ```
//!
//! Both implement the same [`Transport`] capability: connect, send a
//! command, report status, close.  Both publish the same [`ClientEvent`]s
//! (`connecting`, `connected`, `connectionFailed`, `disconnected`, and one
//! event per peer message) into the dispatcher they were built with.
//!
//! The [`Connection`] facade owns at most one of them at a time and chooses
//! which one from the URL scheme.
//!
//! [`ClientEvent`]: inspector_core::ClientEvent

pub mod connection;
pub mod embedded_host;
mod lifecycle;
pub mod socket;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use http::Uri;
use inspector_core::CommandError;
use thiserror::Error;

pub use connection::{ActiveTransport, Connection};
pub use embedded_host::{ChannelHost, HostError, HostTransport, HostWindow};
pub use socket::SocketTransport;

/// Errors returned by [`Transport::connect`].
///
/// Every connect error is also published as a `connectionFailed` event,
/// except [`ConnectError::Superseded`] and [`ConnectError::Closed`], which
/// describe an attempt that was abandoned locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("invalid connection url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme {scheme:?} in {url:?} (expected ws, wss, http or https)")]
    UnsupportedScheme { url: String, scheme: String },

    /// The embedded-host transport was asked to connect without a host window.
    #[error("no embedding host is available")]
    NoHost,

    #[error("could not connect to {url}: {reason}")]
    Failed { url: String, reason: String },

    #[error("connecting to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    /// A `connect()` to a different URL replaced this attempt.
    #[error("connection attempt to {url} was superseded")]
    Superseded { url: String },

    /// `close()` was called before the attempt completed.
    #[error("connection to {url} was closed before it was established")]
    Closed { url: String },
}

/// Which transport serves a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// `ws://` or `wss://`.
    Socket,
    /// `http://` or `https://`.
    EmbeddedHost,
}

impl TransportKind {
    /// Selects the transport for `url` purely from its scheme.
    ///
    /// # Errors
    ///
    /// [`ConnectError::InvalidUrl`] if the URL cannot be parsed or has no
    /// scheme, [`ConnectError::UnsupportedScheme`] for anything other than
    /// `ws`, `wss`, `http` and `https`.
    pub fn from_url(url: &str) -> Result<Self, ConnectError> {
        let invalid = |reason: String| ConnectError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let uri = Uri::from_str(url).map_err(|e| invalid(e.to_string()))?;
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| invalid("missing scheme".to_string()))?
            .to_ascii_lowercase();

        match scheme.as_str() {
            "ws" | "wss" => Ok(Self::Socket),
            "http" | "https" => Ok(Self::EmbeddedHost),
            _ => Err(ConnectError::UnsupportedScheme {
                url: url.to_string(),
                scheme,
            }),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket => f.write_str("socket"),
            Self::EmbeddedHost => f.write_str("embedded-host"),
        }
    }
}

/// Connection state machine shared by both transports.
///
/// ```text
/// Disconnected ──connect──► Connecting ──open──► Connected
///      ▲                        │                    │
///      └──── failure/close ─────┴──── close/error ───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Timeouts applied by the transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Upper bound for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Upper bound for the embedding host's first message.
    pub handshake_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// The capability every transport provides.
///
/// Events are not returned from these methods: they are published into the
/// dispatcher the transport was constructed with.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connects to `url` and resolves once the connection is established.
    ///
    /// Connecting to the URL of an attempt that is still pending (or already
    /// open) shares that attempt instead of starting a new one.  Connecting
    /// to a different URL closes the previous connection first.
    ///
    /// Returns the URL that is now connected.
    async fn connect(&self, url: &str) -> Result<String, ConnectError>;

    /// Sends one command, or queues it until the connection is open.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command is empty or multi-line.
    fn send_command(&self, command: &str) -> Result<(), CommandError>;

    fn kind(&self) -> TransportKind;

    /// URL of the current (pending or open) connection.
    fn current_url(&self) -> Option<String>;

    fn status(&self) -> ConnectionStatus;

    /// Closes the connection, dropping any queued commands.  Emits
    /// `disconnected` if a connection was pending or open.
    fn close(&self);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
