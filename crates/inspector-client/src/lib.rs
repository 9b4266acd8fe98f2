//! inspector-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the `inspector-cli` binary share the same module tree.
//!
//! # What does inspector-client do? (for beginners)
//!
//! The *peer* is an application running with a debugging agent enabled.  It
//! streams JSON messages (log lines, network requests, UI snapshots, command
//! replies) and accepts plain text commands.  This library:
//!
//! 1. Opens a connection to the peer, either over a WebSocket (`ws://`,
//!    `wss://`) or through an embedding host page (`http://`, `https://`).
//! 2. Decodes every inbound message and routes it by its `type` field.
//! 3. Keeps live views up to date: the command catalog, a bounded log
//!    buffer, a bounded network capture, and the UI element tree with the
//!    latest screenshot.
//! 4. Sends commands back, queueing them while the connection is not open.
//!
//! Most callers only need [`InspectorSession`], which wires all of the above
//! together.

/// Application layer: observers and the session that wires them.
pub mod application;

/// Domain layer: client configuration.
pub mod domain;

/// Infrastructure layer: transports, the connection facade, config storage.
pub mod infrastructure;

pub use application::{CommandSink, InspectorSession};
pub use domain::ClientConfig;
pub use infrastructure::transport::{ConnectError, Connection, ConnectionStatus, TransportKind};
