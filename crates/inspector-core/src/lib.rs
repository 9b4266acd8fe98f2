//! # inspector-core
//!
//! Shared library for the remote inspector containing the event dispatcher,
//! the peer wire-protocol types, and the models each observer maintains.
//!
//! This crate has zero dependencies on sockets, async runtimes, or UI
//! frameworks.  Everything in here can be exercised from a plain `#[test]`.
//!
//! # Architecture overview (for beginners)
//!
//! The inspector attaches to a running application (the *peer*) and receives
//! a stream of JSON messages from it: log lines, finished network requests,
//! snapshots of the UI tree, screenshots, and replies to commands.  The client
//! turns that raw stream into several live views of the peer's state.
//!
//! ```text
//! Transport ──► Dispatcher ──► Observers (catalog, logs, network, UI tree)
//! ```
//!
//! This crate provides the pieces of that pipeline that do not touch I/O:
//!
//! - **`dispatch`** – A typed publish/subscribe primitive.  Every component
//!   talks to every other component through a [`Dispatcher`].
//!
//! - **`protocol`** – How messages look on the wire.  Inbound frames are
//!   decoded into [`PeerMessage`]s and wrapped in [`ClientEvent`]s together
//!   with the connection lifecycle events.
//!
//! - **`domain`** – The derived-state models: parsed log entries, captured
//!   network requests, the UI element tree with absolute coordinates, the
//!   command catalog parser, and a fixed-capacity [`RingBuffer`].

pub mod dispatch;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `inspector_core::Dispatcher` instead of `inspector_core::dispatch::Dispatcher`.
pub use dispatch::{Dispatcher, TypedEvent};
pub use domain::catalog::{parse_help_text, CatalogCommand};
pub use domain::log_entry::{DetectedType, LogEntry, LogParseError};
pub use domain::network::{NetworkEntry, NetworkParseError, NetworkRequest, NetworkResponse, RequestUrl};
pub use domain::ring::RingBuffer;
pub use domain::ui_tree::{NodeId, UiNode, UiTree, UiTreeError};
pub use protocol::codec::{decode_frame, decode_value, encode_command, CommandError, DecodeError};
pub use protocol::messages::{event_types, ClientEvent, PeerMessage};
