//! Application layer: the observers that turn peer events into live views.
//!
//! # What is an observer? (for beginners)
//!
//! Each observer subscribes to the connection's dispatcher at construction
//! time, keeps one piece of derived state up to date, and republishes what
//! changed on a dispatcher of its own:
//!
//! ```text
//!                     ┌─► CommandCatalogObserver ─► commandsChanged
//!                     ├─► LogStreamObserver ──────► newModule / newComponent / newLogs
//! Connection events ──┼─► NetworkObserver ────────► update
//!                     └─► UiTreeObserver ─────────► tree / screenshot
//! ```
//!
//! Observers never emit into the connection's dispatcher.  When they need the
//! peer to do something (send `help`, start network capture, take a
//! screenshot) they go through a [`CommandSink`].
//!
//! # Sub-modules
//!
//! - **`catalog`** – The commands the peer understands.
//! - **`logs`** – Parsed log lines, distinct modules/components, recording.
//! - **`network`** – Captured request/response pairs.
//! - **`ui_tree`** – The UI element tree and the latest screenshot.
//! - **`session`** – Wires one connection to one set of observers.

pub mod catalog;
pub mod logs;
pub mod network;
pub mod session;
pub mod ui_tree;

use std::sync::{Arc, Weak};

use inspector_core::{ClientEvent, CommandError, Dispatcher};

pub use catalog::{CatalogEvent, CommandCatalogObserver};
pub use logs::{LogEvent, LogQuery, LogStreamObserver, RecordedLog};
pub use network::{NetworkEvent, NetworkObserver};
pub use session::InspectorSession;
pub use ui_tree::{UiEvent, UiTreeObserver};

/// Outbound half of a connection, as seen by the observers.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSink: Send + Sync {
    /// Sends (or queues) one command for the peer.
    fn send_command(&self, command: &str) -> Result<(), CommandError>;
}

/// Subscribes `handler` to `event_type` on `source`, holding `target` weakly.
///
/// Observers own their state behind an `Arc`; the dispatcher must not keep
/// that state alive on its own, or dropping an observer would leak it.
pub(crate) fn subscribe_weak<T, F>(
    source: &Dispatcher<ClientEvent>,
    event_type: &str,
    target: &Arc<T>,
    handler: F,
) where
    T: Send + Sync + 'static,
    F: Fn(&T, &ClientEvent) + Send + Sync + 'static,
{
    let weak: Weak<T> = Arc::downgrade(target);
    source.subscribe(event_type, move |event: &ClientEvent| {
        if let Some(target) = weak.upgrade() {
            handler(&target, event);
        }
    });
}
