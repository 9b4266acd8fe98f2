//! UI tree observer.
//!
//! Holds the latest UI element tree and the latest screenshot reported by the
//! peer.  Both are replaced wholesale on every snapshot; nothing is merged.
//!
//! Snapshots are handed out as `Arc`s so views can keep one while a newer one
//! arrives.  Toggling a node's `collapsed` flag copies the tree only when a
//! view still holds the previous snapshot.

use std::sync::{Arc, Weak};
use std::time::Duration;

use inspector_core::{event_types, ClientEvent, Dispatcher, NodeId, PeerMessage, TypedEvent, UiTree};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{subscribe_weak, CommandSink};
use crate::domain::config::MIN_SCREEN_REFRESH;

/// Asks the peer for its UI tree.
pub const VIEW_TREE: &str = "view_tree";
/// Asks the peer for a screenshot.
pub const SCREEN_CAPTURE: &str = "screen_capture";

/// Events published by [`UiTreeObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A new tree replaced the stored one.
    Tree { tree: Arc<UiTree> },
    /// A new screenshot, still encoded exactly as the peer sent it.
    Screenshot { image: Arc<str> },
}

impl TypedEvent for UiEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::Tree { .. } => "tree",
            Self::Screenshot { .. } => "screenshot",
        }
    }
}

#[derive(Default)]
struct UiState {
    tree: Option<Arc<UiTree>>,
    screenshot: Option<Arc<str>>,
}

struct Inner {
    sink: Arc<dyn CommandSink>,
    state: Mutex<UiState>,
    events: Dispatcher<UiEvent>,
}

/// Tracks the peer's UI tree and screen.
pub struct UiTreeObserver {
    inner: Arc<Inner>,
}

impl UiTreeObserver {
    pub fn new(source: &Dispatcher<ClientEvent>, sink: Arc<dyn CommandSink>) -> Self {
        let inner = Arc::new(Inner {
            sink,
            state: Mutex::new(UiState::default()),
            events: Dispatcher::new(),
        });

        for event_type in [event_types::QML_TREE, event_types::VIEW_TREE] {
            subscribe_weak(source, event_type, &inner, |inner, event| {
                if let Some(message) = event.as_peer() {
                    inner.on_tree(message);
                }
            });
        }
        for event_type in [
            event_types::SCREEN_CAPTURE,
            event_types::SCREENSHOT,
            event_types::SCREEN,
        ] {
            subscribe_weak(source, event_type, &inner, |inner, event| {
                if let Some(message) = event.as_peer() {
                    inner.on_screen(message);
                }
            });
        }
        subscribe_weak(source, event_types::CONNECTING, &inner, |inner, _| inner.reset());

        Self { inner }
    }

    /// Where `tree` and `screenshot` are published.
    pub fn events(&self) -> &Dispatcher<UiEvent> {
        &self.inner.events
    }

    /// The latest tree, if one arrived on this connection.
    pub fn tree(&self) -> Option<Arc<UiTree>> {
        self.inner.state.lock().tree.clone()
    }

    /// The latest encoded screenshot.
    pub fn screenshot(&self) -> Option<Arc<str>> {
        self.inner.state.lock().screenshot.clone()
    }

    /// Sets the `collapsed` flag of one node in the stored tree.
    ///
    /// Returns `false` when there is no tree or no such node.  No event is
    /// published; collapsing is a view concern.
    pub fn set_collapsed(&self, id: NodeId, collapsed: bool) -> bool {
        let mut state = self.inner.state.lock();
        match state.tree.as_mut() {
            Some(tree) => Arc::make_mut(tree).set_collapsed(id, collapsed),
            None => false,
        }
    }

    /// Requests a fresh tree and a fresh screenshot.
    pub fn refresh(&self) {
        self.inner.send(VIEW_TREE);
        self.inner.send(SCREEN_CAPTURE);
    }

    /// Requests a fresh screenshot.
    pub fn get_screen(&self) {
        self.inner.send(SCREEN_CAPTURE);
    }

    /// Requests a screenshot every `every` until the observer is dropped.
    ///
    /// The first request goes out one period after the call.  Periods shorter
    /// than [`MIN_SCREEN_REFRESH`] (including zero) are raised to it.  Must be
    /// called from within a tokio runtime.
    pub fn spawn_screen_poller(&self, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let every = every.max(MIN_SCREEN_REFRESH);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("screen poller stopping: observer dropped");
                    break;
                };
                inner.send(SCREEN_CAPTURE);
            }
        })
    }
}

impl Inner {
    fn send(&self, command: &str) {
        if let Err(e) = self.sink.send_command(command) {
            warn!(command, "could not send UI command: {e}");
        }
    }

    fn on_tree(&self, message: &PeerMessage) {
        let tree = match UiTree::from_message(message) {
            Ok(tree) => Arc::new(tree),
            Err(e) => {
                debug!(message_type = message.message_type(), "skipping UI tree: {e}");
                return;
            }
        };
        debug!(nodes = tree.len(), "UI tree replaced");

        self.state.lock().tree = Some(Arc::clone(&tree));
        self.events.emit(&UiEvent::Tree { tree });
    }

    fn on_screen(&self, message: &PeerMessage) {
        let Some(image) = message.value_str() else {
            debug!(message_type = message.message_type(), "screenshot without a string value");
            return;
        };
        let image: Arc<str> = Arc::from(image);

        self.state.lock().screenshot = Some(Arc::clone(&image));
        self.events.emit(&UiEvent::Screenshot { image });
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.tree = None;
        state.screenshot = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
