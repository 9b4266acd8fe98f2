//! Network request observer.
//!
//! Collects the request/response pairs the peer reports once network capture
//! has been switched on with [`NetworkObserver::start`].  Ids are assigned in
//! arrival order starting at 1 and keep counting across evictions, so an id
//! never refers to two different exchanges within one connection.

use std::sync::Arc;

use inspector_core::{
    event_types, ClientEvent, Dispatcher, NetworkEntry, PeerMessage, RingBuffer, TypedEvent,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{subscribe_weak, CommandSink};

/// Command that makes the peer start forwarding network traffic.
pub const FETCH_NETWORK: &str = "fetch_network";

/// Events published by [`NetworkObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// The buffer changed; `entries` is its full content, oldest first.
    Update { entries: Vec<NetworkEntry> },
}

impl TypedEvent for NetworkEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::Update { .. } => "update",
        }
    }
}

struct NetworkState {
    ring: RingBuffer<NetworkEntry>,
    last_id: u64,
}

struct Inner {
    sink: Arc<dyn CommandSink>,
    state: Mutex<NetworkState>,
    events: Dispatcher<NetworkEvent>,
}

/// Buffers captured network exchanges.
pub struct NetworkObserver {
    inner: Arc<Inner>,
}

impl NetworkObserver {
    pub fn new(
        source: &Dispatcher<ClientEvent>,
        sink: Arc<dyn CommandSink>,
        capacity: usize,
    ) -> Self {
        let inner = Arc::new(Inner {
            sink,
            state: Mutex::new(NetworkState {
                ring: RingBuffer::new(capacity),
                last_id: 0,
            }),
            events: Dispatcher::new(),
        });

        subscribe_weak(source, event_types::NETWORK, &inner, |inner, event| {
            if let Some(message) = event.as_peer() {
                inner.on_network(message);
            }
        });
        subscribe_weak(source, event_types::CONNECTING, &inner, |inner, _| inner.reset());

        Self { inner }
    }

    /// Where `update` is published.
    pub fn events(&self) -> &Dispatcher<NetworkEvent> {
        &self.inner.events
    }

    /// Asks the peer to start forwarding network traffic.
    pub fn start(&self) {
        if let Err(e) = self.inner.sink.send_command(FETCH_NETWORK) {
            warn!("could not start network capture: {e}");
        }
    }

    /// Buffered entries, oldest first.
    pub fn entries(&self) -> Vec<NetworkEntry> {
        self.inner.state.lock().ring.to_vec()
    }

    /// Looks up an entry by id; `None` once it has been evicted.
    pub fn get(&self, id: u64) -> Option<NetworkEntry> {
        self.inner
            .state
            .lock()
            .ring
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.state.lock().ring.capacity()
    }
}

impl Inner {
    fn on_network(&self, message: &PeerMessage) {
        let entries = {
            let mut state = self.state.lock();
            let id = state.last_id + 1;
            let entry = match NetworkEntry::from_message(id, message) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("skipping network message: {e}");
                    return;
                }
            };
            state.last_id = id;
            state.ring.push(entry);
            state.ring.to_vec()
        };

        self.events.emit(&NetworkEvent::Update { entries });
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.ring.clear();
        state.last_id = 0;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::MockCommandSink;
    use inspector_core::decode_value;
    use serde_json::json;

    fn network(url: &str, status: i64) -> ClientEvent {
        ClientEvent::Peer(
            decode_value(json!({
                "type": "network",
                "request": {"url": url, "headers": ["Accept"], "initiator": "Task"},
                "response": {"status": status, "headers": {}, "errors": "", "body": ""}
            }))
            .unwrap(),
        )
    }

    fn idle_sink() -> Arc<dyn CommandSink> {
        Arc::new(MockCommandSink::new())
    }

    #[test]
    fn test_ids_stay_monotonic_across_evictions() {
        // Arrange
        let source = Dispatcher::new();
        let observer = NetworkObserver::new(&source, idle_sink(), 50);

        // Act
        for n in 0..51 {
            source.emit(&network(&format!("https://example.com/{n}"), 200));
        }

        // Assert
        assert_eq!(observer.len(), 50);
        assert!(observer.get(1).is_none());
        assert_eq!(observer.get(51).unwrap().request.url.path(), "/50");
        assert_eq!(observer.entries().first().map(|e| e.id), Some(2));
    }

    #[test]
    fn test_update_carries_full_list() {
        let source = Dispatcher::new();
        let observer = NetworkObserver::new(&source, idle_sink(), 5);
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sizes);
        observer.events().subscribe("update", move |e: &NetworkEvent| {
            let NetworkEvent::Update { entries } = e;
            sink.lock().push(entries.len());
        });

        source.emit(&network("https://example.com/a", 200));
        source.emit(&network("https://example.com/b", 404));

        assert_eq!(*sizes.lock(), vec![1, 2]);
        assert!(observer.get(2).unwrap().is_error());
    }

    #[test]
    fn test_relative_url_is_skipped_without_consuming_an_id() {
        // Arrange
        let source = Dispatcher::new();
        let observer = NetworkObserver::new(&source, idle_sink(), 5);

        // Act
        source.emit(&network("/relative/only", 200));
        source.emit(&network("https://example.com/ok", 200));

        // Assert
        assert_eq!(observer.len(), 1);
        assert_eq!(observer.entries()[0].id, 1);
    }

    #[test]
    fn test_connecting_resets_buffer_and_counter() {
        let source = Dispatcher::new();
        let observer = NetworkObserver::new(&source, idle_sink(), 5);
        source.emit(&network("https://example.com/a", 200));
        source.emit(&network("https://example.com/b", 200));

        source.emit(&ClientEvent::Connecting { url: "ws://localhost:8765".into() });
        source.emit(&network("https://example.com/c", 200));

        assert_eq!(observer.entries().len(), 1);
        assert_eq!(observer.entries()[0].id, 1);
    }

    #[test]
    fn test_start_sends_fetch_network_without_touching_state() {
        // Arrange
        let mut sink = MockCommandSink::new();
        sink.expect_send_command()
            .withf(|command| command.to_string() == FETCH_NETWORK)
            .times(1)
            .returning(|_| Ok(()));
        let source = Dispatcher::new();
        let observer = NetworkObserver::new(&source, Arc::new(sink), 5);

        // Act
        observer.start();

        // Assert
        assert!(observer.is_empty());
        assert_eq!(observer.capacity(), 5);
    }
}
