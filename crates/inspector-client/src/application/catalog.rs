//! Command catalog observer.
//!
//! Learns which commands the peer understands from its `help` reply.  The
//! catalog is filled once per connection: after the first usable reply it is
//! *ready*, later replies are ignored, and `disconnected` empties it again.
//!
//! On `connected` the observer asks for the catalog itself by sending `help`.

use std::sync::Arc;

use inspector_core::{
    event_types, parse_help_text, CatalogCommand, ClientEvent, Dispatcher, PeerMessage, TypedEvent,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{subscribe_weak, CommandSink};

/// Events published by [`CommandCatalogObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// The catalog became ready with these commands.
    CommandsChanged { commands: Vec<CatalogCommand> },
}

impl TypedEvent for CatalogEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::CommandsChanged { .. } => "commandsChanged",
        }
    }
}

#[derive(Default)]
struct CatalogState {
    ready: bool,
    commands: Vec<CatalogCommand>,
}

struct Inner {
    sink: Arc<dyn CommandSink>,
    state: Mutex<CatalogState>,
    events: Dispatcher<CatalogEvent>,
}

/// Tracks the peer's command catalog.
pub struct CommandCatalogObserver {
    inner: Arc<Inner>,
}

impl CommandCatalogObserver {
    /// Subscribes to `source` and requests the catalog through `sink` on
    /// every `connected`.
    pub fn new(source: &Dispatcher<ClientEvent>, sink: Arc<dyn CommandSink>) -> Self {
        let inner = Arc::new(Inner {
            sink,
            state: Mutex::new(CatalogState::default()),
            events: Dispatcher::new(),
        });

        subscribe_weak(source, event_types::CONNECTED, &inner, |inner, _| inner.on_connected());
        subscribe_weak(source, event_types::HELP, &inner, |inner, event| {
            if let Some(message) = event.as_peer() {
                inner.on_help(message);
            }
        });
        subscribe_weak(source, event_types::DISCONNECTED, &inner, |inner, _| {
            inner.on_disconnected();
        });

        Self { inner }
    }

    /// Where `commandsChanged` is published.
    pub fn events(&self) -> &Dispatcher<CatalogEvent> {
        &self.inner.events
    }

    /// `true` once a usable `help` reply arrived on this connection.
    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().ready
    }

    /// The advertised commands, in reply order.
    pub fn commands(&self) -> Vec<CatalogCommand> {
        self.inner.state.lock().commands.clone()
    }

    /// Just the command names.
    pub fn command_names(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .commands
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Returns `true` if the peer advertised `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.state.lock().commands.iter().any(|c| c.name == name)
    }

    /// Sends `help` to the peer.
    pub fn request(&self) {
        self.inner.request();
    }
}

impl Inner {
    fn request(&self) {
        if let Err(e) = self.sink.send_command("help") {
            warn!("could not request command catalog: {e}");
        }
    }

    fn on_connected(&self) {
        if !self.state.lock().ready {
            self.request();
        }
    }

    fn on_help(&self, message: &PeerMessage) {
        if let Some(error) = message.error() {
            debug!(error, "help reply carried an error");
            return;
        }
        let Some(text) = message.value_str() else {
            debug!("help reply has no text value");
            return;
        };

        let commands = {
            let mut state = self.state.lock();
            if state.ready {
                return;
            }
            let commands = parse_help_text(text);
            if commands.is_empty() {
                debug!("help reply listed no commands");
                return;
            }
            state.ready = true;
            state.commands = commands.clone();
            commands
        };

        info!(count = commands.len(), "command catalog ready");
        self.events.emit(&CatalogEvent::CommandsChanged { commands });
    }

    fn on_disconnected(&self) {
        let mut state = self.state.lock();
        state.ready = false;
        state.commands.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::MockCommandSink;
    use inspector_core::decode_value;
    use serde_json::json;

    fn help(value: &str) -> ClientEvent {
        ClientEvent::Peer(decode_value(json!({"type": "help", "value": value})).unwrap())
    }

    fn quiet_sink() -> Arc<dyn CommandSink> {
        let mut sink = MockCommandSink::new();
        sink.expect_send_command().returning(|_| Ok(()));
        Arc::new(sink)
    }

    fn count_changes(observer: &CommandCatalogObserver) -> Arc<Mutex<usize>> {
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        observer
            .events()
            .subscribe("commandsChanged", move |_: &CatalogEvent| *counter.lock() += 1);
        count
    }

    #[test]
    fn test_help_reply_populates_catalog_once_per_connection() {
        // Arrange
        let source = Dispatcher::new();
        let observer = CommandCatalogObserver::new(&source, quiet_sink());
        let changes = count_changes(&observer);

        // Act
        source.emit(&help("help\tThe help menu\nreset\tReset the app\n"));
        source.emit(&help("other\tIgnored while ready\n"));

        // Assert
        assert_eq!(*changes.lock(), 1);
        assert!(observer.is_ready());
        assert_eq!(observer.command_names(), vec!["help", "reset"]);
        assert!(!observer.contains("other"));
    }

    #[test]
    fn test_disconnect_resets_and_next_help_emits_again() {
        // Arrange
        let source = Dispatcher::new();
        let observer = CommandCatalogObserver::new(&source, quiet_sink());
        let changes = count_changes(&observer);
        source.emit(&help("help\tThe help menu\n"));

        // Act
        source.emit(&ClientEvent::Disconnected { url: "ws://localhost:8765".into() });
        let emptied = observer.commands().is_empty();
        source.emit(&help("help\tThe help menu\nquit\tQuit\n"));

        // Assert
        assert!(emptied);
        assert_eq!(*changes.lock(), 2);
        assert_eq!(observer.commands().len(), 2);
    }

    #[test]
    fn test_connected_requests_help_only_when_not_ready() {
        // Arrange: exactly one `help` may be sent
        let mut sink = MockCommandSink::new();
        sink.expect_send_command()
            .withf(|command| command.to_string() == "help")
            .times(1)
            .returning(|_| Ok(()));
        let source = Dispatcher::new();
        let observer = CommandCatalogObserver::new(&source, Arc::new(sink));
        let connected = ClientEvent::Connected { url: "ws://localhost:8765".into() };

        // Act
        source.emit(&connected);
        source.emit(&help("help\tThe help menu\n"));
        source.emit(&connected);

        // Assert
        assert!(observer.is_ready());
    }

    #[test]
    fn test_unusable_replies_change_nothing() {
        let source = Dispatcher::new();
        let observer = CommandCatalogObserver::new(&source, quiet_sink());
        let changes = count_changes(&observer);

        source.emit(&help("no tabs anywhere"));
        source.emit(&ClientEvent::Peer(
            decode_value(json!({"type": "help", "error": "boom", "value": "help\tx"})).unwrap(),
        ));

        assert_eq!(*changes.lock(), 0);
        assert!(!observer.is_ready());
    }

    #[test]
    fn test_dropped_observer_stops_handling() {
        let source = Dispatcher::new();
        let observer = CommandCatalogObserver::new(&source, quiet_sink());
        drop(observer);

        // Handlers stay registered but find nothing to update.
        assert_eq!(source.emit(&help("help\tThe help menu\n")), 1);
    }
}
