//! Typed publish/subscribe dispatcher.
//!
//! Every component of the inspector communicates through a [`Dispatcher`]:
//! transports emit lifecycle and peer events into one, observers subscribe to
//! it, and each observer owns a dispatcher of its own for the derived events
//! it publishes (`newLogs`, `update`, `tree`, ...).
//!
//! # Contract
//!
//! - [`Dispatcher::subscribe`] registers a handler for one event type.
//! - [`Dispatcher::subscribe_any`] registers a handler for every event.
//! - [`Dispatcher::emit`] runs all matching handlers synchronously, in
//!   subscription order, on the calling thread.
//! - A handler that panics is caught and logged; the remaining handlers still
//!   run and the panic never reaches the emitter.
//! - Handlers are not deduplicated: subscribing twice means being called twice.
//! - There is no per-handler unsubscribe.  [`Dispatcher::clear`] drops every
//!   handler at once when the owning connection is torn down.
//!
//! # Re-entrancy
//!
//! The subscription list is copied out of the lock before any handler runs, so
//! a handler may emit further events or register new handlers on the same
//! dispatcher without deadlocking.  Handlers registered during an emission are
//! first called on the *next* emission.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

/// An event that can be routed by its type name.
///
/// The type name is the dispatch key: it is what [`Dispatcher::subscribe`]
/// matches against.  For peer messages this is the JSON `type` field.
pub trait TypedEvent {
    /// Returns the event's type name, e.g. `"connected"` or `"log"`.
    fn event_type(&self) -> &str;
}

/// Shared handler closure.
///
/// `Arc` (rather than `Box`) lets `emit` clone the handler list out of the
/// lock cheaply before invoking anything.
type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Which events a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    /// Only events whose type name equals the string.
    Type(String),
    /// Every event.
    Any,
}

impl Filter {
    fn matches(&self, event_type: &str) -> bool {
        match self {
            Self::Type(wanted) => wanted == event_type,
            Self::Any => true,
        }
    }
}

struct Subscription<E> {
    filter: Filter,
    handler: Handler<E>,
}

/// A typed publish/subscribe hub.
///
/// The dispatcher retains no events; it only routes them.
pub struct Dispatcher<E> {
    subscriptions: Mutex<Vec<Subscription<E>>>,
}

impl<E: TypedEvent> Dispatcher<E> {
    /// Creates a dispatcher with no subscribers.
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Registers `handler` for events whose type name equals `event_type`.
    pub fn subscribe<F>(&self, event_type: impl Into<String>, handler: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscriptions.lock().push(Subscription {
            filter: Filter::Type(event_type.into()),
            handler: Arc::new(handler),
        });
    }

    /// Registers `handler` for every event regardless of type.
    pub fn subscribe_any<F>(&self, handler: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscriptions.lock().push(Subscription {
            filter: Filter::Any,
            handler: Arc::new(handler),
        });
    }

    /// Delivers `event` to every matching handler, in subscription order.
    ///
    /// Returns the number of handlers that completed without panicking.
    pub fn emit(&self, event: &E) -> usize {
        let event_type = event.event_type();

        // Snapshot the matching handlers so the lock is not held while user
        // code runs.
        let matching: Vec<Handler<E>> = {
            let subscriptions = self.subscriptions.lock();
            subscriptions
                .iter()
                .filter(|s| s.filter.matches(event_type))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        let mut completed = 0;
        for handler in &matching {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => completed += 1,
                Err(_) => {
                    error!(event_type, "event handler panicked; remaining handlers still run");
                }
            }
        }
        completed
    }

    /// Returns the number of registered handlers (typed and catch-all).
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Drops every registered handler.
    pub fn clear(&self) {
        self.subscriptions.lock().clear();
    }
}

impl<E: TypedEvent> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscriptions.lock().len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping(u32),
        Pong(u32),
    }

    impl TypedEvent for TestEvent {
        fn event_type(&self) -> &str {
            match self {
                Self::Ping(_) => "ping",
                Self::Pong(_) => "pong",
            }
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<TestEvent>>>, impl Fn(&TestEvent) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |e: &TestEvent| sink.lock().push(e.clone()))
    }

    #[test]
    fn test_typed_handler_receives_only_matching_events_in_order() {
        // Arrange
        let dispatcher = Dispatcher::new();
        let (seen, handler) = recorder();
        dispatcher.subscribe("ping", handler);

        // Act
        dispatcher.emit(&TestEvent::Ping(1));
        dispatcher.emit(&TestEvent::Pong(2));
        dispatcher.emit(&TestEvent::Ping(3));

        // Assert
        assert_eq!(*seen.lock(), vec![TestEvent::Ping(1), TestEvent::Ping(3)]);
    }

    #[test]
    fn test_any_handler_receives_every_event() {
        let dispatcher = Dispatcher::new();
        let (seen, handler) = recorder();
        dispatcher.subscribe_any(handler);

        dispatcher.emit(&TestEvent::Ping(1));
        dispatcher.emit(&TestEvent::Pong(2));

        assert_eq!(*seen.lock(), vec![TestEvent::Ping(1), TestEvent::Pong(2)]);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        // Arrange
        let dispatcher = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            if tag == "second" {
                dispatcher.subscribe_any(move |_: &TestEvent| order.lock().push(tag));
            } else {
                dispatcher.subscribe("ping", move |_: &TestEvent| order.lock().push(tag));
            }
        }

        // Act
        dispatcher.emit(&TestEvent::Ping(0));

        // Assert
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_double_subscription_yields_double_invocation() {
        let dispatcher = Dispatcher::new();
        let (seen, handler) = recorder();
        let handler = Arc::new(handler);
        let a = Arc::clone(&handler);
        let b = Arc::clone(&handler);
        dispatcher.subscribe("pong", move |e: &TestEvent| a(e));
        dispatcher.subscribe("pong", move |e: &TestEvent| b(e));

        let completed = dispatcher.emit(&TestEvent::Pong(7));

        assert_eq!(completed, 2);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_siblings() {
        // Arrange: a panicking handler sits between two recording handlers
        let dispatcher = Dispatcher::new();
        let (seen, handler) = recorder();
        let handler = Arc::new(handler);
        let before = Arc::clone(&handler);
        let after = Arc::clone(&handler);
        dispatcher.subscribe_any(move |e: &TestEvent| before(e));
        dispatcher.subscribe_any(|_: &TestEvent| panic!("handler failure"));
        dispatcher.subscribe_any(move |e: &TestEvent| after(e));

        // Act
        let completed = dispatcher.emit(&TestEvent::Ping(9));

        // Assert – the failure is contained and counted out
        assert_eq!(completed, 2);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_handler_may_subscribe_during_emit_without_deadlock() {
        // Arrange
        let dispatcher = Arc::new(Dispatcher::new());
        let inner = Arc::clone(&dispatcher);
        let (seen, handler) = recorder();
        let handler = Arc::new(handler);
        dispatcher.subscribe("ping", move |_: &TestEvent| {
            let handler = Arc::clone(&handler);
            inner.subscribe("pong", move |e: &TestEvent| handler(e));
        });

        // Act
        dispatcher.emit(&TestEvent::Ping(1));
        dispatcher.emit(&TestEvent::Pong(2));

        // Assert – the handler registered mid-emission sees the next event
        assert_eq!(*seen.lock(), vec![TestEvent::Pong(2)]);
        assert_eq!(dispatcher.subscriber_count(), 2);
    }

    #[test]
    fn test_emit_without_subscribers_invokes_nothing() {
        let dispatcher: Dispatcher<TestEvent> = Dispatcher::default();
        assert_eq!(dispatcher.emit(&TestEvent::Ping(1)), 0);
    }

    #[test]
    fn test_clear_drops_all_handlers() {
        let dispatcher = Dispatcher::new();
        let (seen, handler) = recorder();
        dispatcher.subscribe_any(handler);

        dispatcher.clear();
        dispatcher.emit(&TestEvent::Ping(1));

        assert_eq!(dispatcher.subscriber_count(), 0);
        assert!(seen.lock().is_empty());
    }
}
