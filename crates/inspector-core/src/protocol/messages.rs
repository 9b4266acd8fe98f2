//! Event and message types flowing through the client's dispatcher.
//!
//! # Two kinds of events
//!
//! ```text
//! ClientEvent
//!   ├── Connecting / Connected / ConnectionFailed / Disconnected
//!   │       produced by the transports themselves
//!   └── Peer(PeerMessage)
//!           one decoded JSON object sent by the peer
//! ```
//!
//! Both kinds are routed by a type name (see [`TypedEvent`]).  Lifecycle
//! events use fixed names from [`event_types`]; peer messages use whatever the
//! peer put in the `"type"` field, so observers subscribe to `"log"`,
//! `"network"`, `"qml_tree"` and so on without the core knowing every type
//! in advance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::TypedEvent;

/// Well-known event type names.
pub mod event_types {
    /// A transport started a connection attempt.
    pub const CONNECTING: &str = "connecting";
    /// The transport reached the connected state.
    pub const CONNECTED: &str = "connected";
    /// A connection attempt failed before reaching the connected state.
    pub const CONNECTION_FAILED: &str = "connectionFailed";
    /// An established (or pending) connection was closed.
    pub const DISCONNECTED: &str = "disconnected";

    /// Reply to the `help` introspection command.
    pub const HELP: &str = "help";
    /// One raw log line forwarded by the peer.
    pub const LOG: &str = "log";
    /// A finished network request forwarded by the peer.
    pub const NETWORK: &str = "network";
    /// UI tree snapshot (QML scene graph).
    pub const QML_TREE: &str = "qml_tree";
    /// UI tree snapshot (reply to the `view_tree` command).
    pub const VIEW_TREE: &str = "view_tree";
    /// Screenshot reply to the `screen_capture` command.
    pub const SCREEN_CAPTURE: &str = "screen_capture";
    /// Screenshot pushed by the peer.
    pub const SCREENSHOT: &str = "screenshot";
    /// Screenshot reply as labelled by some peer builds.
    pub const SCREEN: &str = "screen";
}

/// One JSON object received from the peer.
///
/// The `type` field is lifted out as the dispatch key; every other field is
/// kept verbatim in `body`.
///
/// ```rust
/// use inspector_core::PeerMessage;
///
/// let msg: PeerMessage = serde_json::from_str(r#"{"type":"log","value":"hi"}"#).unwrap();
/// assert_eq!(msg.message_type(), "log");
/// assert_eq!(msg.value_str(), Some("hi"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMessage {
    /// The dispatch key (`"log"`, `"network"`, `"help"`, ...).
    #[serde(rename = "type")]
    pub message_type: String,

    /// All remaining fields of the JSON object.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl PeerMessage {
    /// Builds a message from a type name and a body object.
    pub fn new(message_type: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            message_type: message_type.into(),
            body,
        }
    }

    /// Returns the message's `type` field.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Returns an arbitrary payload field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Returns the generic `value` payload, if present.
    pub fn value(&self) -> Option<&Value> {
        self.body.get("value")
    }

    /// Returns the `value` payload when it is a string.
    pub fn value_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    /// Returns the peer-reported error message, if any.
    ///
    /// The peer signals command failures by setting an `error` field on the
    /// reply; there is no separate error channel.
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    /// Returns `true` when the peer reported an error for this message.
    pub fn is_error(&self) -> bool {
        self.body.contains_key("error")
    }
}

/// Everything a transport can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A connection attempt to `url` started.
    Connecting { url: String },
    /// The connection to `url` is open; queued commands have been flushed.
    Connected { url: String },
    /// The attempt to reach `url` failed before it was established.
    ConnectionFailed { url: String, reason: String },
    /// The connection to `url` closed (peer hang-up, error, or teardown).
    Disconnected { url: String },
    /// A message decoded from the peer.
    Peer(PeerMessage),
}

impl ClientEvent {
    /// Returns the peer message carried by this event, if any.
    pub fn as_peer(&self) -> Option<&PeerMessage> {
        match self {
            Self::Peer(msg) => Some(msg),
            _ => None,
        }
    }
}

impl TypedEvent for ClientEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::Connecting { .. } => event_types::CONNECTING,
            Self::Connected { .. } => event_types::CONNECTED,
            Self::ConnectionFailed { .. } => event_types::CONNECTION_FAILED,
            Self::Disconnected { .. } => event_types::DISCONNECTED,
            Self::Peer(msg) => msg.message_type(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_peer_message_lifts_type_out_of_body() {
        // Arrange
        let raw = json!({"type": "network", "request": {}, "response": {}});

        // Act
        let msg: PeerMessage = serde_json::from_value(raw).unwrap();

        // Assert
        assert_eq!(msg.message_type(), "network");
        assert!(msg.get("type").is_none(), "type must not be duplicated in the body");
        assert!(msg.get("request").is_some());
    }

    #[test]
    fn test_peer_message_error_accessor() {
        let msg: PeerMessage =
            serde_json::from_value(json!({"type": "flip_on_feature", "error": "Feature does not exist"}))
                .unwrap();
        assert!(msg.is_error());
        assert_eq!(msg.error(), Some("Feature does not exist"));
    }

    #[test]
    fn test_value_str_is_none_for_non_string_value() {
        let msg: PeerMessage = serde_json::from_value(json!({"type": "languages", "value": ["en"]})).unwrap();
        assert!(msg.value().is_some());
        assert_eq!(msg.value_str(), None);
    }

    #[test]
    fn test_lifecycle_event_type_names() {
        let url = "ws://localhost:8765".to_string();
        assert_eq!(ClientEvent::Connecting { url: url.clone() }.event_type(), "connecting");
        assert_eq!(ClientEvent::Connected { url: url.clone() }.event_type(), "connected");
        assert_eq!(
            ClientEvent::ConnectionFailed { url: url.clone(), reason: "x".into() }.event_type(),
            "connectionFailed"
        );
        assert_eq!(ClientEvent::Disconnected { url }.event_type(), "disconnected");
    }

    #[test]
    fn test_peer_event_type_is_the_message_type() {
        let event = ClientEvent::Peer(PeerMessage::new("qml_tree", Map::new()));
        assert_eq!(event.event_type(), "qml_tree");
        assert!(event.as_peer().is_some());
    }

    #[test]
    fn test_serialize_flattens_body_next_to_type() {
        let mut body = Map::new();
        body.insert("value".into(), json!("line"));
        let msg = PeerMessage::new("log", body);

        let text = serde_json::to_value(&msg).unwrap();

        assert_eq!(text, json!({"type": "log", "value": "line"}));
    }
}
