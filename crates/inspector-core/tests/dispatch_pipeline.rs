//! Integration tests for the pure half of the inspector pipeline.
//!
//! # Purpose
//!
//! These tests feed raw peer frames through [`decode_frame`] into a
//! [`Dispatcher`] and build the domain models from what the subscribers
//! receive, exactly as the client crate's observers do, but without any
//! transport or async runtime:
//!
//! ```text
//! raw text ──► decode_frame ──► ClientEvent::Peer ──► Dispatcher ──► models
//! ```

use std::sync::Arc;

use inspector_core::{
    decode_frame, event_types, parse_help_text, ClientEvent, Dispatcher, LogEntry, NetworkEntry,
    RingBuffer, UiTree,
};
use parking_lot::Mutex;

fn emit_frame(dispatcher: &Dispatcher<ClientEvent>, text: &str) {
    let message = decode_frame(text).expect("test frames are well-formed");
    dispatcher.emit(&ClientEvent::Peer(message));
}

/// Log frames are routed by type and only well-formed lines reach the ring.
#[test]
fn test_log_frames_fill_bounded_ring() {
    // Arrange
    let dispatcher = Dispatcher::new();
    let ring = Arc::new(Mutex::new(RingBuffer::new(3)));
    let sink = Arc::clone(&ring);
    dispatcher.subscribe(event_types::LOG, move |event: &ClientEvent| {
        let line = event.as_peer().and_then(|m| m.value_str()).unwrap_or_default();
        if let Ok(entry) = LogEntry::parse(line) {
            sink.lock().push(entry);
        }
    });

    // Act
    for i in 0..5 {
        emit_frame(
            &dispatcher,
            &format!(r#"{{"type":"log","value":"[01.02.2024 03:04:05.000] (main - App) line {i}"}}"#),
        );
    }
    emit_frame(&dispatcher, r#"{"type":"log","value":"garbage"}"#);
    emit_frame(&dispatcher, r#"{"type":"network","request":{"url":"http://h/"}}"#);

    // Assert
    let logs: Vec<String> = ring.lock().iter().map(|e| e.log.clone()).collect();
    assert_eq!(logs, vec!["line 2", "line 3", "line 4"]);
}

/// Network frames get monotonic ids that keep counting past evictions.
#[test]
fn test_network_ids_survive_eviction() {
    // Arrange
    let dispatcher = Dispatcher::new();
    let ring = Arc::new(Mutex::new(RingBuffer::new(50)));
    let next_id = Arc::new(Mutex::new(0u64));
    let (sink, counter) = (Arc::clone(&ring), Arc::clone(&next_id));
    dispatcher.subscribe(event_types::NETWORK, move |event: &ClientEvent| {
        let Some(message) = event.as_peer() else { return };
        let mut id = counter.lock();
        *id += 1;
        if let Ok(entry) = NetworkEntry::from_message(*id, message) {
            sink.lock().push(entry);
        }
    });

    // Act
    for i in 0..51 {
        emit_frame(
            &dispatcher,
            &format!(r#"{{"type":"network","request":{{"url":"https://h/{i}"}},"response":{{"status":200}}}}"#),
        );
    }

    // Assert
    let ring = ring.lock();
    let ids: Vec<u64> = ring.iter().map(|e| e.id).collect();
    assert_eq!(ring.len(), 50);
    assert!(!ids.contains(&1));
    assert_eq!(ids.first(), Some(&2));
    assert_eq!(ids.last(), Some(&51));
}

/// A catch-all subscriber sees peer messages and lifecycle events alike.
#[test]
fn test_any_subscriber_sees_lifecycle_and_peer_events() {
    let dispatcher = Dispatcher::new();
    let types = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&types);
    dispatcher.subscribe_any(move |event: &ClientEvent| {
        use inspector_core::TypedEvent;
        sink.lock().push(event.event_type().to_string());
    });

    dispatcher.emit(&ClientEvent::Connecting { url: "ws://localhost:8765".into() });
    emit_frame(&dispatcher, r#"{"type":"help","value":"help\tThe help menu\n"}"#);
    emit_frame(&dispatcher, r#"{"type":"qml_tree","tree":[]}"#);

    assert_eq!(*types.lock(), vec!["connecting", "help", "qml_tree"]);
}

/// The help reply and a tree snapshot decode into their models.
#[test]
fn test_help_and_tree_payloads_decode() {
    let help = decode_frame(r#"{"type":"help","value":"help\tThe help menu\nview_tree\tSnapshot\n"}"#)
        .unwrap();
    let names: Vec<String> = parse_help_text(help.value_str().unwrap())
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["help", "view_tree"]);

    let snapshot =
        decode_frame(r#"{"type":"qml_tree","tree":[{"x":10,"y":10,"subItems":[{"x":5,"y":5}]}]}"#)
            .unwrap();
    let tree = UiTree::from_message(&snapshot).unwrap();
    let (_, child) = tree.iter().nth(1).unwrap();
    assert_eq!((child.total_x, child.total_y), (15.0, 15.0));
}
