//! Integration tests for a full session over a real WebSocket.
//!
//! # Purpose
//!
//! These tests run an in-process peer on `127.0.0.1:0` built with
//! `tokio_tungstenite::accept_async` and drive an [`InspectorSession`]
//! against it through the public API only.  They verify:
//!
//! - Commands sent before the connection opens are flushed in order once it
//!   does, after the catalog's own `help` request is queued behind them.
//! - Peer frames reach the observers: `help` fills the catalog, `log` lines
//!   land in the log buffer, `network` exchanges get ids.
//! - Malformed frames are skipped without closing the connection.
//! - A peer hang-up produces `disconnected` and a status change.
//!
//! # Peer script
//!
//! ```text
//! client                               peer
//! ──────                               ────
//! connect ───────────────────────────► accept
//! queued commands, then "help" ──────► record every command
//!                                      ◄── scripted frames
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use inspector_client::{ClientConfig, ConnectionStatus, InspectorSession};
use inspector_core::TypedEvent;
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// A scripted peer: forwards every received command to `commands` and sends
/// each frame it gets from the returned sender.
async fn spawn_peer() -> (String, mpsc::UnboundedReceiver<String>, mpsc::UnboundedSender<Message>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut source) = socket.split();
        loop {
            tokio::select! {
                frame = frame_rx.recv() => match frame {
                    Some(frame) => {
                        if sink.send(frame).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                },
                incoming = source.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let _ = command_tx.send(text);
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
            }
        }
    });

    (url, command_rx, frame_tx)
}

async fn recv_command(commands: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(2), commands.recv())
        .await
        .expect("peer did not receive a command in time")
        .expect("peer task ended")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn text(value: serde_json::Value) -> Message {
    Message::Text(value.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_queued_commands_flush_in_order_on_connect() {
    // Arrange
    let (url, mut commands, _frames) = spawn_peer().await;
    let session = InspectorSession::new(&ClientConfig::default(), None);
    session.send_command("view_tree").unwrap();
    session.network().start();

    // Act
    let connected = session.connect(&url).await;

    // Assert: held commands first, then the catalog's own request
    assert_eq!(connected, Ok(url));
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert_eq!(recv_command(&mut commands).await, "view_tree");
    assert_eq!(recv_command(&mut commands).await, "fetch_network");
    assert_eq!(recv_command(&mut commands).await, "help");
}

#[tokio::test]
async fn test_peer_frames_reach_every_observer() {
    // Arrange
    let (url, mut commands, frames) = spawn_peer().await;
    let session = InspectorSession::new(&ClientConfig::default(), None);
    session.connect(&url).await.unwrap();
    assert_eq!(recv_command(&mut commands).await, "help");

    // Act
    frames.send(text(json!({"type": "help", "value": "help\tThe help menu\nview_tree\tDump the tree\n"}))).unwrap();
    frames.send(Message::Text("{not json".into())).unwrap();
    frames.send(text(json!({
        "type": "log",
        "value": "[01.02.2024 03:04:05.000] (main|controller - ControllerClass) message text"
    }))).unwrap();
    frames.send(text(json!({
        "type": "network",
        "request": {"url": "https://example.com/api", "headers": [], "initiator": "Unknown"},
        "response": {"status": 500, "headers": {}, "errors": "", "body": ""}
    }))).unwrap();
    frames.send(text(json!({"type": "qml_tree", "tree": [{"x": 10, "y": 10, "subItems": [{"x": 5, "y": 5}]}]}))).unwrap();

    wait_until(|| session.ui().tree().is_some()).await;

    // Assert
    assert_eq!(session.catalog().command_names(), vec!["help", "view_tree"]);
    let logs = session.logs().logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].modules, vec!["main", "controller"]);
    let entry = session.network().get(1).unwrap();
    assert!(entry.is_error());
    assert_eq!(entry.request.url.host(), "example.com");
    assert_eq!(session.ui().tree().unwrap().len(), 2);
    assert_eq!(session.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_peer_hang_up_reports_disconnected() {
    // Arrange
    let (url, mut commands, frames) = spawn_peer().await;
    let session = InspectorSession::new(&ClientConfig::default(), None);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session
        .connection()
        .events()
        .subscribe_any(move |e: &inspector_core::ClientEvent| sink.lock().push(e.event_type().to_string()));
    session.connect(&url).await.unwrap();
    recv_command(&mut commands).await;

    // Act: dropping the frame sender makes the peer close the socket
    drop(frames);
    wait_until(|| session.status() == ConnectionStatus::Disconnected).await;

    // Assert
    let seen = seen.lock().clone();
    assert_eq!(seen.first().map(String::as_str), Some("connecting"));
    assert!(seen.contains(&"connected".to_string()));
    assert_eq!(seen.last().map(String::as_str), Some("disconnected"));
}

#[tokio::test]
async fn test_recording_spans_the_live_stream() {
    let (url, mut commands, frames) = spawn_peer().await;
    let session = InspectorSession::new(&ClientConfig::default(), None);
    session.connect(&url).await.unwrap();
    recv_command(&mut commands).await;

    session.logs().start_recording();
    for line in ["A", "[01.02.2024 03:04:05.000] (main - App) B"] {
        frames.send(text(json!({"type": "log", "value": line}))).unwrap();
    }
    wait_until(|| session.logs().logs().len() == 1).await;
    let recording = session.logs().stop_recording();

    assert_eq!(recording.to_text(), "A\n[01.02.2024 03:04:05.000] (main - App) B");
}
