//! Connection bookkeeping shared by both transports.
//!
//! A transport's I/O loop runs on its own tokio task.  Everything that task
//! and the public methods both touch lives here: the current URL, the status,
//! the queue of commands sent before the connection opened, and a
//! *generation* counter.
//!
//! # Generations
//!
//! Every call that starts a new attempt bumps the generation.  The I/O task
//! is told the generation it was started for and passes it back on every
//! state change; a task whose generation is no longer current has been
//! replaced or closed, so its calls are ignored.  That is what keeps a
//! half-finished handshake to an old URL from reporting `connected` after
//! the caller has already moved on.
//!
//! # Waiting for an attempt
//!
//! Callers of `connect()` wait on a `watch` channel carrying the latest
//! [`Attempt`].  A caller joining an attempt that is already in flight simply
//! waits on the same generation.
//!
//! No lock is ever held while an event is emitted.

use std::collections::VecDeque;
use std::sync::Arc;

use inspector_core::{decode_frame, decode_value, ClientEvent, Dispatcher, PeerMessage};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ConnectError, ConnectionStatus};

/// Latest connection attempt and, once known, its outcome.
#[derive(Debug, Clone)]
struct Attempt {
    generation: u64,
    result: Option<Result<(), ConnectError>>,
}

/// What [`Lifecycle::begin`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Begin {
    /// A new attempt was registered; the caller must start its I/O task.
    Start { generation: u64 },
    /// An attempt to the same URL is already pending or open.
    Join { generation: u64 },
}

#[derive(Default)]
struct State {
    url: Option<String>,
    generation: u64,
    status: ConnectionStatus,
    pending: VecDeque<String>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl State {
    /// Stops the current attempt.  Returns its URL if it was pending or open.
    fn teardown(&mut self) -> Option<String> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.outbound = None;
        let was_active = self.status != ConnectionStatus::Disconnected;
        self.status = ConnectionStatus::Disconnected;
        let url = self.url.take();
        if was_active {
            self.pending.clear();
            url
        } else {
            None
        }
    }
}

pub(crate) struct Lifecycle {
    events: Arc<Dispatcher<ClientEvent>>,
    state: Mutex<State>,
    attempts: watch::Sender<Attempt>,
}

impl Lifecycle {
    pub(crate) fn new(events: Arc<Dispatcher<ClientEvent>>) -> Self {
        let (attempts, _) = watch::channel(Attempt {
            generation: 0,
            result: None,
        });
        Self {
            events,
            state: Mutex::new(State::default()),
            attempts,
        }
    }

    pub(crate) fn events(&self) -> &Arc<Dispatcher<ClientEvent>> {
        &self.events
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    pub(crate) fn current_url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    /// Number of commands waiting for the connection to open.
    pub(crate) fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Publishes a connect-time failure for a request that never started an
    /// attempt (bad URL, missing host).
    pub(crate) fn reject(&self, url: &str, error: ConnectError) -> Result<String, ConnectError> {
        warn!(url, %error, "connection rejected");
        self.events.emit(&ClientEvent::ConnectionFailed {
            url: url.to_string(),
            reason: error.to_string(),
        });
        Err(error)
    }

    /// Registers a connect to `url`.
    ///
    /// Emits `disconnected` for a replaced attempt and `connecting` for the
    /// new one.  Nothing is emitted when joining.
    pub(crate) fn begin(&self, url: &str) -> Begin {
        let (generation, replaced) = {
            let mut state = self.state.lock();
            if state.url.as_deref() == Some(url) && state.status != ConnectionStatus::Disconnected {
                return Begin::Join {
                    generation: state.generation,
                };
            }

            let replaced = state.teardown();
            state.generation += 1;
            state.url = Some(url.to_string());
            state.status = ConnectionStatus::Connecting;
            self.attempts.send_replace(Attempt {
                generation: state.generation,
                result: None,
            });
            (state.generation, replaced)
        };

        if let Some(old) = replaced {
            info!(old = %old, new = url, "replacing connection");
            self.events.emit(&ClientEvent::Disconnected { url: old });
        }
        info!(url, "connecting");
        self.events.emit(&ClientEvent::Connecting {
            url: url.to_string(),
        });
        Begin::Start { generation }
    }

    /// Stores the I/O task of `generation` so it can be aborted later.
    pub(crate) fn attach_task(&self, generation: u64, task: JoinHandle<()>) {
        let mut state = self.state.lock();
        if state.generation == generation && state.status != ConnectionStatus::Disconnected {
            state.task = Some(task);
        } else {
            task.abort();
        }
    }

    /// Waits until attempt `generation` resolves.
    pub(crate) async fn wait(&self, generation: u64, url: &str) -> Result<String, ConnectError> {
        let mut attempts = self.attempts.subscribe();
        let attempt = attempts
            .wait_for(|a| a.generation != generation || a.result.is_some())
            .await
            .map(|a| a.clone());

        match attempt {
            Ok(Attempt {
                generation: current,
                result: Some(result),
            }) if current == generation => result.map(|()| url.to_string()),
            Ok(_) => Err(ConnectError::Superseded {
                url: url.to_string(),
            }),
            Err(_) => Err(ConnectError::Closed {
                url: url.to_string(),
            }),
        }
    }

    /// Marks attempt `generation` as open and hands back the queued commands,
    /// which the I/O task must write before anything from `outbound`.
    ///
    /// Returns `None` if the attempt is stale.
    pub(crate) fn open(
        &self,
        generation: u64,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Option<Vec<String>> {
        let mut state = self.state.lock();
        if state.generation != generation {
            return None;
        }
        state.status = ConnectionStatus::Connected;
        state.outbound = Some(outbound);
        Some(state.pending.drain(..).collect())
    }

    /// Emits `connected` and resolves everyone waiting on `generation`.
    pub(crate) fn announce_connected(&self, generation: u64) {
        let url = {
            let state = self.state.lock();
            if state.generation != generation || state.status != ConnectionStatus::Connected {
                return;
            }
            state.url.clone().unwrap_or_default()
        };

        info!(url = %url, "connected");
        self.events.emit(&ClientEvent::Connected { url });
        self.attempts.send_replace(Attempt {
            generation,
            result: Some(Ok(())),
        });
    }

    /// Ends attempt `generation` before it was established.
    pub(crate) fn fail(&self, generation: u64, error: ConnectError) {
        let url = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.task = None;
            state.teardown()
        };

        warn!(%error, "connection failed");
        if let Some(url) = url {
            self.events.emit(&ClientEvent::ConnectionFailed {
                url,
                reason: error.to_string(),
            });
        }
        self.attempts.send_replace(Attempt {
            generation,
            result: Some(Err(error)),
        });
    }

    /// Ends attempt `generation` after its I/O loop stopped on its own.
    pub(crate) fn finish(&self, generation: u64) {
        let url = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.task = None;
            state.teardown()
        };

        if let Some(url) = url {
            info!(url = %url, "disconnected");
            self.events.emit(&ClientEvent::Disconnected { url });
        }
    }

    /// Closes whatever is pending or open and drops every queued command.
    pub(crate) fn close(&self) {
        let closed = {
            let mut state = self.state.lock();
            let generation = state.generation;
            let url = state.teardown();
            state.pending.clear();
            state.generation += 1;
            url.map(|url| (generation, url))
        };

        if let Some((generation, url)) = closed {
            self.attempts.send_replace(Attempt {
                generation,
                result: Some(Err(ConnectError::Closed { url: url.clone() })),
            });
            info!(url = %url, "closed");
            self.events.emit(&ClientEvent::Disconnected { url });
        }
    }

    /// Aborts the I/O task without emitting anything (used on drop).
    pub(crate) fn abort(&self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
        }
    }

    /// Sends `command` on the open connection, or queues it.
    pub(crate) fn send(&self, command: String) {
        let mut state = self.state.lock();
        let connected = state.status == ConnectionStatus::Connected;
        let command = match (connected, state.outbound.as_ref()) {
            (true, Some(outbound)) => match outbound.send(command) {
                Ok(()) => return,
                Err(mpsc::error::SendError(command)) => command,
            },
            _ => command,
        };
        debug!(command = %command, "queueing command until connected");
        state.pending.push_back(command);
    }

    /// Decodes one text frame and publishes it.
    pub(crate) fn deliver_frame(&self, generation: u64, text: &str) {
        match decode_frame(text) {
            Ok(message) => self.deliver(generation, message),
            Err(e) => debug!(error = %e, "skipping undecodable frame"),
        }
    }

    /// Publishes one already-parsed host message.
    pub(crate) fn deliver_value(&self, generation: u64, value: Value) {
        match decode_value(value) {
            Ok(message) => self.deliver(generation, message),
            Err(e) => debug!(error = %e, "skipping undecodable host message"),
        }
    }

    fn deliver(&self, generation: u64, message: PeerMessage) {
        if !self.is_current(generation) {
            return;
        }
        debug!(message_type = message.message_type(), "peer message");
        self.events.emit(&ClientEvent::Peer(message));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
