//! Log stream observer.
//!
//! # Pipeline (for beginners)
//!
//! Every `log` peer message carries one raw line in its `value` field:
//!
//! ```text
//! raw line ──► recording? append verbatim
//!          └─► LogEntry::parse ──(error)──► dropped, debug! only
//!                      │
//!                      ▼
//!              live ring (oldest evicted at capacity)
//!                      │
//!                      ├─► newModule     for each module first seen
//!                      ├─► newComponent  when the component is new
//!                      └─► newLogs       always
//! ```
//!
//! Recording is independent of parsing: a recording captures every raw line,
//! including lines the parser rejects.  The live buffer and the distinct
//! module/component lists are cleared when a new connection starts; an active
//! recording survives reconnects.

use std::sync::Arc;

use inspector_core::{event_types, ClientEvent, Dispatcher, LogEntry, RingBuffer, TypedEvent};
use parking_lot::Mutex;
use tracing::debug;

use super::subscribe_weak;

/// Events published by [`LogStreamObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// `module` appeared for the first time on this connection.
    NewModule {
        entry: LogEntry,
        module: String,
        modules: Vec<String>,
    },
    /// `component` appeared for the first time on this connection.
    NewComponent {
        entry: LogEntry,
        component: String,
        components: Vec<String>,
    },
    /// `entry` was appended; `logs` is the whole live buffer, oldest first.
    NewLogs { entry: LogEntry, logs: Vec<LogEntry> },
}

impl TypedEvent for LogEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::NewModule { .. } => "newModule",
            Self::NewComponent { .. } => "newComponent",
            Self::NewLogs { .. } => "newLogs",
        }
    }
}

/// Raw lines captured between `start_recording` and `stop_recording`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedLog {
    lines: Vec<String>,
}

impl RecordedLog {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The recording as one text blob, lines joined by `\n`.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Filter applied by [`LogStreamObserver::query`].
///
/// An empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    text: Option<String>,
    components: Option<Vec<String>>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep entries whose raw line contains `text`.
    pub fn containing(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
        self
    }

    /// Keep entries logged by one of `components`.
    pub fn components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = Some(components.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if `entry` passes every configured filter.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        let text_ok = self
            .text
            .as_deref()
            .map_or(true, |text| entry.raw.contains(text));
        let component_ok = self
            .components
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|c| *c == entry.component));
        text_ok && component_ok
    }
}

struct LogState {
    ring: RingBuffer<LogEntry>,
    modules: Vec<String>,
    components: Vec<String>,
    recording: Option<Vec<String>>,
}

struct Inner {
    state: Mutex<LogState>,
    events: Dispatcher<LogEvent>,
}

/// Parses, buffers, and republishes the peer's log lines.
pub struct LogStreamObserver {
    inner: Arc<Inner>,
}

impl LogStreamObserver {
    /// Subscribes to `source`, keeping at most `capacity` parsed entries.
    pub fn new(source: &Dispatcher<ClientEvent>, capacity: usize) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(LogState {
                ring: RingBuffer::new(capacity),
                modules: Vec::new(),
                components: Vec::new(),
                recording: None,
            }),
            events: Dispatcher::new(),
        });

        subscribe_weak(source, event_types::LOG, &inner, |inner, event| {
            match event.as_peer().and_then(|m| m.value_str()) {
                Some(line) => inner.on_line(line),
                None => debug!("log message without a string value"),
            }
        });
        subscribe_weak(source, event_types::CONNECTING, &inner, |inner, _| inner.reset());

        Self { inner }
    }

    /// Where `newModule`, `newComponent` and `newLogs` are published.
    pub fn events(&self) -> &Dispatcher<LogEvent> {
        &self.inner.events
    }

    /// The live buffer, oldest first.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.inner.state.lock().ring.to_vec()
    }

    /// Distinct modules in first-seen order.
    pub fn modules(&self) -> Vec<String> {
        self.inner.state.lock().modules.clone()
    }

    /// Distinct components in first-seen order.
    pub fn components(&self) -> Vec<String> {
        self.inner.state.lock().components.clone()
    }

    pub fn capacity(&self) -> usize {
        self.inner.state.lock().ring.capacity()
    }

    /// Live entries matching `query`, oldest first.
    pub fn query(&self, query: &LogQuery) -> Vec<LogEntry> {
        self.inner
            .state
            .lock()
            .ring
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect()
    }

    /// Starts capturing raw lines.  Restarting discards the lines captured so
    /// far.
    pub fn start_recording(&self) {
        self.inner.state.lock().recording = Some(Vec::new());
    }

    /// Stops capturing and hands back what was recorded.
    ///
    /// Returns an empty recording when none was active.
    pub fn stop_recording(&self) -> RecordedLog {
        let lines = self.inner.state.lock().recording.take().unwrap_or_default();
        RecordedLog { lines }
    }

    pub fn is_recording(&self) -> bool {
        self.inner.state.lock().recording.is_some()
    }
}

impl Inner {
    fn on_line(&self, line: &str) {
        let events = {
            let mut state = self.state.lock();
            if let Some(recording) = state.recording.as_mut() {
                recording.push(line.to_string());
            }

            let entry = match LogEntry::parse(line) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("skipping log line: {e}");
                    return;
                }
            };
            state.ring.push(entry.clone());

            let mut events = Vec::new();
            for module in &entry.modules {
                if !state.modules.contains(module) {
                    state.modules.push(module.clone());
                    events.push(LogEvent::NewModule {
                        entry: entry.clone(),
                        module: module.clone(),
                        modules: state.modules.clone(),
                    });
                }
            }
            if !state.components.contains(&entry.component) {
                state.components.push(entry.component.clone());
                events.push(LogEvent::NewComponent {
                    entry: entry.clone(),
                    component: entry.component.clone(),
                    components: state.components.clone(),
                });
            }
            events.push(LogEvent::NewLogs {
                logs: state.ring.to_vec(),
                entry,
            });
            events
        };

        for event in &events {
            self.events.emit(event);
        }
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.ring.clear();
        state.modules.clear();
        state.components.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
