//! Inspector client configuration.
//!
//! [`ClientConfig`] is the single source of truth for runtime settings: which
//! peer to attach to, how much history the observers keep, and how long the
//! transports wait before giving up.  It is a plain struct (no global state,
//! no environment reads) so tests can build one inline; the CLI fills it from
//! the config file and then applies its flags on top.
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so an empty or partial
//! `config.toml` still yields a complete config:
//!
//! ```toml
//! default_url = "ws://192.168.1.20:8765"
//! log_capacity = 500
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default socket endpoint of a locally running peer.
pub const DEFAULT_URL: &str = "ws://localhost:8765";

/// Maximum number of URLs kept in [`ClientConfig::history`].
pub const HISTORY_LIMIT: usize = 10;

/// Shortest screenshot polling period; smaller configured values are raised
/// to this.
pub const MIN_SCREEN_REFRESH: Duration = Duration::from_millis(10);

/// All runtime configuration for an inspector session.
///
/// # Example
///
/// ```rust
/// use inspector_client::domain::ClientConfig;
///
/// let cfg = ClientConfig::default();
/// assert_eq!(cfg.default_url, "ws://localhost:8765");
/// assert_eq!(cfg.log_capacity, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// URL used when none is given on the command line.
    #[serde(default = "default_url")]
    pub default_url: String,

    /// Live log buffer size.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Captured network request buffer size.
    #[serde(default = "default_network_capacity")]
    pub network_capacity: usize,

    /// Upper bound for the WebSocket handshake.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound for the embedding host's first message.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Period of the live screenshot poller (at least
    /// [`MIN_SCREEN_REFRESH`]; `0` is raised to it).
    #[serde(default = "default_screen_refresh_ms")]
    pub screen_refresh_ms: u64,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Socket URLs that connected successfully, most recent first.
    #[serde(default)]
    pub history: Vec<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_url() -> String {
    DEFAULT_URL.to_string()
}
fn default_log_capacity() -> usize {
    200
}
fn default_network_capacity() -> usize {
    50
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_handshake_timeout_ms() -> u64 {
    5_000
}
fn default_screen_refresh_ms() -> u64 {
    1_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    /// | Field                 | Default                 |
    /// |-----------------------|-------------------------|
    /// | default_url           | `ws://localhost:8765`   |
    /// | log_capacity          | 200                     |
    /// | network_capacity      | 50                      |
    /// | connect_timeout_ms    | 5000                    |
    /// | handshake_timeout_ms  | 5000                    |
    /// | screen_refresh_ms     | 1000                    |
    /// | log_level             | `info`                  |
    fn default() -> Self {
        Self {
            default_url: default_url(),
            log_capacity: default_log_capacity(),
            network_capacity: default_network_capacity(),
            connect_timeout_ms: default_connect_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            screen_refresh_ms: default_screen_refresh_ms(),
            log_level: default_log_level(),
            history: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn screen_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.screen_refresh_ms).max(MIN_SCREEN_REFRESH)
    }

    /// Records a successfully connected URL in the history.
    ///
    /// Only socket URLs (`ws://`, `wss://`) are remembered; embedded-host URLs
    /// depend on the page that hosts the inspector and are meaningless later.
    /// The URL moves to the front if already present, and the list is capped
    /// at [`HISTORY_LIMIT`].  Returns `true` if the history changed.
    pub fn remember_url(&mut self, url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("ws://") || lower.starts_with("wss://")) {
            return false;
        }
        if self.history.first().map(String::as_str) == Some(url) {
            return false;
        }

        self.history.retain(|known| known != url);
        self.history.insert(0, url.to_string());
        self.history.truncate(HISTORY_LIMIT);
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Arrange / Act
        let cfg = ClientConfig::default();

        // Assert
        assert_eq!(cfg.default_url, "ws://localhost:8765");
        assert_eq!(cfg.log_capacity, 200);
        assert_eq!(cfg.network_capacity, 50);
        assert_eq!(cfg.screen_refresh_interval(), Duration::from_secs(1));
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.history.is_empty());
    }

    #[test]
    fn test_zero_screen_refresh_is_raised_to_minimum() {
        let cfg = ClientConfig {
            screen_refresh_ms: 0,
            ..ClientConfig::default()
        };
        assert_eq!(cfg.screen_refresh_interval(), MIN_SCREEN_REFRESH);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: ClientConfig = toml::from_str("").expect("empty config parses");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        // Arrange
        let text = r#"
default_url = "ws://10.0.0.5:8765"
network_capacity = 100
"#;

        // Act
        let cfg: ClientConfig = toml::from_str(text).expect("partial config parses");

        // Assert
        assert_eq!(cfg.default_url, "ws://10.0.0.5:8765");
        assert_eq!(cfg.network_capacity, 100);
        assert_eq!(cfg.log_capacity, 200);
    }

    #[test]
    fn test_round_trip_with_history() {
        let mut cfg = ClientConfig::default();
        cfg.remember_url("ws://a:1");
        cfg.connect_timeout_ms = 250;

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: ClientConfig = toml::from_str(&text).expect("deserialize");

        assert_eq!(cfg, restored);
        assert_eq!(restored.connect_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_remember_url_only_accepts_socket_urls() {
        let mut cfg = ClientConfig::default();

        assert!(cfg.remember_url("ws://localhost:8765"));
        assert!(cfg.remember_url("WSS://secure:443"));
        assert!(!cfg.remember_url("http://wasm-parent/"));

        assert_eq!(cfg.history, vec!["WSS://secure:443", "ws://localhost:8765"]);
    }

    #[test]
    fn test_remember_url_moves_existing_entry_to_front() {
        // Arrange
        let mut cfg = ClientConfig::default();
        cfg.remember_url("ws://a:1");
        cfg.remember_url("ws://b:1");

        // Act
        let changed = cfg.remember_url("ws://a:1");
        let unchanged = cfg.remember_url("ws://a:1");

        // Assert
        assert!(changed);
        assert!(!unchanged);
        assert_eq!(cfg.history, vec!["ws://a:1", "ws://b:1"]);
    }

    #[test]
    fn test_remember_url_caps_history() {
        let mut cfg = ClientConfig::default();
        for port in 0..(HISTORY_LIMIT + 5) {
            cfg.remember_url(&format!("ws://host:{port}"));
        }

        assert_eq!(cfg.history.len(), HISTORY_LIMIT);
        assert_eq!(cfg.history[0], format!("ws://host:{}", HISTORY_LIMIT + 4));
    }
}
