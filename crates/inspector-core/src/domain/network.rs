//! Captured network requests.
//!
//! When network forwarding is enabled the peer reports every HTTP request it
//! completes as a `network` message:
//!
//! ```text
//! { "type": "network",
//!   "request":  { "url": "https://…", "headers": ["Accept", …], "initiator": "TaskAccount" },
//!   "response": { "status": 200, "headers": {"Content-Type": "…"}, "errors": "", "body": "…" } }
//! ```
//!
//! A missing or invalid HTTP status is reported as `-1`.  The request URL is
//! parsed the way a browser parses it (WHATWG rules, so unescaped spaces in a
//! query are accepted) and must be absolute (scheme and host); anything else
//! is rejected by [`NetworkEntry::from_message`] so the observer can skip it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::protocol::messages::PeerMessage;

/// HTTP status the live views treat as success; everything else is an error.
pub const STATUS_OK: i64 = 200;

/// Reasons a `network` message could not be turned into a [`NetworkEntry`].
#[derive(Debug, Error)]
pub enum NetworkParseError {
    #[error("network message has no \"request\" object")]
    MissingRequest,

    #[error("malformed network payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("request url {url:?} is not absolute: {reason}")]
    InvalidUrl { url: String, reason: String },
}

// ── RequestUrl ───────────────────────────────────────────────────────────────

/// An absolute request URL (scheme and host are guaranteed present).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestUrl {
    raw: String,
    url: Url,
}

impl RequestUrl {
    /// Parses and validates an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkParseError::InvalidUrl`] when the text is not a URL,
    /// is relative, or has no host (`mailto:`, `data:` and the like).
    pub fn parse(text: &str) -> Result<Self, NetworkParseError> {
        let invalid = |reason: &str| NetworkParseError::InvalidUrl {
            url: text.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(text).map_err(|e| invalid(&e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            raw: text.to_string(),
            url,
        })
    }

    /// The URL exactly as the peer reported it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Scheme, e.g. `https`.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host name without port.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, if the URL carries one that differs from the scheme's
    /// default.
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// Path component (`/` when empty).
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Query string without the leading `?`, percent-encoded.
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }
}

impl TryFrom<String> for RequestUrl {
    type Error = NetworkParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestUrl> for String {
    fn from(url: RequestUrl) -> Self {
        url.raw
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ── Request / response ───────────────────────────────────────────────────────

/// The request half of a captured exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub url: RequestUrl,
    /// Raw header names sent with the request.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Task or class that issued the request (`"Unknown"` when the peer could
    /// not tell).
    #[serde(default)]
    pub initiator: String,
}

/// The response half of a captured exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkResponse {
    /// HTTP status, `-1` when the peer had no valid status code.
    pub status: i64,
    pub headers: BTreeMap<String, String>,
    /// Transport error description; empty on success.
    pub errors: String,
    pub body: String,
}

impl Default for NetworkResponse {
    fn default() -> Self {
        Self {
            status: -1,
            headers: BTreeMap::new(),
            errors: String::new(),
            body: String::new(),
        }
    }
}

impl NetworkResponse {
    /// Returns `true` for any status other than 200.
    pub fn is_error(&self) -> bool {
        self.status != STATUS_OK
    }
}

// ── Entry ────────────────────────────────────────────────────────────────────

/// One captured request/response pair with its capture id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    /// Monotonic per-connection id, starting at 1.
    pub id: u64,
    pub request: NetworkRequest,
    pub response: NetworkResponse,
}

impl NetworkEntry {
    /// Builds an entry from a `network` peer message.
    ///
    /// A missing `response` object yields [`NetworkResponse::default`].
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkParseError`] if `request` is missing, malformed, or
    /// carries a URL that is not absolute.
    pub fn from_message(id: u64, message: &PeerMessage) -> Result<Self, NetworkParseError> {
        let request = message
            .get("request")
            .filter(|v| v.is_object())
            .cloned()
            .ok_or(NetworkParseError::MissingRequest)?;
        let request: NetworkRequest = serde_json::from_value(request)?;

        let response = match message.get("response") {
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())?,
            _ => NetworkResponse::default(),
        };

        Ok(Self {
            id,
            request,
            response,
        })
    }

    /// Returns `true` when the response status is not 200.
    pub fn is_error(&self) -> bool {
        self.response.is_error()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
