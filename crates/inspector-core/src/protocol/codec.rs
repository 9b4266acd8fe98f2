//! Frame decoding and command encoding.
//!
//! Pure functions with no I/O.  The transports call [`decode_frame`] for every
//! inbound text frame (or [`decode_value`] for host messages that arrive
//! already parsed) and [`encode_command`] before anything goes out.

use serde_json::Value;
use thiserror::Error;

use super::messages::PeerMessage;

/// Errors produced while decoding an inbound frame.
///
/// A decode error affects only the one frame; transports log it and keep the
/// connection open.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame was not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame was JSON but not an object (e.g. an array or a bare string).
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The object had no string `type` field, so it cannot be dispatched.
    #[error("frame has no string \"type\" field")]
    MissingType,
}

/// Errors produced while validating an outbound command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command was empty (or whitespace only).
    #[error("command is empty")]
    Empty,

    /// The command contained a line break; the peer reads one command per line.
    #[error("command contains a line break")]
    MultiLine,
}

/// Decodes one text frame into a [`PeerMessage`].
///
/// # Errors
///
/// Returns [`DecodeError`] if the text is not a JSON object with a string
/// `type` field.
///
/// # Example
///
/// ```rust
/// use inspector_core::decode_frame;
///
/// let msg = decode_frame(r#"{"type":"help","value":"help\tThe help menu\n"}"#).unwrap();
/// assert_eq!(msg.message_type(), "help");
/// ```
pub fn decode_frame(text: &str) -> Result<PeerMessage, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(value)
}

/// Converts an already-parsed JSON value into a [`PeerMessage`].
///
/// # Errors
///
/// Returns [`DecodeError::NotAnObject`] or [`DecodeError::MissingType`].
pub fn decode_value(value: Value) -> Result<PeerMessage, DecodeError> {
    let Value::Object(mut body) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let message_type = match body.remove("type") {
        Some(Value::String(t)) => t,
        _ => return Err(DecodeError::MissingType),
    };

    Ok(PeerMessage::new(message_type, body))
}

/// Validates an outbound command and returns the exact text to send.
///
/// Nothing is trimmed or rewritten: an accepted command goes out byte for
/// byte as given.
///
/// # Errors
///
/// Returns [`CommandError::Empty`] for blank input and
/// [`CommandError::MultiLine`] when the command contains `\n` or `\r`
/// anywhere, including at the end.
pub fn encode_command(command: &str) -> Result<String, CommandError> {
    if command.trim().is_empty() {
        return Err(CommandError::Empty);
    }
    if command.contains(['\n', '\r']) {
        return Err(CommandError::MultiLine);
    }
    Ok(command.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
