//! Wire protocol between the inspector client and the peer.
//!
//! # Framing
//!
//! - **Peer → client**: exactly one JSON object per WebSocket frame (or per
//!   host message).  The object's `"type"` field is the dispatch key; every
//!   other field is payload whose shape depends on the type.
//! - **Client → peer**: one newline-free text command, sent verbatim, for
//!   example `view_tree` or `flip_on_feature myFeature`.
//!
//! The core does not define the peer's command grammar; it only enforces the
//! framing rules above.

pub mod codec;
pub mod messages;

pub use codec::{decode_frame, decode_value, encode_command, CommandError, DecodeError};
pub use messages::{event_types, ClientEvent, PeerMessage};
