//! Infrastructure layer for the inspector client.
//!
//! Contains the I/O-facing adapters:
//!
//! - **`transport`** – The [`Transport`](transport::Transport) capability
//!   trait, its two implementations (WebSocket and embedding host), and the
//!   [`Connection`](transport::Connection) facade that picks one by URL scheme.
//!
//! - **`storage`** – Reading and writing `config.toml`.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `inspector_core`, but nothing in `application` imports from here; the
//! observers only see the [`CommandSink`](crate::application::CommandSink)
//! trait and a dispatcher.

pub mod storage;
pub mod transport;
