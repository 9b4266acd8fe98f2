//! Domain layer: client-side settings.
//!
//! The models for peer state live in `inspector-core`; this layer only adds
//! the configuration the transports and observers are constructed from.
//! Reading and writing the config file is an infrastructure concern (see
//! `infrastructure::storage`).

pub mod config;

pub use config::ClientConfig;
