//! Persistent storage: the TOML config file.

pub mod config;

pub use config::{config_file_path, load_config, load_config_from, save_config, save_config_to, ConfigError};
