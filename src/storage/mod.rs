//! Persistent storage for crumb
//!
//! Per-user data directory layout:
//!
//! ~/.local/share/crumb/              # Config::data_dir()
//! ├── secrets.db                     # Provider credentials (SecretStore)
//! └── installed.toml                 # Installed extensions

pub mod secrets;

pub use secrets::{SecretStore, SECRETS_DB};
