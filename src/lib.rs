//! crumb: editor core for a command palette and pluggable chat
//!
//! This library provides:
//! - Prefixed action sets and a command registry feeding the palette
//! - Label templates with smart URL expansion for `clone:` entries
//! - Chat providers (Gemini, offline echo) behind a single session controller
//! - A SQLite secret store for per-provider credentials
//! - An extension catalog and installed-extension database

pub mod cli;
pub mod config;
pub mod errors;
pub mod extensions;
pub mod llm;
pub mod palette;
pub mod session;
pub mod storage;
pub mod workbench;

pub use config::Config;
pub use errors::{LookupError, PersistenceError, RegistrationError, SessionError};
pub use palette::{ActionSet, Command, CommandRegistry, Formattable, Palette};
pub use session::{ActiveSessionController, Session, SessionState};
pub use storage::SecretStore;
pub use workbench::Workbench;
