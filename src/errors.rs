//! Domain error types
//!
//! Registration and lookup failures are caller bugs and are surfaced
//! synchronously; persistence failures are propagated so a lost credential
//! write is never silent.

use std::path::PathBuf;
use thiserror::Error;

use crate::llm::LlmError;

/// Malformed command, provider or action set registration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// Palette commands need a label to display and match against
    #[error("Command label must not be empty")]
    EmptyLabel,

    /// Providers are selected by name, so the name cannot be empty
    #[error("Provider name must not be empty")]
    EmptyProviderName,

    /// Another action set already answers to this prefix
    #[error("An action set with prefix '{0}' is already registered")]
    DuplicatePrefix(String),

    /// Action sets are reached by prefix, so the prefix cannot be empty
    #[error("Action set prefix must not be empty")]
    EmptyPrefix,

    /// Two providers would read and write the same stored credential
    #[error("Secret key '{key}' is already used by provider '{holder}'")]
    DuplicateSecretKey { key: String, holder: String },
}

/// Lookup of something that was never registered
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Unknown chat provider: {0}")]
    ProviderNotFound(String),
}

/// The secret store or an on-disk database could not be read or written
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Secret store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
}

/// Errors surfaced by the active session controller
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The provider factory or the live backend failed
    #[error("Chat backend error: {0}")]
    Backend(#[from] LlmError),

    /// A turn was sent while the view shows the credential placeholder
    #[error("No active chat session; configure an API key first")]
    NoActiveSession,
}
