//! Chat backends and the provider registry
//!
//! A provider is a named factory that turns a credential into a live
//! [`ChatBackend`]. The session controller picks one provider at a time and
//! asks the [`ProviderRegistry`] to build its backend.

mod echo;
mod error;
mod gemini;
mod registry;
mod types;

pub use echo::EchoBackend;
pub use error::{LlmError, SessionResetError};
pub use gemini::GeminiBackend;
pub use registry::{secret_key_for, ProviderEntry, ProviderFactory, ProviderRegistry};
pub use types::*;

use crate::config::ChatConfig;
use crate::errors::RegistrationError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Display name of the built-in Gemini provider
pub const GEMINI_PROVIDER: &str = "Gemini 1.5 Flash";

/// Secret key the Gemini credential is stored under
pub const GEMINI_SECRET_KEY: &str = "GEMINI_API_KEY";

/// Display name of the offline echo provider
pub const ECHO_PROVIDER: &str = "Echo";

/// Capability interface every chat backend offers
///
/// Backends are built by a [`ProviderFactory`] from a single credential
/// string. The transport behind `send` is the backend's own business.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Start a new conversation in place
    ///
    /// An `Err` tells the controller to discard this backend and build a
    /// fresh one instead.
    fn reset(&mut self) -> Result<(), SessionResetError>;

    /// Attach a file to the conversation context
    fn attach_file(&mut self, path: &Path) -> Result<(), LlmError>;

    /// Send one user turn and return the model's reply
    async fn send(&mut self, turn: &str) -> Result<String, LlmError>;

    /// Conversation so far
    fn history(&self) -> &[Message];

    /// Release backend resources before the session is dropped
    fn teardown(&mut self) {}
}

/// Registry with the providers that ship with the editor
pub fn builtin_providers(config: &ChatConfig) -> Result<ProviderRegistry, RegistrationError> {
    let mut registry = ProviderRegistry::new();

    let gemini = config.gemini.clone();
    let gemini_factory: ProviderFactory = Arc::new(
        move |credential: &str| -> Result<Box<dyn ChatBackend>, LlmError> {
            let backend = GeminiBackend::new(credential)?
                .with_model(&gemini.model)
                .with_max_tokens(gemini.max_tokens);
            Ok(Box::new(backend))
        },
    );
    registry.register_with_secret_key(GEMINI_PROVIDER, GEMINI_SECRET_KEY, gemini_factory)?;

    registry.register(
        ECHO_PROVIDER,
        Arc::new(|credential: &str| -> Result<Box<dyn ChatBackend>, LlmError> {
            Ok(Box::new(EchoBackend::new(credential)?))
        }),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_providers() {
        let registry = builtin_providers(&ChatConfig::default()).unwrap();
        assert_eq!(registry.names(), vec![GEMINI_PROVIDER, ECHO_PROVIDER]);
        assert_eq!(registry.secret_key(GEMINI_PROVIDER), Some(GEMINI_SECRET_KEY));
        assert_eq!(registry.secret_key(ECHO_PROVIDER), Some("ECHO_API_KEY"));
    }

    #[test]
    fn test_builtin_gemini_factory_rejects_empty_key() {
        let registry = builtin_providers(&ChatConfig::default()).unwrap();
        let factory = registry.get(GEMINI_PROVIDER).unwrap();
        assert!(matches!(
            factory("   "),
            Err(LlmError::InvalidCredential(_))
        ));
    }
}
