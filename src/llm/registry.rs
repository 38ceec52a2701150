//! Provider registry: display name -> backend factory

use super::{ChatBackend, LlmError};
use crate::errors::{LookupError, RegistrationError};
use std::sync::Arc;

/// Builds a chat backend from a credential
///
/// Calling a factory has no effect on the registry that holds it.
pub type ProviderFactory =
    Arc<dyn Fn(&str) -> Result<Box<dyn ChatBackend>, LlmError> + Send + Sync>;

/// A registered provider
#[derive(Clone)]
pub struct ProviderEntry {
    /// Key the provider's credential is stored under in the secret store
    pub secret_key: String,
    pub factory: ProviderFactory,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("secret_key", &self.secret_key)
            .finish_non_exhaustive()
    }
}

/// Derive the secret-store key for a provider name
///
/// `"Gemini 1.5 Flash"` becomes `"GEMINI_1_5_FLASH_API_KEY"`. Separators
/// collapse, so distinct names can derive the same key; the registry rejects
/// such a pair.
pub fn secret_key_for(provider: &str) -> String {
    let mut key = String::with_capacity(provider.len() + 8);
    let mut last_was_sep = true;
    for c in provider.chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_uppercase());
            last_was_sep = false;
        } else if !last_was_sep {
            key.push('_');
            last_was_sep = true;
        }
    }
    if !key.is_empty() && !key.ends_with('_') {
        key.push('_');
    }
    key.push_str("API_KEY");
    key
}

/// Ordered mapping from provider display name to factory
///
/// Registration order is kept for the provider dropdown. Registering a name
/// again replaces its factory in place.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    entries: Vec<(String, ProviderEntry)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, storing its credential under a derived key
    pub fn register(
        &mut self,
        name: &str,
        factory: ProviderFactory,
    ) -> Result<(), RegistrationError> {
        let key = secret_key_for(name);
        self.register_with_secret_key(name, &key, factory)
    }

    /// Register a provider with an explicit secret-store key
    ///
    /// Each provider owns its key: a key already held by another provider is
    /// rejected, since the two would read each other's credential.
    pub fn register_with_secret_key(
        &mut self,
        name: &str,
        secret_key: &str,
        factory: ProviderFactory,
    ) -> Result<(), RegistrationError> {
        if let Some((holder, _)) = self
            .entries
            .iter()
            .find(|(n, entry)| n != name && entry.secret_key == secret_key)
        {
            return Err(RegistrationError::DuplicateSecretKey {
                key: secret_key.to_string(),
                holder: holder.clone(),
            });
        }

        let entry = ProviderEntry {
            secret_key: secret_key.to_string(),
            factory,
        };

        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => {
                tracing::debug!("Replacing chat provider '{}'", name);
                *existing = entry;
            }
            None => {
                tracing::debug!("Registered chat provider '{}'", name);
                self.entries.push((name.to_string(), entry));
            }
        }
        Ok(())
    }

    /// Like [`register`](Self::register) but rejects an empty name
    pub fn try_register(
        &mut self,
        name: &str,
        factory: ProviderFactory,
    ) -> Result<(), RegistrationError> {
        if name.trim().is_empty() {
            return Err(RegistrationError::EmptyProviderName);
        }
        self.register(name, factory)
    }

    /// Get the factory for a provider
    pub fn get(&self, name: &str) -> Result<ProviderFactory, LookupError> {
        self.entry(name)
            .map(|entry| Arc::clone(&entry.factory))
            .ok_or_else(|| LookupError::ProviderNotFound(name.to_string()))
    }

    pub fn entry(&self, name: &str) -> Option<&ProviderEntry> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    pub fn secret_key(&self, name: &str) -> Option<&str> {
        self.entry(name).map(|entry| entry.secret_key.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Provider names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::EchoBackend;

    fn echo_factory() -> ProviderFactory {
        Arc::new(|credential: &str| -> Result<Box<dyn ChatBackend>, LlmError> {
            Ok(Box::new(EchoBackend::new(credential)?))
        })
    }

    #[test]
    fn test_secret_key_for() {
        assert_eq!(secret_key_for("Gemini 1.5 Flash"), "GEMINI_1_5_FLASH_API_KEY");
        assert_eq!(secret_key_for("openai"), "OPENAI_API_KEY");
        assert_eq!(secret_key_for("  Claude--3 "), "CLAUDE_3_API_KEY");
        assert_eq!(secret_key_for("Modèle"), "MODÈLE_API_KEY");
    }

    #[test]
    fn test_colliding_secret_keys_are_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register("GPT-4o", echo_factory()).unwrap();

        assert_eq!(
            registry.register("GPT 4o", echo_factory()),
            Err(RegistrationError::DuplicateSecretKey {
                key: "GPT_4O_API_KEY".to_string(),
                holder: "GPT-4o".to_string(),
            })
        );
        assert_eq!(
            registry.register_with_secret_key("Other", "GPT_4O_API_KEY", echo_factory()),
            Err(RegistrationError::DuplicateSecretKey {
                key: "GPT_4O_API_KEY".to_string(),
                holder: "GPT-4o".to_string(),
            })
        );
        assert_eq!(registry.names(), vec!["GPT-4o"]);

        // Re-registering the holder itself is a replacement, not a collision
        registry.register("GPT-4o", echo_factory()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.get("missing").err().unwrap();
        assert_eq!(err, LookupError::ProviderNotFound("missing".to_string()));
    }

    #[test]
    fn test_register_overwrites_in_place() {
        let mut registry = ProviderRegistry::new();
        registry.register("A", echo_factory()).unwrap();
        registry.register("B", echo_factory()).unwrap();
        registry
            .register_with_secret_key("A", "A_TOKEN", echo_factory())
            .unwrap();

        assert_eq!(registry.names(), vec!["A", "B"]);
        assert_eq!(registry.secret_key("A"), Some("A_TOKEN"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_factory_builds_backend() {
        let mut registry = ProviderRegistry::new();
        registry.register("Echo", echo_factory()).unwrap();

        let factory = registry.get("Echo").unwrap();
        let backend = factory("secret").unwrap();
        assert_eq!(backend.name(), "echo");
        // Building a backend leaves the registry untouched
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_try_register_rejects_empty_name() {
        let mut registry = ProviderRegistry::new();
        assert_eq!(
            registry.try_register(" ", echo_factory()),
            Err(RegistrationError::EmptyProviderName)
        );
        assert!(registry.is_empty());
    }
}
