//! Command palette core
//!
//! The palette UI polls zero-argument providers for the current
//! [`ActionSet`] on every query; each provider is reachable by typing its
//! set's prefix. Matching beyond a substring filter is the UI's concern.

mod action_set;
mod format;
mod registry;

pub use action_set::{ActionSet, Callback, Command, Label, PaletteEntry};
pub use format::{looks_like_url, Formattable, DEFAULT_CLONE_BASE};
pub use registry::{palette_hook, CommandRegistry, ExtrasSource, SharedCommandRegistry};

use crate::errors::RegistrationError;
use std::sync::Arc;

/// Lazily yields an action set; never a value frozen at registration time
pub type ActionSetProvider = Box<dyn Fn() -> Arc<ActionSet> + Send + Sync>;

/// Prefix of the set used when a query matches no other prefix
pub const DEFAULT_PREFIX: &str = ">";

/// Result of looking up a query
#[derive(Debug, Clone)]
pub struct Resolved {
    pub set: Arc<ActionSet>,
    /// Query text after the prefix, trimmed
    pub term: String,
}

impl Resolved {
    pub fn entries(&self) -> Vec<PaletteEntry> {
        self.set.search(&self.term)
    }
}

/// Registered action set providers, keyed by prefix
#[derive(Default)]
pub struct Palette {
    providers: Vec<(String, ActionSetProvider)>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider; its prefix is read once, now
    ///
    /// An empty prefix, or one already registered, would leave the set
    /// unreachable and is rejected.
    pub fn register_actionset(
        &mut self,
        provider: ActionSetProvider,
    ) -> Result<(), RegistrationError> {
        let set = provider();
        let prefix = set.prefix().to_string();
        if prefix.is_empty() {
            return Err(RegistrationError::EmptyPrefix);
        }
        if self.providers.iter().any(|(p, _)| *p == prefix) {
            return Err(RegistrationError::DuplicatePrefix(prefix));
        }
        tracing::debug!("Registered action set '{}' ({})", set.title(), prefix);
        self.providers.push((prefix, provider));
        Ok(())
    }

    /// Registered prefixes in registration order
    pub fn prefixes(&self) -> Vec<&str> {
        self.providers.iter().map(|(p, _)| p.as_str()).collect()
    }

    /// Current set registered under `prefix`
    pub fn actionset(&self, prefix: &str) -> Option<Arc<ActionSet>> {
        self.providers
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, provider)| provider())
    }

    /// Pick the set whose prefix is the longest prefix of `query`
    ///
    /// Without a match the whole query is searched in the default set.
    pub fn resolve(&self, query: &str) -> Option<Resolved> {
        let matched = self
            .providers
            .iter()
            .filter(|(p, _)| query.starts_with(p.as_str()))
            .max_by_key(|(p, _)| p.len());

        match matched {
            Some((prefix, provider)) => Some(Resolved {
                set: provider(),
                term: query[prefix.len()..].trim().to_string(),
            }),
            None => self.actionset(DEFAULT_PREFIX).map(|set| Resolved {
                set,
                term: query.trim().to_string(),
            }),
        }
    }

    /// Entries for a query, pinned first
    pub fn search(&self, query: &str) -> Vec<PaletteEntry> {
        self.resolve(query)
            .map(|resolved| resolved.entries())
            .unwrap_or_default()
    }

    /// Run the `index`th entry for `query`; returns false when there is none
    pub fn run(&self, query: &str, index: usize) -> bool {
        let Some(resolved) = self.resolve(query) else {
            return false;
        };
        match resolved.entries().get(index) {
            Some(entry) => {
                tracing::debug!("Running palette command '{}'", entry.label);
                entry.run(&resolved.term);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn fixed(set: ActionSet) -> ActionSetProvider {
        let set = Arc::new(set);
        Box::new(move || Arc::clone(&set))
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let mut palette = Palette::new();
        palette
            .register_actionset(fixed(ActionSet::new("Symbols", "@", vec![])))
            .unwrap();
        let err = palette
            .register_actionset(fixed(ActionSet::new("Other", "@", vec![])))
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicatePrefix("@".to_string()));
        assert_eq!(palette.prefixes(), vec!["@"]);
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let mut palette = Palette::new();
        let err = palette
            .register_actionset(fixed(ActionSet::new("Everything", "", vec![])))
            .unwrap_err();
        assert_eq!(err, RegistrationError::EmptyPrefix);
        assert!(palette.prefixes().is_empty());
        assert!(palette.resolve("anything").is_none());
    }

    #[test]
    fn test_resolve_longest_prefix() {
        let mut palette = Palette::new();
        palette
            .register_actionset(fixed(ActionSet::new("C", "c", vec![])))
            .unwrap();
        palette
            .register_actionset(fixed(ActionSet::new("Clone", "clone:", vec![])))
            .unwrap();

        let resolved = palette.resolve("clone: octocat/x").unwrap();
        assert_eq!(resolved.set.prefix(), "clone:");
        assert_eq!(resolved.term, "octocat/x");
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let mut palette = Palette::new();
        assert!(palette.resolve("anything").is_none());

        palette
            .register_actionset(fixed(ActionSet::new(
                "Commands",
                DEFAULT_PREFIX,
                vec![Command::new("Open Settings", |_| {})],
            )))
            .unwrap();

        let resolved = palette.resolve("settings").unwrap();
        assert_eq!(resolved.set.prefix(), DEFAULT_PREFIX);
        assert_eq!(resolved.term, "settings");
        assert_eq!(palette.search("settings").len(), 1);
    }

    #[test]
    fn test_run_invokes_pinned_with_term() {
        let cloned = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&cloned);
        let template = Formattable::smart_url("clone {}");
        let resolver = template.clone();
        let set = ActionSet::new("Clone git repository", "clone:", vec![]).with_pinned(vec![
            Command::new(template, move |term| {
                *sink.lock().unwrap() = Some(resolver.resolve(term).into_owned());
            }),
        ]);

        let mut palette = Palette::new();
        palette.register_actionset(fixed(set)).unwrap();

        assert!(palette.run("clone:octocat/Spoon-Knife", 0));
        assert_eq!(
            cloned.lock().unwrap().as_deref(),
            Some("https://github.com/octocat/Spoon-Knife")
        );
        assert!(!palette.run("clone:x", 1));
    }
}
