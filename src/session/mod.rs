//! Active chat session controller
//!
//! Decides which single chat session is live for a view:
//!
//! ```text
//! NoCredential --(no stored key)--> Placeholder --activate(key)--> Active
//!                                        ^                          |
//!                                        +-- clear / switch to a ---+
//!                                            provider without a key
//! ```
//!
//! Every provider keeps its own credential in the [`SecretStore`]. Before a
//! new session is built the previous one is torn down, so a view never has
//! two live backends.

use crate::errors::{LookupError, RegistrationError, SessionError};
use crate::llm::{ChatBackend, ProviderFactory, ProviderRegistry};
use crate::storage::SecretStore;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// One live, credentialed backend instance
pub struct Session {
    id: Uuid,
    provider: String,
    credential: String,
    created_at: DateTime<Utc>,
    backend: Box<dyn ChatBackend>,
}

impl Session {
    fn new(provider: &str, credential: &str, backend: Box<dyn ChatBackend>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider: provider.to_string(),
            credential: credential.to_string(),
            created_at: Utc::now(),
            backend,
        }
    }

    /// Identity of this session; a rebuilt session gets a new id
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("backend", &self.backend.name())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// What the chat view currently shows
#[derive(Debug)]
pub enum SessionState {
    /// Nothing decided yet; only seen during construction
    NoCredential,
    /// Credential prompt, optionally prefilled with the known key
    Placeholder { prefill: Option<String> },
    Active(Session),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, SessionState::Placeholder { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::NoCredential => "no-credential",
            SessionState::Placeholder { .. } => "placeholder",
            SessionState::Active(_) => "active",
        }
    }
}

/// Owns the secret store, the provider registry and the live session of one view
pub struct ActiveSessionController {
    store: SecretStore,
    providers: ProviderRegistry,
    current_provider: String,
    /// Last credential used with the current provider
    credential: Option<String>,
    state: SessionState,
}

impl ActiveSessionController {
    /// Open the controller on `default_provider`
    ///
    /// Activates a session right away when a credential for the provider is
    /// stored, otherwise shows the placeholder.
    pub fn new(
        store: SecretStore,
        providers: ProviderRegistry,
        default_provider: &str,
    ) -> Result<Self, SessionError> {
        if !providers.contains(default_provider) {
            return Err(LookupError::ProviderNotFound(default_provider.to_string()).into());
        }

        let mut controller = Self {
            store,
            providers,
            current_provider: default_provider.to_string(),
            credential: None,
            state: SessionState::NoCredential,
        };

        match controller.stored_credential(default_provider)? {
            Some(credential) => {
                let factory = controller.providers.get(default_provider)?;
                if let Err(err) = controller.start_session(factory, &credential) {
                    // A stored key the backend rejects should not keep the view from opening
                    tracing::warn!(
                        "Could not start {} session from stored credential: {}",
                        default_provider,
                        err
                    );
                    if !matches!(err, SessionError::Backend(_)) {
                        return Err(err);
                    }
                }
            }
            None => controller.state = SessionState::Placeholder { prefill: None },
        }

        Ok(controller)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn current_provider(&self) -> &str {
        &self.current_provider
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Provider names for the provider dropdown
    pub fn providers(&self) -> Vec<&str> {
        self.providers.names()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    /// Add a provider (or replace one) after the view has opened
    pub fn register_provider(
        &mut self,
        name: &str,
        factory: ProviderFactory,
    ) -> Result<(), RegistrationError> {
        self.providers.try_register(name, factory)
    }

    /// Secret-store key holding `provider`'s credential
    pub fn secret_key(&self, provider: &str) -> Result<String, LookupError> {
        self.providers
            .secret_key(provider)
            .map(str::to_string)
            .ok_or_else(|| LookupError::ProviderNotFound(provider.to_string()))
    }

    /// Credential stored for `provider`, if any
    pub fn stored_credential(&self, provider: &str) -> Result<Option<String>, SessionError> {
        let key = self.secret_key(provider)?;
        Ok(self.store.get(&key)?.filter(|value| !value.is_empty()))
    }

    /// Start a session for the current provider with `credential`
    ///
    /// The credential is persisted first. The previous session is torn down
    /// before the new backend is built.
    pub fn activate(&mut self, credential: &str) -> Result<(), SessionError> {
        let credential = credential.trim();
        if credential.is_empty() {
            self.show_placeholder(None);
            return Ok(());
        }

        let key = self.secret_key(&self.current_provider)?;
        let factory = self.providers.get(&self.current_provider)?;

        self.store.put(&key, credential)?;
        self.start_session(factory, credential)
    }

    /// Replace the live session with one built from an already stored credential
    fn start_session(
        &mut self,
        factory: ProviderFactory,
        credential: &str,
    ) -> Result<(), SessionError> {
        self.credential = Some(credential.to_string());

        self.teardown();

        match factory(credential) {
            Ok(backend) => {
                let session = Session::new(&self.current_provider, credential, backend);
                tracing::info!(
                    "Activated {} chat session {}",
                    self.current_provider,
                    session.id
                );
                self.state = SessionState::Active(session);
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Placeholder {
                    prefill: Some(credential.to_string()),
                };
                Err(err.into())
            }
        }
    }

    /// Switch the view to another provider
    ///
    /// Selecting the current provider does nothing. Otherwise the new
    /// provider's stored credential is used, or the placeholder is shown.
    pub fn set_provider(&mut self, name: &str) -> Result<(), SessionError> {
        if name == self.current_provider {
            return Ok(());
        }

        let stored = self.stored_credential(name)?;
        tracing::info!("Switching chat provider {} -> {}", self.current_provider, name);
        self.current_provider = name.to_string();

        match stored {
            Some(credential) => {
                let factory = self.providers.get(name)?;
                self.start_session(factory, &credential)
            }
            None => {
                self.credential = None;
                self.show_placeholder(None);
                Ok(())
            }
        }
    }

    /// Forget the current provider's credential and show the placeholder
    pub fn clear_credential(&mut self) -> Result<(), SessionError> {
        let key = self.secret_key(&self.current_provider)?;
        self.store.delete(&key)?;
        self.credential = None;
        self.show_placeholder(None);
        Ok(())
    }

    /// Show the credential prompt, prefilled with the known credential
    pub fn configure(&mut self) {
        let prefill = self.credential.clone();
        self.show_placeholder(prefill);
    }

    /// Start a new conversation
    ///
    /// Resets the live backend in place; if the reset fails a brand-new
    /// session is built instead.
    pub fn new_chat(&mut self) -> Result<(), SessionError> {
        if let SessionState::Active(session) = &mut self.state {
            match session.backend.reset() {
                Ok(()) => {
                    tracing::debug!("Reset chat session {}", session.id);
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!("{}; starting a fresh session", err);
                }
            }
        }

        match self.credential.clone() {
            Some(credential) => self.activate(&credential),
            None => {
                self.show_placeholder(None);
                Ok(())
            }
        }
    }

    /// Attach files to the live conversation; ignored without a session
    pub fn attach_file<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), SessionError> {
        if let SessionState::Active(session) = &mut self.state {
            for path in paths {
                session.backend.attach_file(path.as_ref())?;
            }
        }
        Ok(())
    }

    /// Send one turn to the live backend
    pub async fn send(&mut self, turn: &str) -> Result<String, SessionError> {
        match &mut self.state {
            SessionState::Active(session) => Ok(session.backend.send(turn).await?),
            _ => Err(SessionError::NoActiveSession),
        }
    }

    fn show_placeholder(&mut self, prefill: Option<String>) {
        self.teardown();
        self.state = SessionState::Placeholder { prefill };
    }

    /// Tear down and drop the active session, if any
    fn teardown(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::NoCredential);
        match previous {
            SessionState::Active(mut session) => {
                session.backend.teardown();
                tracing::info!(
                    "Tore down {} chat session {}",
                    session.provider,
                    session.id
                );
            }
            other => self.state = other,
        }
    }
}

impl fmt::Debug for ActiveSessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSessionController")
            .field("current_provider", &self.current_provider)
            .field("state", &self.state.name())
            .finish_non_exhaustive()
    }
}
