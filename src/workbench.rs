//! Workbench: wires the palette, the command registry and the chat session
//! controller for one editor view
//!
//! Registered action sets:
//!
//! | prefix   | title                    | contents                             |
//! |----------|--------------------------|--------------------------------------|
//! | `>`      | Show and run commands    | registered commands + extension extras |
//! | `clone:` | Clone git repository     | one pinned `clone {}` entry          |
//! | `@`      | Go to symbol in editor   | symbols pushed by the editor         |

use crate::config::Config;
use crate::errors::{RegistrationError, SessionError};
use crate::extensions::{palette_extras, ExtensionCatalog, InstalledExtensions};
use crate::llm::{builtin_providers, ProviderFactory};
use crate::palette::{
    palette_hook, ActionSet, Command, CommandRegistry, Formattable, Label, Palette,
    SharedCommandRegistry, DEFAULT_PREFIX,
};
use crate::session::ActiveSessionController;
use crate::storage::SecretStore;
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

pub const COMMANDS_TITLE: &str = "Show and run commands";
pub const CLONE_TITLE: &str = "Clone git repository";
pub const CLONE_PREFIX: &str = "clone:";
pub const SYMBOLS_TITLE: &str = "Go to symbol in editor";
pub const SYMBOLS_PREFIX: &str = "@";

pub const NEW_CHAT: &str = "New Chat";
pub const CONFIGURE_API_KEY: &str = "Configure API Key...";
pub const CLEAR_API_KEY: &str = "Clear API Key";

/// Label of the palette command switching to `provider`
pub fn use_provider_label(provider: &str) -> String {
    format!("Chat: Use {}", provider)
}

type SharedSession = Arc<Mutex<ActiveSessionController>>;

/// Palette callback running `action` against the session controller
fn session_action<F>(session: &SharedSession, name: String, action: F) -> Command
where
    F: Fn(&mut ActiveSessionController) -> Result<(), SessionError> + Send + Sync + 'static,
{
    let session = Arc::clone(session);
    Command::new(name.clone(), move |_| {
        let mut controller = session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = action(&mut controller) {
            tracing::error!("'{}' failed: {}", name, err);
        }
    })
}

pub struct Workbench {
    config: Config,
    palette: Palette,
    commands: SharedCommandRegistry,
    symbols: Arc<RwLock<Arc<ActionSet>>>,
    session: SharedSession,
    installed: Arc<RwLock<InstalledExtensions>>,
    catalog: Arc<ExtensionCatalog>,
    clone_requests: Arc<Mutex<Vec<String>>>,
}

impl Workbench {
    /// Open a workbench on the configured data directory
    pub fn open(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = SecretStore::open_in(&data_dir)?;
        let installed = InstalledExtensions::open_in(&data_dir)?;
        let catalog = match &config.extensions.catalog {
            Some(path) => ExtensionCatalog::load(path)?,
            None => ExtensionCatalog::new(),
        };
        Self::new(config, store, installed, catalog)
    }

    pub fn new(
        config: Config,
        store: SecretStore,
        installed: InstalledExtensions,
        catalog: ExtensionCatalog,
    ) -> Result<Self> {
        let providers = builtin_providers(&config.chat)?;
        let controller =
            ActiveSessionController::new(store, providers, &config.chat.default_provider)?;

        let mut workbench = Self {
            config,
            palette: Palette::new(),
            commands: CommandRegistry::new(COMMANDS_TITLE, DEFAULT_PREFIX).shared(),
            symbols: Arc::new(RwLock::new(Arc::new(ActionSet::new(
                SYMBOLS_TITLE,
                SYMBOLS_PREFIX,
                Vec::new(),
            )))),
            session: Arc::new(Mutex::new(controller)),
            installed: Arc::new(RwLock::new(installed)),
            catalog: Arc::new(catalog),
            clone_requests: Arc::new(Mutex::new(Vec::new())),
        };
        workbench.late_setup()?;
        Ok(workbench)
    }

    fn late_setup(&mut self) -> Result<(), RegistrationError> {
        let provider_names: Vec<String> = self
            .lock_session()
            .providers()
            .into_iter()
            .map(str::to_string)
            .collect();

        {
            let mut registry = self
                .commands
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            registry.register_command(session_action(
                &self.session,
                NEW_CHAT.to_string(),
                |c| c.new_chat(),
            ))?;
            registry.register_command(session_action(
                &self.session,
                CONFIGURE_API_KEY.to_string(),
                |c| {
                    c.configure();
                    Ok(())
                },
            ))?;
            registry.register_command(session_action(
                &self.session,
                CLEAR_API_KEY.to_string(),
                |c| c.clear_credential(),
            ))?;
            for name in provider_names {
                registry.register_command(Self::use_provider_command(&self.session, name))?;
            }

            registry.set_extras(palette_extras(
                Arc::clone(&self.catalog),
                Arc::clone(&self.installed),
            ));
        }
        self.palette.register_actionset(palette_hook(&self.commands))?;

        let template =
            Formattable::smart_url("clone {}").with_base(&self.config.palette.clone_base_url);
        let resolver = template.clone();
        let requests = Arc::clone(&self.clone_requests);
        let clone_set = Arc::new(
            ActionSet::new(CLONE_TITLE, CLONE_PREFIX, Vec::new()).with_pinned(vec![Command::new(
                template,
                move |term| {
                    let url = resolver.resolve(term);
                    if url.is_empty() {
                        tracing::warn!("Nothing to clone");
                        return;
                    }
                    tracing::info!("Cloning {}", url);
                    requests
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(url.into_owned());
                },
            )]),
        );
        self.palette
            .register_actionset(Box::new(move || Arc::clone(&clone_set)))?;

        let symbols = Arc::clone(&self.symbols);
        self.palette.register_actionset(Box::new(move || {
            let current = symbols
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(&current)
        }))?;

        Ok(())
    }

    fn use_provider_command(session: &SharedSession, provider: String) -> Command {
        session_action(session, use_provider_label(&provider), move |c| {
            c.set_provider(&provider)
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The `>` command registry
    pub fn commands(&self) -> &SharedCommandRegistry {
        &self.commands
    }

    /// Register a command in the `>` set
    pub fn register_command(
        &self,
        label: impl Into<Label>,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<(), RegistrationError> {
        self.commands
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .register(label, callback)
    }

    /// Add a chat provider and its "Chat: Use ..." command
    pub fn register_provider(
        &self,
        name: &str,
        factory: ProviderFactory,
    ) -> Result<(), RegistrationError> {
        let known = {
            let mut controller = self.lock_session();
            let known = controller.registry().contains(name);
            controller.register_provider(name, factory)?;
            known
        };
        if !known {
            self.commands
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .register_command(Self::use_provider_command(&self.session, name.to_string()))?;
        }
        Ok(())
    }

    /// Replace the `@` set with the editor's current symbols
    pub fn set_symbols(&self, symbols: Vec<Command>) {
        let set = Arc::new(ActionSet::new(SYMBOLS_TITLE, SYMBOLS_PREFIX, symbols));
        *self
            .symbols
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = set;
    }

    /// Shared handle to the session controller
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    pub fn lock_session(&self) -> MutexGuard<'_, ActiveSessionController> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn installed(&self) -> &Arc<RwLock<InstalledExtensions>> {
        &self.installed
    }

    pub fn catalog(&self) -> &ExtensionCatalog {
        &self.catalog
    }

    /// Clone URLs requested from the palette since the last call
    pub fn take_clone_requests(&self) -> Vec<String> {
        std::mem::take(
            &mut *self
                .clone_requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("prefixes", &self.palette.prefixes())
            .finish_non_exhaustive()
    }
}
