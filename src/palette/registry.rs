//! Command registry
//!
//! Holds the growing list of palette commands and the [`ActionSet`] compiled
//! from it. Every registration rebuilds the set before returning, so a
//! consumer holding the palette hook never sees a stale value.

use super::{ActionSet, ActionSetProvider, Command, Label};
use crate::errors::RegistrationError;
use std::sync::{Arc, RwLock};

/// Late-bound commands merged in each time the set is read
pub type ExtrasSource = Box<dyn Fn() -> Vec<Command> + Send + Sync>;

/// Registry shared between the code that registers commands and the palette
pub type SharedCommandRegistry = Arc<RwLock<CommandRegistry>>;

pub struct CommandRegistry {
    title: String,
    prefix: String,
    commands: Vec<Command>,
    compiled: Arc<ActionSet>,
    extras: Option<ExtrasSource>,
}

impl CommandRegistry {
    pub fn new(title: impl Into<String>, prefix: impl Into<String>) -> Self {
        let title = title.into();
        let prefix = prefix.into();
        let compiled = Arc::new(ActionSet::new(title.clone(), prefix.clone(), Vec::new()));
        Self {
            title,
            prefix,
            commands: Vec::new(),
            compiled,
            extras: None,
        }
    }

    /// Wrap the registry for sharing with the palette
    pub fn shared(self) -> SharedCommandRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Append a command and recompile the action set
    pub fn register(
        &mut self,
        label: impl Into<Label>,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<(), RegistrationError> {
        self.register_command(Command::new(label, callback))
    }

    pub fn register_command(&mut self, command: Command) -> Result<(), RegistrationError> {
        if command.label().is_empty() {
            return Err(RegistrationError::EmptyLabel);
        }
        self.commands.push(command);
        self.recompile();
        Ok(())
    }

    fn recompile(&mut self) {
        self.compiled = Arc::new(self.compile(Vec::new()));
        tracing::debug!(
            "Recompiled '{}' action set with {} commands",
            self.title,
            self.commands.len()
        );
    }

    fn compile(&self, extra: Vec<Command>) -> ActionSet {
        let mut items = Vec::with_capacity(self.commands.len() + extra.len());
        items.extend(self.commands.iter().cloned());
        items.extend(extra);
        ActionSet::new(self.title.clone(), self.prefix.clone(), items)
    }

    /// Current action set
    ///
    /// With an extras source attached the extras are fetched again on every
    /// call, since what they enumerate may have changed.
    pub fn snapshot(&self) -> Arc<ActionSet> {
        match &self.extras {
            Some(source) => Arc::new(self.compile(source())),
            None => Arc::clone(&self.compiled),
        }
    }

    /// Compile the registered commands together with `extra`
    ///
    /// The registered sequence itself is left untouched.
    pub fn bulk_import(&self, extra: Vec<Command>) -> Arc<ActionSet> {
        Arc::new(self.compile(extra))
    }

    /// Attach a source of late-bound commands
    pub fn set_extras(&mut self, source: impl Fn() -> Vec<Command> + Send + Sync + 'static) {
        self.extras = Some(Box::new(source));
    }

    pub fn clear_extras(&mut self) {
        self.extras = None;
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of registered commands, extras excluded
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.label().as_str()).collect()
    }
}

/// Zero-argument provider the palette polls for the registry's current set
pub fn palette_hook(registry: &SharedCommandRegistry) -> ActionSetProvider {
    let registry = Arc::clone(registry);
    Box::new(move || {
        let guard = registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.snapshot()
    })
}
