//! Commands and action sets
//!
//! An [`ActionSet`] is an immutable, prefixed group of palette commands.
//! Refreshing a set means building a new value and swapping the reference.

use super::Formattable;
use std::fmt;
use std::sync::Arc;

/// Palette callback, invoked with the term typed after the prefix
pub type Callback = Arc<dyn Fn(&str) + Send + Sync>;

/// What a palette entry shows and is matched against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Text(String),
    Template(Formattable),
}

impl Label {
    /// Raw label: the text, or the unfilled template
    pub fn as_str(&self) -> &str {
        match self {
            Label::Text(text) => text,
            Label::Template(template) => template.template(),
        }
    }

    /// Label as displayed for the current term
    pub fn render(&self, term: &str) -> String {
        match self {
            Label::Text(text) => text.clone(),
            Label::Template(template) => template.format(term),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Label::Text(text.to_string())
    }
}

impl From<String> for Label {
    fn from(text: String) -> Self {
        Label::Text(text)
    }
}

impl From<Formattable> for Label {
    fn from(template: Formattable) -> Self {
        Label::Template(template)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (label, callback) pair invokable from the palette
#[derive(Clone)]
pub struct Command {
    label: Label,
    callback: Callback,
}

impl Command {
    pub fn new(label: impl Into<Label>, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }

    /// Build from an already shared callback
    pub fn from_callback(label: impl Into<Label>, callback: Callback) -> Self {
        Self {
            label: label.into(),
            callback,
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn invoke(&self, term: &str) {
        (self.callback)(term)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Commands are compared by label; callbacks have no identity worth comparing
impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

/// One line of palette output
#[derive(Debug, Clone)]
pub struct PaletteEntry {
    /// Label rendered for the current term
    pub label: String,
    pub pinned: bool,
    pub command: Command,
}

impl PaletteEntry {
    pub fn run(&self, term: &str) {
        self.command.invoke(term);
    }
}

/// A named, prefixed, immutable group of commands
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSet {
    title: String,
    prefix: String,
    items: Vec<Command>,
    pinned: Vec<Command>,
}

impl ActionSet {
    pub fn new(title: impl Into<String>, prefix: impl Into<String>, items: Vec<Command>) -> Self {
        Self {
            title: title.into(),
            prefix: prefix.into(),
            items,
            pinned: Vec::new(),
        }
    }

    /// Set the entries shown ahead of every match
    pub fn with_pinned(mut self, pinned: Vec<Command>) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn items(&self) -> &[Command] {
        &self.items
    }

    pub fn pinned(&self) -> &[Command] {
        &self.pinned
    }

    /// Number of entries, pinned included
    pub fn len(&self) -> usize {
        self.pinned.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pinned commands followed by items
    pub fn entries(&self) -> impl Iterator<Item = &Command> {
        self.pinned.iter().chain(self.items.iter())
    }

    /// Entries for a term: all pinned commands, then items whose label
    /// contains the term (case-insensitive), in registration order
    ///
    /// Scoring is left to the palette's matcher; whatever it does, pinned
    /// entries stay on top.
    pub fn search(&self, term: &str) -> Vec<PaletteEntry> {
        let needle = term.to_lowercase();

        let pinned = self.pinned.iter().map(|command| PaletteEntry {
            label: command.label().render(term),
            pinned: true,
            command: command.clone(),
        });

        let items = self
            .items
            .iter()
            .filter(|command| {
                needle.is_empty() || command.label().as_str().to_lowercase().contains(&needle)
            })
            .map(|command| PaletteEntry {
                label: command.label().render(term),
                pinned: false,
                command: command.clone(),
            });

        pinned.chain(items).collect()
    }
}
