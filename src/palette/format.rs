//! Label templating for palette entries
//!
//! A [`Formattable`] is a template with one `{}` placeholder that is filled
//! with whatever the user typed after the action set prefix. The smart-URL
//! mode treats the typed value as a path below a base URL unless it already
//! is a full `http(s)://` URL.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Base prepended by [`Formattable::smart_url`] templates
pub const DEFAULT_CLONE_BASE: &str = "https://github.com/";

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("URL pattern is valid"));

/// Returns true when `value` already starts with an `http://` or `https://` scheme
pub fn looks_like_url(value: &str) -> bool {
    URL.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Verbatim,
    SmartUrl { base: String },
}

/// A label template filled with the user's term at display time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formattable {
    template: String,
    mode: Mode,
}

impl Formattable {
    /// Template whose placeholder receives the term unchanged
    pub fn plain(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            mode: Mode::Verbatim,
        }
    }

    /// Template whose placeholder receives a URL below [`DEFAULT_CLONE_BASE`]
    ///
    /// `"octocat/Hello-World"` becomes `"https://github.com/octocat/Hello-World"`,
    /// full URLs and the empty term are inserted unchanged.
    pub fn smart_url(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            mode: Mode::SmartUrl {
                base: DEFAULT_CLONE_BASE.to_string(),
            },
        }
    }

    /// Replace the base URL of a smart-URL template
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.mode = Mode::SmartUrl { base: base.into() };
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The value that ends up in the placeholder for `term`
    pub fn resolve<'a>(&self, term: &'a str) -> Cow<'a, str> {
        match &self.mode {
            Mode::SmartUrl { base } if !term.is_empty() && !looks_like_url(term) => {
                Cow::Owned(format!("{}{}", base, term))
            }
            _ => Cow::Borrowed(term),
        }
    }

    /// Fill the template's placeholder with `term`
    pub fn format(&self, term: &str) -> String {
        self.template.replacen("{}", &self.resolve(term), 1)
    }
}
