//! Extension catalog and installed-extension database
//!
//! Both files share one TOML shape, a table per extension:
//!
//! ```toml
//! [markdown-preview]
//! author = "octocat"
//! description = "Live preview for Markdown buffers"
//! url = "https://github.com/octocat/markdown-preview"
//! ```
//!
//! Older catalogs list each extension as an array instead,
//! `name = [file, author, description, url]`, trailing items optional.
//! Both shapes are read; entries are always written as tables.
//!
//! Installing only records the entry; loading extension code is the host's job.

use crate::errors::PersistenceError;
use crate::palette::Command;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// File name of the installed-extension database inside the data directory
pub const INSTALLED_TOML: &str = "installed.toml";

/// Label prefix of the palette entries offering an install
pub const INSTALL_LABEL: &str = "Install extension: ";

/// Metadata of one extension
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "CatalogEntry")]
pub struct ExtensionInfo {
    /// Entry file inside the extension, when the catalog names one
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
    pub author: String,
    pub description: String,
    pub url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogEntry {
    List(Vec<String>),
    Table(TableEntry),
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct TableEntry {
    file: String,
    author: String,
    description: String,
    url: String,
}

impl From<CatalogEntry> for ExtensionInfo {
    fn from(entry: CatalogEntry) -> Self {
        match entry {
            CatalogEntry::Table(table) => Self {
                file: table.file,
                author: table.author,
                description: table.description,
                url: table.url,
            },
            CatalogEntry::List(items) => {
                let mut items = items.into_iter();
                Self {
                    file: items.next().unwrap_or_default(),
                    author: items.next().unwrap_or_default(),
                    description: items.next().unwrap_or_default(),
                    url: items.next().unwrap_or_default(),
                }
            }
        }
    }
}

fn parse_table(
    path: &Path,
    content: &str,
) -> Result<BTreeMap<String, ExtensionInfo>, PersistenceError> {
    toml::from_str(content).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_table(path: &Path) -> Result<BTreeMap<String, ExtensionInfo>, PersistenceError> {
    let content = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(path, &content)
}

/// Extensions available for installation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionCatalog {
    entries: BTreeMap<String, ExtensionInfo>,
}

impl ExtensionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let entries = read_table(path.as_ref())?;
        tracing::debug!(
            "Loaded {} catalog extensions from {}",
            entries.len(),
            path.as_ref().display()
        );
        Ok(Self { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, ExtensionInfo)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ExtensionInfo> {
        self.entries.get(name)
    }

    /// All extensions, sorted by name
    pub fn list_all(&self) -> impl Iterator<Item = (&str, &ExtensionInfo)> {
        self.entries.iter().map(|(name, info)| (name.as_str(), info))
    }

    /// Installed extensions with their catalog metadata when the catalog knows them
    pub fn list_installed<'a>(
        &'a self,
        installed: &'a InstalledExtensions,
    ) -> Vec<(&'a str, Option<&'a ExtensionInfo>)> {
        installed
            .names()
            .into_iter()
            .map(|name| (name, self.entries.get(name)))
            .collect()
    }

    /// Extensions published by `user`
    pub fn list_by_user<'a>(
        &'a self,
        user: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a ExtensionInfo)> {
        self.list_all().filter(move |(_, info)| info.author == user)
    }

    /// Extensions whose name contains `search`, ignoring case
    pub fn filter<'a>(
        &'a self,
        search: &str,
    ) -> impl Iterator<Item = (&'a str, &'a ExtensionInfo)> {
        let needle = search.to_lowercase();
        self.list_all()
            .filter(move |(name, _)| name.to_lowercase().contains(&needle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Installed-extension database backed by `installed.toml`
#[derive(Debug)]
pub struct InstalledExtensions {
    path: PathBuf,
    entries: BTreeMap<String, ExtensionInfo>,
}

impl InstalledExtensions {
    /// Open the database at `path`, creating an empty file if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source: std::io::Error| PersistenceError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        if !path.exists() {
            std::fs::write(&path, "").map_err(io_err)?;
        }

        let entries = read_table(&path)?;
        Ok(Self { path, entries })
    }

    /// Open `installed.toml` inside a data directory
    pub fn open_in(data_dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::open(data_dir.as_ref().join(INSTALLED_TOML))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an extension; call [`dump`](Self::dump) to persist
    pub fn insert(&mut self, name: impl Into<String>, info: ExtensionInfo) {
        self.entries.insert(name.into(), info);
    }

    /// Forget an extension; returns whether it was installed
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Record and persist in one step
    pub fn install(&mut self, name: &str, info: ExtensionInfo) -> Result<(), PersistenceError> {
        self.insert(name, info);
        self.dump()?;
        tracing::info!("Installed extension {}", name);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionInfo> {
        self.entries.get(name)
    }

    /// Installed names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the database back to disk
    pub fn dump(&self) -> Result<(), PersistenceError> {
        let content =
            toml::to_string(&self.entries).map_err(|source| PersistenceError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        std::fs::write(&self.path, content).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Uninstall everything and persist the empty database
    pub fn clear(&mut self) -> Result<(), PersistenceError> {
        self.entries.clear();
        self.dump()
    }
}

/// Extras source offering one install command per not-yet-installed extension
///
/// The returned closure re-reads both sides on every call, so an install
/// drops its entry from the next palette query.
pub fn palette_extras(
    catalog: Arc<ExtensionCatalog>,
    installed: Arc<RwLock<InstalledExtensions>>,
) -> impl Fn() -> Vec<Command> + Send + Sync + 'static {
    move || {
        let current = installed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        catalog
            .list_all()
            .filter(|(name, _)| !current.contains(name))
            .map(|(name, info)| {
                let installed = Arc::clone(&installed);
                let name = name.to_string();
                let info = info.clone();
                Command::new(format!("{}{}", INSTALL_LABEL, name), move |_| {
                    let mut db = installed
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if let Err(err) = db.install(&name, info.clone()) {
                        tracing::error!("Failed to install extension {}: {}", name, err);
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [markdown-preview]
        author = "octocat"
        description = "Live preview for Markdown buffers"
        url = "https://github.com/octocat/markdown-preview"

        [git-blame]
        author = "hubot"
        description = "Inline blame annotations"

        [Markdown-Lint]
        author = "octocat"
    "#;

    fn catalog() -> ExtensionCatalog {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, CATALOG).unwrap();
        ExtensionCatalog::load(&path).unwrap()
    }

    #[test]
    fn test_catalog_queries() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.find_by_name("git-blame").unwrap().description,
            "Inline blame annotations"
        );
        assert!(catalog.find_by_name("missing").is_none());

        let by_user: Vec<_> = catalog.list_by_user("octocat").map(|(n, _)| n).collect();
        assert_eq!(by_user, vec!["Markdown-Lint", "markdown-preview"]);

        let found: Vec<_> = catalog.filter("MARKDOWN").map(|(n, _)| n).collect();
        assert_eq!(found, vec!["Markdown-Lint", "markdown-preview"]);
    }

    #[test]
    fn test_catalog_accepts_array_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
            word-count = ["word_count.py", "octocat", "Counts words", "https://example.com/wc"]
            todo = ["todo.py", "hubot"]

            [git-blame]
            author = "hubot"
            "#,
        )
        .unwrap();

        let catalog = ExtensionCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 3);

        let info = catalog.find_by_name("word-count").unwrap();
        assert_eq!(info.file, "word_count.py");
        assert_eq!(info.author, "octocat");
        assert_eq!(info.description, "Counts words");
        assert_eq!(info.url, "https://example.com/wc");

        let by_user: Vec<_> = catalog.list_by_user("hubot").map(|(n, _)| n).collect();
        assert_eq!(by_user, vec!["git-blame", "todo"]);
        assert!(catalog.find_by_name("todo").unwrap().description.is_empty());
    }

    #[test]
    fn test_catalog_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[unterminated").unwrap();
        let err = ExtensionCatalog::load(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_installed_touches_file() {
        let dir = tempfile::tempdir().unwrap();
        let installed = InstalledExtensions::open_in(dir.path()).unwrap();
        assert!(installed.is_empty());
        assert!(dir.path().join(INSTALLED_TOML).exists());
    }

    #[test]
    fn test_installed_dump_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        {
            let mut installed = InstalledExtensions::open_in(dir.path()).unwrap();
            installed
                .install("git-blame", catalog.find_by_name("git-blame").unwrap().clone())
                .unwrap();
            installed.insert("scratch", ExtensionInfo::default());
            // insert alone is not persisted
        }

        let mut installed = InstalledExtensions::open_in(dir.path()).unwrap();
        assert_eq!(installed.names(), vec!["git-blame"]);
        assert_eq!(installed.get("git-blame").unwrap().author, "hubot");

        assert!(installed.remove("git-blame"));
        assert!(!installed.remove("git-blame"));
        installed.dump().unwrap();
        assert!(InstalledExtensions::open_in(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_installed_with_unknown_entry() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let mut installed = InstalledExtensions::open_in(dir.path()).unwrap();
        installed.insert("git-blame", ExtensionInfo::default());
        installed.insert("local-only", ExtensionInfo::default());

        let listed = catalog.list_installed(&installed);
        assert_eq!(listed.len(), 2);
        assert!(listed[0].1.is_some());
        assert_eq!(listed[1], ("local-only", None));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut installed = InstalledExtensions::open_in(dir.path()).unwrap();
        installed.install("a", ExtensionInfo::default()).unwrap();
        installed.clear().unwrap();
        assert!(InstalledExtensions::open_in(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_palette_extras_install_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let installed = Arc::new(RwLock::new(InstalledExtensions::open_in(dir.path()).unwrap()));
        let extras = palette_extras(Arc::new(catalog()), Arc::clone(&installed));

        let commands = extras();
        let labels: Vec<_> = commands.iter().map(|c| c.label().as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Install extension: Markdown-Lint",
                "Install extension: git-blame",
                "Install extension: markdown-preview",
            ]
        );

        commands[1].invoke("");
        assert!(installed.read().unwrap().contains("git-blame"));
        assert_eq!(extras().len(), 2);
        assert!(InstalledExtensions::open_in(dir.path())
            .unwrap()
            .contains("git-blame"));
    }
}
