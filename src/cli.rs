//! CLI command handlers

use crate::config::Config;
use crate::extensions::ExtensionInfo;
use crate::llm::builtin_providers;
use crate::storage::SecretStore;
use crate::workbench::Workbench;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

/// Print the palette entries for `query`, optionally running one of them
pub fn run_palette(workbench: &Workbench, query: &str, run: Option<usize>) -> Result<()> {
    let Some(resolved) = workbench.palette().resolve(query) else {
        bail!("No action set answers to '{}'", query);
    };

    println!(
        "{} {}",
        resolved.set.title().bold().cyan(),
        format!("({})", resolved.set.prefix()).dimmed()
    );

    let entries = resolved.entries();
    if entries.is_empty() {
        println!("No matching commands.");
    }
    for (index, entry) in entries.iter().enumerate() {
        let marker = if entry.pinned { "*" } else { " " };
        println!("{:>3} {} {}", index, marker, entry.label);
    }

    if let Some(index) = run {
        let Some(entry) = entries.get(index) else {
            bail!("No entry {} for '{}'", index, query);
        };
        entry.run(&resolved.term);
        println!();
        println!("Ran '{}'", entry.label);
        for url in workbench.take_clone_requests() {
            println!("Clone requested: {}", url);
        }
    }

    Ok(())
}

pub fn run_config_show(config: &Config, path: &Path) -> Result<()> {
    println!("{}", format!("# {}", path.display()).dimmed());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Persist a new default chat provider to the config file at `path`
pub fn run_config_set_provider(mut config: Config, path: &Path, provider: &str) -> Result<()> {
    let providers = builtin_providers(&config.chat)?;
    if !providers.contains(provider) {
        bail!(
            "Unknown chat provider: {} (available: {})",
            provider,
            providers.names().join(", ")
        );
    }

    config.chat.default_provider = provider.to_string();
    config.save_to(path)?;
    println!("Default chat provider set to {}", provider.green());
    Ok(())
}

pub fn run_secret_get(store: &SecretStore, key: &str) -> Result<()> {
    match store.get(key)? {
        Some(value) => println!("{}", value),
        None => bail!("No secret stored for {}", key),
    }
    Ok(())
}

pub fn run_secret_set(store: &SecretStore, key: &str, value: &str) -> Result<()> {
    store.put(key, value)?;
    println!("Stored {}", key);
    Ok(())
}

pub fn run_secret_delete(store: &SecretStore, key: &str) -> Result<()> {
    if store.delete(key)? {
        println!("Deleted {}", key);
    } else {
        println!("No secret stored for {}", key);
    }
    Ok(())
}

pub fn run_secret_list(store: &SecretStore) -> Result<()> {
    let keys = store.keys()?;
    if keys.is_empty() {
        println!("No secrets stored.");
    }
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

#[derive(Tabled, Serialize)]
struct ProviderRow {
    #[tabled(rename = "Provider")]
    name: String,
    #[tabled(rename = "Secret key")]
    secret_key: String,
    #[tabled(rename = "Credential")]
    credential: String,
    #[tabled(rename = "Current")]
    current: String,
}

/// List chat providers with their credential status
pub fn run_providers(workbench: &Workbench, json: bool) -> Result<()> {
    let controller = workbench.lock_session();

    let mut rows = Vec::new();
    for name in controller.providers() {
        let stored = controller.stored_credential(name)?.is_some();
        rows.push(ProviderRow {
            name: name.to_string(),
            secret_key: controller.secret_key(name)?,
            credential: if stored { "stored" } else { "missing" }.to_string(),
            current: if name == controller.current_provider() {
                "*".to_string()
            } else {
                String::new()
            },
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }
    Ok(())
}

/// Activate a session and send one turn
pub async fn run_chat(
    workbench: &Workbench,
    provider: Option<&str>,
    key: Option<&str>,
    attach: &[PathBuf],
    message: &str,
) -> Result<()> {
    let session = workbench.session();
    let mut controller = session
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(provider) = provider {
        controller.set_provider(provider)?;
    }
    if let Some(key) = key {
        controller.activate(key)?;
    }
    if !controller.is_active() {
        bail!(
            "No API key stored for {}; pass --key or run `crumb secret set {} <KEY>`",
            controller.current_provider(),
            controller.secret_key(controller.current_provider())?
        );
    }

    let provider = controller.current_provider().to_string();
    controller.attach_file(attach)?;
    let reply = controller
        .send(message)
        .await
        .with_context(|| format!("{} did not answer", provider))?;
    println!("{}", reply);
    Ok(())
}

#[derive(Tabled, Serialize)]
struct ExtensionRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn print_extensions<'a>(
    workbench: &Workbench,
    extensions: impl Iterator<Item = (&'a str, Option<&'a ExtensionInfo>)>,
    json: bool,
) -> Result<()> {
    let installed = workbench
        .installed()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let rows: Vec<ExtensionRow> = extensions
        .map(|(name, info)| {
            let info = info.cloned().unwrap_or_default();
            ExtensionRow {
                name: name.to_string(),
                author: info.author,
                description: info.description.chars().take(50).collect(),
                status: if installed.contains(name) {
                    "installed".to_string()
                } else {
                    "available".to_string()
                },
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("No extensions found.");
    } else {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }
    Ok(())
}

pub fn run_ext_list(workbench: &Workbench, json: bool) -> Result<()> {
    let catalog = workbench.catalog();
    print_extensions(
        workbench,
        catalog.list_all().map(|(name, info)| (name, Some(info))),
        json,
    )
}

pub fn run_ext_installed(workbench: &Workbench, json: bool) -> Result<()> {
    let installed = workbench
        .installed()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let listed: Vec<(String, Option<ExtensionInfo>)> = workbench
        .catalog()
        .list_installed(&installed)
        .into_iter()
        .map(|(name, info)| {
            (
                name.to_string(),
                info.or_else(|| installed.get(name)).cloned(),
            )
        })
        .collect();
    drop(installed);

    print_extensions(
        workbench,
        listed
            .iter()
            .map(|(name, info)| (name.as_str(), info.as_ref())),
        json,
    )
}

pub fn run_ext_search(workbench: &Workbench, term: &str, json: bool) -> Result<()> {
    print_extensions(
        workbench,
        workbench
            .catalog()
            .filter(term)
            .map(|(name, info)| (name, Some(info))),
        json,
    )
}

pub fn run_ext_by_user(workbench: &Workbench, user: &str, json: bool) -> Result<()> {
    print_extensions(
        workbench,
        workbench
            .catalog()
            .list_by_user(user)
            .map(|(name, info)| (name, Some(info))),
        json,
    )
}

pub fn run_ext_install(workbench: &Workbench, name: &str) -> Result<()> {
    let Some(info) = workbench.catalog().find_by_name(name) else {
        bail!("Extension '{}' is not in the catalog", name);
    };

    let mut installed = workbench
        .installed()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if installed.contains(name) {
        println!("{} is already installed", name);
        return Ok(());
    }
    installed.install(name, info.clone())?;
    println!("{} {}", "Installed".green(), name);
    Ok(())
}

pub fn run_ext_uninstall(workbench: &Workbench, name: &str) -> Result<()> {
    let mut installed = workbench
        .installed()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if !installed.remove(name) {
        bail!("Extension '{}' is not installed", name);
    }
    installed.dump()?;
    println!("Uninstalled {}", name);
    Ok(())
}
