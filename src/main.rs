use anyhow::Result;
use clap::{Parser, Subcommand};
use crumb::{cli, Config, SecretStore, Workbench};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crumb")]
#[command(
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), env!("CRUMB_VERSION_SUFFIX")),
    about = "Crumb - command palette, chat providers and secret store for the editor",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory holding secrets.db and installed.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: the per-user config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extension catalog TOML (overrides extensions.catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a palette query and print the matching entries
    Palette {
        /// Query, including the action set prefix (e.g. "clone:octocat/Hello-World")
        #[arg(default_value = "")]
        query: String,

        /// Run the entry at this index
        #[arg(long)]
        run: Option<usize>,
    },

    /// Show or change the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage stored secrets
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },

    /// List chat providers and their credential status
    Providers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one message to a chat provider
    Chat {
        /// Message to send
        message: String,

        /// Provider to use (e.g. "Gemini 1.5 Flash", "Echo")
        #[arg(short, long)]
        provider: Option<String>,

        /// API key; stored for the provider before the session starts
        #[arg(short, long)]
        key: Option<String>,

        /// Files to attach as context
        #[arg(short, long)]
        attach: Vec<PathBuf>,
    },

    /// Browse and install extensions
    Ext {
        #[command(subcommand)]
        action: ExtAction,

        /// Output as JSON
        #[arg(long, global = true)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set the chat provider selected when a view opens
    SetProvider { name: String },
}

#[derive(Subcommand)]
enum SecretAction {
    /// Print a stored secret
    Get { key: String },
    /// Store a secret, replacing any previous value
    Set { key: String, value: String },
    /// Delete a stored secret
    Delete { key: String },
    /// List stored secret keys
    List,
}

#[derive(Subcommand)]
enum ExtAction {
    /// List all catalog extensions
    List,
    /// List installed extensions
    Installed,
    /// Search catalog extensions by name
    Search { term: String },
    /// List catalog extensions by author
    ByUser { user: String },
    /// Install an extension from the catalog
    Install { name: String },
    /// Uninstall an extension
    Uninstall { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "crumb=debug" } else { "crumb=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let file_config = Config::load_from(&config_path)?;
    let mut config = file_config.clone();
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(catalog) = cli.catalog {
        config.extensions.catalog = Some(catalog);
    }

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(&config, &config_path)?,
            // Command-line overrides are not written back
            ConfigAction::SetProvider { name } => {
                cli::run_config_set_provider(file_config, &config_path, &name)?
            }
        },
        Commands::Palette { query, run } => {
            let workbench = Workbench::open(config)?;
            cli::run_palette(&workbench, &query, run)?;
        }
        Commands::Secret { action } => match action {
            SecretAction::Get { key } => {
                cli::run_secret_get(&SecretStore::open_default_read_only(&config)?, &key)?
            }
            SecretAction::Set { key, value } => {
                cli::run_secret_set(&SecretStore::open_default(&config)?, &key, &value)?
            }
            SecretAction::Delete { key } => {
                cli::run_secret_delete(&SecretStore::open_default(&config)?, &key)?
            }
            SecretAction::List => {
                cli::run_secret_list(&SecretStore::open_default_read_only(&config)?)?
            }
        },
        Commands::Providers { json } => {
            let workbench = Workbench::open(config)?;
            cli::run_providers(&workbench, json)?;
        }
        Commands::Chat {
            message,
            provider,
            key,
            attach,
        } => {
            let workbench = Workbench::open(config)?;
            cli::run_chat(
                &workbench,
                provider.as_deref(),
                key.as_deref(),
                &attach,
                &message,
            )
            .await?;
        }
        Commands::Ext { action, json } => {
            let workbench = Workbench::open(config)?;
            match action {
                ExtAction::List => cli::run_ext_list(&workbench, json)?,
                ExtAction::Installed => cli::run_ext_installed(&workbench, json)?,
                ExtAction::Search { term } => cli::run_ext_search(&workbench, &term, json)?,
                ExtAction::ByUser { user } => cli::run_ext_by_user(&workbench, &user, json)?,
                ExtAction::Install { name } => cli::run_ext_install(&workbench, &name)?,
                ExtAction::Uninstall { name } => cli::run_ext_uninstall(&workbench, &name)?,
            }
        }
    }

    Ok(())
}
