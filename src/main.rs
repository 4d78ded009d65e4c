use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use savekit::{ConfigManager, FileStorage, JsonSerializationProvider, StorageProvider};
use savekit_common::utils::{describe_payload, format_bytes, truncate_string};

/// Inspect and manage a SaveKit storage root
#[derive(Debug, Parser)]
#[command(name = "savekit", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Persistent-data base directory, overriding configuration
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Path segment below the base directory, overriding configuration
    #[arg(long, global = true)]
    path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the on-disk location of a key
    Path { key: String },
    /// Report whether a key holds a value
    Exists { key: String },
    /// List stored keys with their sizes
    List,
    /// Print the payload stored under a key
    Show {
        key: String,

        /// Cut the output after this many characters
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Copy a key's payload to another key
    Copy { from: String, to: String },
    /// Delete a key
    Delete { key: String },
    /// Delete every key under the root
    DeleteAll {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .into_config();
    if let Some(root) = cli.root {
        config.storage.base_dir = Some(root);
    }
    if let Some(path) = cli.path {
        config.storage.path = Some(path);
    }
    savekit_config::validate(&config)?;
    savekit_logging::init_logging(&config.logging)?;

    let serializer = Arc::new(JsonSerializationProvider::from_format(config.storage.format));
    let storage: FileStorage = savekit::FileStorageProvider::from_config(serializer, &config.storage)
        .context("failed to open storage root")?;

    match cli.command {
        Command::Path { key } => {
            println!("{}", storage.get_file_path(&key).display());
        }
        Command::Exists { key } => {
            println!("{}", storage.exists_async(&key).await);
        }
        Command::List => {
            for key in storage.keys_async().await? {
                let size = tokio::fs::metadata(storage.get_file_path(&key)).await?.len();
                println!("{}\t{}", key, format_bytes(size));
            }
        }
        Command::Show { key, max_chars } => {
            let text = match storage.load_async::<serde_json::Value>(&key).await {
                Ok(value) => serde_json::to_string_pretty(&value)?,
                Err(e) if e.is_deserialization() => {
                    describe_payload(&storage.read_bytes_async(&key).await?)
                }
                Err(e) => return Err(e.into()),
            };
            match max_chars {
                Some(max) => println!("{}", truncate_string(&text, max)),
                None => println!("{}", text),
            }
        }
        Command::Copy { from, to } => {
            if !storage.exists_async(&from).await {
                bail!("nothing stored under '{}'", from);
            }
            storage.copy_async(&from, &to).await?;
        }
        Command::Delete { key } => {
            if !storage.delete_async(&key).await? {
                eprintln!("nothing stored under '{}'", key);
            }
        }
        Command::DeleteAll { yes } => {
            if !yes {
                bail!(
                    "refusing to delete everything under {} without --yes",
                    storage.root().display()
                );
            }
            storage.delete_all_async().await?;
        }
    }

    Ok(())
}
