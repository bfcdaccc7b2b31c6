//! Upstream API key administration.
//!
//! Operates on the same key file as the server. Secrets are always printed
//! masked.

use clap::{Parser, Subcommand};
use market_client::{DEFAULT_RATE_LIMIT, FileKeyStore, KeyRotator};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "manage-keys", about = "Manage upstream API keys", version)]
struct Cli {
    /// Key file shared with the server.
    #[arg(
        long,
        env = "API_KEYS_FILE",
        default_value = "config/apiKeys/coinmarketcap.json"
    )]
    keys_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List keys with their usage.
    List,
    /// Add a key.
    Add {
        /// Secret value.
        key: String,
        /// Advisory request ceiling.
        #[arg(default_value_t = DEFAULT_RATE_LIMIT)]
        rate_limit: u32,
    },
    /// Remove a key.
    Remove {
        /// Secret value.
        key: String,
    },
    /// Zero every usage counter.
    Reset,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let store = Arc::new(FileKeyStore::new(cli.keys_file, None));
    let rotator = KeyRotator::new(store);

    match cli.command {
        Command::List => {
            let keys = rotator.list_keys();
            if keys.is_empty() {
                println!("No API keys configured");
                return Ok(());
            }
            println!("{:<16} {:>10} {:>8}", "KEY", "RATE LIMIT", "USED");
            for key in keys {
                println!("{:<16} {:>10} {:>8}", key.key, key.rate_limit, key.used);
            }
            println!("Last rotation: {}", rotator.last_rotation().to_rfc3339());
        }
        Command::Add { key, rate_limit } => {
            rotator.add_key(key.trim(), rate_limit)?;
            println!("API key added successfully");
        }
        Command::Remove { key } => {
            rotator.remove_key(key.trim())?;
            println!("API key removed successfully");
        }
        Command::Reset => {
            rotator.reset_usage()?;
            println!("API key usage counts reset successfully");
        }
    }

    Ok(())
}
