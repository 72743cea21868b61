//! Cart CLI - inspect and change the persisted shopping cart.
//!
//! # Usage
//!
//! ```bash
//! cart add --id 1 --title Shirt --price 50
//! cart increment 1
//! cart decrement 1
//! cart list --json
//! ```
//!
//! Each invocation opens the store, hydrates the cart from storage, applies
//! one command and prints the resulting cart.

use std::process::ExitCode;
use std::sync::Arc;

use cart::{CartContext, CartError, CartStore};
use clap::Parser;
use kv_store::{FileStore, KeyValueStore, PostgresStore, StorageError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod config;

use commands::Command;
use config::Config;

#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about = "Persistent shopping cart")]
struct Cli {
    /// Print the cart as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

async fn open_storage(config: &Config) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL storage");
            let store = PostgresStore::connect(url).await?;
            store.run_migrations().await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(dir = %config.data_dir.display(), "using file storage");
            Ok(Arc::new(FileStore::open(&config.data_dir).await?))
        }
    }
}

async fn run(cli: Cli, config: &Config) -> Result<String, CliError> {
    let storage = open_storage(config).await?;
    let store = CartStore::open(storage, config.cart_config()).await?;
    let context = CartContext::with_store(&store);

    Ok(commands::run(cli.command, &context, cli.json).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli, &config).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
