//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use cart::{CART_STORAGE_KEY, CartConfig, WriteRetryPolicy};

/// CLI configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `CART_DATA_DIR` — directory for the file store (default: `".cart"`)
/// - `CART_STORAGE_KEY` — key the cart is stored under
///   (default: `"@GoMarketplace:products"`)
/// - `CART_WRITE_ATTEMPTS` — write attempts before giving up (default: `3`)
/// - `DATABASE_URL` — when set, use PostgreSQL instead of the file store
/// - `RUST_LOG` — tracing filter directive (default: `"warn"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub write_attempts: u32,
    pub database_url: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("CART_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            storage_key: lookup("CART_STORAGE_KEY")
                .filter(|key| !key.is_empty())
                .unwrap_or(defaults.storage_key),
            write_attempts: lookup("CART_WRITE_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.write_attempts),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Builds the cart store configuration.
    pub fn cart_config(&self) -> CartConfig {
        CartConfig::new()
            .with_storage_key(self.storage_key.clone())
            .with_write_retry(WriteRetryPolicy::new(
                self.write_attempts,
                Duration::from_millis(50),
                Duration::from_secs(1),
            ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".cart"),
            storage_key: CART_STORAGE_KEY.to_string(),
            write_attempts: 3,
            database_url: None,
            log_level: "warn".to_string(),
        }
    }
}
