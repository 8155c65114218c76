//! # Configuration State
//!
//! Store configuration loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`HATSHOP_*`)
//! 2. Config file (`--config <path>` or `<config dir>/storefront.toml`)
//! 3. Defaults (this file)
//!
//! ## Example `storefront.toml`
//! ```toml
//! [store]
//! name = "Custom Branded Hats"
//! order_number_prefix = "CBH"
//!
//! [database]
//! path = "/var/lib/hatshop/hatshop.db"
//!
//! [loyalty_lookup]
//! timeout_ms = 1500
//!
//! [pricing]
//! artwork_setup_fee = 4000
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use hatshop_core::{CoreError, PricingConfig, PricingEngine, ORDER_NUMBER_PREFIX};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "storefront.toml";

const ENV_DB_PATH: &str = "HATSHOP_DB_PATH";
const ENV_STORE_NAME: &str = "HATSHOP_STORE_NAME";
const ENV_LOOKUP_TIMEOUT_MS: &str = "HATSHOP_LOOKUP_TIMEOUT_MS";

/// Configuration loading errors. Any of these halts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error(transparent)]
    Pricing(#[from] CoreError),

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

// =============================================================================
// Sections
// =============================================================================

/// `[store]`: display and numbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Store name (shown on checkout pages)
    pub name: String,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Prefix of human-facing order numbers
    pub order_number_prefix: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: "Custom Branded Hats".to_string(),
            currency_code: "USD".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            order_number_prefix: ORDER_NUMBER_PREFIX.to_string(),
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Database file. `None` uses the platform data directory.
    pub path: Option<PathBuf>,

    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
        }
    }
}

/// `[loyalty_lookup]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoyaltyLookupSection {
    /// Past this the shopper is priced as a new customer.
    pub timeout_ms: u64,
}

impl Default for LoyaltyLookupSection {
    fn default() -> Self {
        LoyaltyLookupSection { timeout_ms: 2000 }
    }
}

// =============================================================================
// Store Config
// =============================================================================

/// Storefront configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub store: StoreSection,
    pub database: DatabaseSection,
    pub loyalty_lookup: LoyaltyLookupSection,
    pub pricing: PricingConfig,
}

impl StoreConfig {
    /// Loads configuration: defaults, then the file, then `HATSHOP_*`.
    ///
    /// An explicit `path` must exist. Without one, the platform config
    /// directory is tried and silently skipped when the file is absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(file) => {
                info!(path = %file.display(), "Loading store configuration");
                let text = std::fs::read_to_string(&file).map_err(|source| ConfigError::Io {
                    path: file.clone(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => {
                debug!("No config file, using defaults");
                StoreConfig::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document. Missing sections and keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// ## Environment Variables
    /// - `HATSHOP_DB_PATH`: database file
    /// - `HATSHOP_STORE_NAME`: store name
    /// - `HATSHOP_LOOKUP_TIMEOUT_MS`: loyalty lookup timeout
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup(ENV_STORE_NAME) {
            self.store.name = name;
        }

        if let Some(raw) = lookup(ENV_LOOKUP_TIMEOUT_MS) {
            self.loyalty_lookup.timeout_ms =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_LOOKUP_TIMEOUT_MS.to_string(),
                    reason: format!("expected milliseconds, got '{}'", raw),
                })?;
        }

        Ok(())
    }

    /// Checks every section. The pricing tables must be valid for the
    /// storefront to accept orders at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.order_number_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "store.order_number_prefix".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.store.currency_decimals > 4 {
            return Err(ConfigError::InvalidValue {
                key: "store.currency_decimals".to_string(),
                reason: "must be at most 4".to_string(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.loyalty_lookup.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "loyalty_lookup.timeout_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.pricing.validate()?;
        Ok(())
    }

    /// Builds the pricing engine from the `[pricing]` section.
    pub fn pricing_engine(&self) -> Result<PricingEngine, ConfigError> {
        Ok(PricingEngine::new(self.pricing.clone())?)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.loyalty_lookup.timeout_ms)
    }

    /// Resolves the database file.
    ///
    /// ## Platform-Specific Defaults
    /// - **macOS**: `~/Library/Application Support/com.hatshop.storefront/hatshop.db`
    /// - **Windows**: `%APPDATA%\hatshop\storefront\data\hatshop.db`
    /// - **Linux**: `~/.local/share/storefront/hatshop.db`
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        Ok(data_dir.join("hatshop.db"))
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = StoreConfig::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let decimals = u32::from(self.store.currency_decimals);
        let divisor = 10_i64.pow(decimals);
        let whole = (cents / divisor).abs();
        let frac = (cents % divisor).abs();
        let sign = if cents < 0 { "-" } else { "" };

        if decimals > 0 {
            format!(
                "{}{}{}.{:0width$}",
                sign,
                self.store.currency_symbol,
                whole,
                frac,
                width = decimals as usize
            )
        } else {
            format!("{}{}{}", sign, self.store.currency_symbol, whole)
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "hatshop", "storefront")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
