//! # Settlement Configuration
//!
//! Store identity, database location and ledger paging.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BAHI_HOME_REGION=27                                                │
//! │     BAHI_DB_PATH=/var/lib/bahi/bahi.db                                 │
//! │     BAHI_HISTORY_PAGE_SIZE=100                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/bahi/bahi.toml (Linux)                                   │
//! │     ~/Library/Application Support/in.bahi.bahi/bahi.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! home_region_code = "27"
//! name = "Shree Traders"
//!
//! [database]
//! path = "/var/lib/bahi/bahi.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [ledger]
//! history_page_size = 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use bahi_core::validation::validate_region_code;

use crate::pool::DbConfig;

/// Hard ceiling for a single stock history page.
pub const MAX_HISTORY_PAGE_SIZE: u32 = 500;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// The store this back office settles orders for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Region code of the seller's registration. Orders whose place of
    /// supply differs are cross-region.
    #[serde(default = "default_home_region")]
    pub home_region_code: String,

    #[serde(default)]
    pub name: String,
}

fn default_home_region() -> String {
    "27".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            home_region_code: default_home_region(),
            name: String::new(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `bahi.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

/// Ledger read settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Entries per stock history page.
    #[serde(default = "default_page_size")]
    pub history_page_size: u32,
}

fn default_page_size() -> u32 {
    50
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            history_page_size: default_page_size(),
        }
    }
}

// =============================================================================
// Settlement Configuration
// =============================================================================

/// Complete settlement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl SettlementConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`bahi.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading settlement config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_region_code(&self.store.home_region_code)
            .map_err(|e| ConfigError::Invalid(format!("store.home_region_code: {}", e)))?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.ledger.history_page_size == 0 || self.ledger.history_page_size > MAX_HISTORY_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "ledger.history_page_size must be between 1 and {}",
                MAX_HISTORY_PAGE_SIZE
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `BAHI_*` overrides from the given lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(region) = lookup("BAHI_HOME_REGION") {
            debug!(region = %region, "Overriding home region from environment");
            self.store.home_region_code = region;
        }

        if let Some(path) = lookup("BAHI_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(size) = lookup("BAHI_HISTORY_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(parsed) => self.ledger.history_page_size = parsed,
                Err(_) => warn!(value = %size, "Ignoring non-numeric BAHI_HISTORY_PAGE_SIZE"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("in", "bahi", "bahi")
            .map(|dirs| dirs.config_dir().join("bahi.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn home_region(&self) -> &str {
        self.store.home_region_code.trim()
    }

    /// Database file: configured path, else the platform data directory,
    /// else the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }

        directories::ProjectDirs::from("in", "bahi", "bahi")
            .map(|dirs| dirs.data_dir().join("bahi.db"))
            .unwrap_or_else(|| PathBuf::from("bahi.db"))
    }

    /// Pool configuration derived from the `[database]` section.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }

    pub fn history_page_size(&self) -> u32 {
        self.ledger.history_page_size
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
