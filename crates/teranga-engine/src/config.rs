//! # Engine Configuration
//!
//! Configuration management for the Teranga engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TERANGA_DB_PATH=/srv/teranga/teranga.db                            │
//! │     TERANGA_COMPANY_NAME="Quincaillerie Diop SARL"                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/erp/teranga.toml (Linux)                                 │
//! │     ~/Library/Application Support/sn.teranga.erp/teranga.toml (macOS)  │
//! │     or the path in TERANGA_CONFIG / --config                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     FA / AV / DV / BC / BL / BCF / RG prefixes, 411/701/4431/521/571   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numbering prefixes and account codes are written into the settings store
//! when the engine starts, so the database always posts with what the file
//! says.
//!
//! ## Configuration File Format
//! ```toml
//! # teranga.toml
//! [company]
//! name = "Quincaillerie Diop SARL"
//!
//! [database]
//! path = "/srv/teranga/teranga.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [numbering]
//! invoice = "FA"
//! credit_note = "AV"
//!
//! [accounts]
//! receivables = "411"
//! revenue = "701"
//! output_tax = "4431"
//! bank = "521"
//! cash = "571"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use teranga_core::validation::validate_prefix;
use teranga_core::{ChartOfAccounts, SequenceType};
use teranga_db::DbConfig;

use crate::error::{EngineError, EngineResult};

const CONFIG_FILE_NAME: &str = "teranga.toml";
const DATABASE_FILE_NAME: &str = "teranga.db";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("sn", "teranga", "erp")
}

// =============================================================================
// Company
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    /// Legal name printed on documents.
    #[serde(default = "default_company_name")]
    pub name: String,
}

fn default_company_name() -> String {
    "Teranga".to_string()
}

impl Default for CompanyConfig {
    fn default() -> Self {
        CompanyConfig {
            name: default_company_name(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a transition waits for the write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
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
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Pool configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// Prefix per numbered document type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub invoice: String,
    pub credit_note: String,
    pub quote: String,
    pub order: String,
    pub delivery_note: String,
    pub purchase_order: String,
    pub payment: String,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        NumberingConfig {
            invoice: SequenceType::Invoice.default_prefix().to_string(),
            credit_note: SequenceType::CreditNote.default_prefix().to_string(),
            quote: SequenceType::Quote.default_prefix().to_string(),
            order: SequenceType::Order.default_prefix().to_string(),
            delivery_note: SequenceType::DeliveryNote.default_prefix().to_string(),
            purchase_order: SequenceType::PurchaseOrder.default_prefix().to_string(),
            payment: SequenceType::Payment.default_prefix().to_string(),
        }
    }
}

impl NumberingConfig {
    pub fn prefixes(&self) -> Vec<(SequenceType, String)> {
        vec![
            (SequenceType::Invoice, self.invoice.clone()),
            (SequenceType::CreditNote, self.credit_note.clone()),
            (SequenceType::Quote, self.quote.clone()),
            (SequenceType::Order, self.order.clone()),
            (SequenceType::DeliveryNote, self.delivery_note.clone()),
            (SequenceType::PurchaseOrder, self.purchase_order.clone()),
            (SequenceType::Payment, self.payment.clone()),
        ]
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub company: CompanyConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub numbering: NumberingConfig,

    #[serde(default)]
    pub accounts: ChartOfAccounts,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `TERANGA_CONFIG`, else the
    ///    platform config directory)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("TERANGA_CONFIG").ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.company.name.trim().is_empty() {
            return Err(EngineError::Config("company.name must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for (sequence_type, prefix) in self.numbering.prefixes() {
            validate_prefix(&prefix)
                .map_err(|e| EngineError::Config(format!("numbering.{}: {}", sequence_type, e)))?;
            if !seen.insert(prefix.clone()) {
                return Err(EngineError::Config(format!(
                    "numbering prefix '{}' is used by more than one document type",
                    prefix
                )));
            }
        }

        self.accounts
            .validate()
            .map_err(|e| EngineError::Config(format!("accounts: {}", e)))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TERANGA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("TERANGA_DB_MAX_CONNECTIONS") {
            if let Ok(m) = max.parse::<u32>() {
                debug!(max_connections = m, "Overriding pool size from environment");
                self.database.max_connections = m;
            }
        }

        if let Ok(name) = std::env::var("TERANGA_COMPANY_NAME") {
            self.company.name = name;
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
