//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub instagram: InstagramConfig,
    pub sync: SyncConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

impl ServerConfig {
    /// Get the socket address string to bind to
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Instagram Graph API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramConfig {
    /// API base URL (e.g., "https://graph.instagram.com")
    pub base_url: String,
    /// API version segment (e.g., "v21.0")
    pub api_version: String,
}

/// Content synchronization configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Comment sweeper (one unit = one published media item)
    pub comments: SweeperConfig,
    /// Conversation-list sweeper (one unit = one account)
    pub conversations: SweeperConfig,
    /// Message sweeper (one unit = one conversation)
    pub messages: SweeperConfig,
    /// How old a unit's last sync may be before a read triggers
    /// an on-demand refresh (seconds)
    pub max_age_secs: u64,
}

impl SyncConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// Per-domain background sweeper configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Time between sweeps (seconds)
    pub interval_secs: u64,
    /// Staleness threshold: units synced more recently are skipped (seconds)
    pub sync_age_secs: u64,
    /// Max units synced per sweep
    pub batch_size: u32,
    /// Consecutive failures before a unit is excluded from sweeps
    pub max_retries: u32,
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn sync_age(&self) -> Duration {
        Duration::from_secs(self.sync_age_secs)
    }
}

/// Publication scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the publication scheduler runs at all
    pub enabled: bool,
    /// Time between due-publication checks (seconds)
    pub interval_secs: u64,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (METAGRAM_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/metagram.db")?
            .set_default("instagram.base_url", "https://graph.instagram.com")?
            .set_default("instagram.api_version", "v21.0")?
            .set_default("sync.comments.interval_secs", 300)?
            .set_default("sync.comments.sync_age_secs", 600)?
            .set_default("sync.comments.batch_size", 10)?
            .set_default("sync.comments.max_retries", 5)?
            .set_default("sync.conversations.interval_secs", 600)?
            .set_default("sync.conversations.sync_age_secs", 1800)?
            .set_default("sync.conversations.batch_size", 5)?
            .set_default("sync.conversations.max_retries", 5)?
            .set_default("sync.messages.interval_secs", 600)?
            .set_default("sync.messages.sync_age_secs", 1800)?
            .set_default("sync.messages.batch_size", 10)?
            .set_default("sync.messages.max_retries", 5)?
            .set_default("sync.max_age_secs", 300)?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.interval_secs", 60)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (METAGRAM_*)
            .add_source(
                Environment::with_prefix("METAGRAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        for (name, sweeper) in [
            ("sync.comments", &self.sync.comments),
            ("sync.conversations", &self.sync.conversations),
            ("sync.messages", &self.sync.messages),
        ] {
            if sweeper.interval_secs == 0 {
                return Err(crate::error::AppError::Config(format!(
                    "{}.interval_secs must be greater than 0",
                    name
                )));
            }
            if sweeper.batch_size == 0 {
                return Err(crate::error::AppError::Config(format!(
                    "{}.batch_size must be greater than 0",
                    name
                )));
            }
            if sweeper.max_retries == 0 {
                return Err(crate::error::AppError::Config(format!(
                    "{}.max_retries must be greater than 0",
                    name
                )));
            }
        }

        if self.scheduler.enabled && self.scheduler.interval_secs == 0 {
            return Err(crate::error::AppError::Config(
                "scheduler.interval_secs must be greater than 0".to_string(),
            ));
        }

        url::Url::parse(&self.instagram.base_url).map_err(|e| {
            crate::error::AppError::Config(format!("instagram.base_url is not a valid URL: {}", e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/metagram-test.db"),
            },
            instagram: InstagramConfig {
                base_url: "https://graph.instagram.com".to_string(),
                api_version: "v21.0".to_string(),
            },
            sync: SyncConfig {
                comments: SweeperConfig {
                    interval_secs: 300,
                    sync_age_secs: 600,
                    batch_size: 10,
                    max_retries: 5,
                },
                conversations: SweeperConfig {
                    interval_secs: 600,
                    sync_age_secs: 1800,
                    batch_size: 5,
                    max_retries: 5,
                },
                messages: SweeperConfig {
                    interval_secs: 600,
                    sync_age_secs: 1800,
                    batch_size: 10,
                    max_retries: 5,
                },
                max_age_secs: 300,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                interval_secs: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_sweep_interval() {
        let mut config = valid_config();
        config.sync.comments.interval_secs = 0;

        let error = config
            .validate()
            .expect_err("zero sweep interval must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("sync.comments.interval_secs")
        ));
    }

    #[test]
    fn validate_rejects_zero_max_retries() {
        let mut config = valid_config();
        config.sync.messages.max_retries = 0;

        let error = config.validate().expect_err("zero max_retries must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("sync.messages.max_retries")
        ));
    }

    #[test]
    fn validate_rejects_invalid_base_url() {
        let mut config = valid_config();
        config.instagram.base_url = "not a url".to_string();

        let error = config.validate().expect_err("invalid base URL must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("instagram.base_url")
        ));
    }
}
