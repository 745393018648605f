//! # configs
//!
//! Application configuration, layered from built-in defaults, an optional
//! TOML file and `MICROMANAGER__`-prefixed environment variables
//! (`MICROMANAGER__DATABASE__URL`, `MICROMANAGER__ENGINE__SLUG_MAX_LENGTH`, ...).
//! A `.env` file in the working directory is read first.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const ENV_PREFIX: &str = "MICROMANAGER";
pub const DEFAULT_CONFIG_FILE: &str = "micromanager.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub themes: ThemeConfig,
    pub engine: EngineConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; may embed credentials
    #[serde(deserialize_with = "secret")]
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeConfig {
    pub root: PathBuf,
    pub default_theme: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub slug_max_length: usize,
    pub slug_retry_limit: u32,
    /// Parse `min-N` / `max-N` slot arguments
    pub honor_slot_bounds: bool,
    pub file_copy_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl AppConfig {
    /// Loads configuration. `file` overrides the default
    /// `micromanager.toml`, which may be absent.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }

        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .set_default("database.url", "sqlite://micromanager.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("media.root", "./data/media")?
            .set_default("themes.root", "./themes")?
            .set_default("themes.default_theme", "default")?
            .set_default("engine.slug_max_length", 30)?
            .set_default("engine.slug_retry_limit", 3)?
            .set_default("engine.honor_slot_bounds", false)?
            .set_default("engine.file_copy_attempts", 2)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info")?
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.slug_max_length < 2 {
            return Err(ConfigError::Invalid(
                "engine.slug_max_length must leave room for a suffix".to_string(),
            ));
        }
        if self.engine.file_copy_attempts == 0 {
            return Err(ConfigError::Invalid(
                "engine.file_copy_attempts must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
