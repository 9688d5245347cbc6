//! Service configuration resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and
//! starts with defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5740";

/// Default base URL used when building payment link URLs
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";

/// Default analysis worker endpoint
pub const DEFAULT_ANALYZER_URL: &str = "http://localhost:8000";

/// Default platform fee, in percent
pub const DEFAULT_PLATFORM_FEE_PERCENTAGE: f64 = 5.0;

/// Environment variable names
pub mod env_vars {
    pub const CONFIG_FILE: &str = "NCOS_CONFIG";
    pub const BIND_ADDRESS: &str = "NCOS_BIND_ADDRESS";
    pub const DATABASE_PATH: &str = "NCOS_DATABASE_PATH";
    pub const PUBLIC_BASE_URL: &str = "NCOS_PUBLIC_BASE_URL";
    pub const ANALYZER_URL: &str = "NCOS_ANALYZER_URL";
    pub const PLATFORM_FEE_PERCENTAGE: &str = "NCOS_PLATFORM_FEE_PERCENTAGE";
    pub const LOG_LEVEL: &str = "NCOS_LOG_LEVEL";
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub database_path: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub analyzer_url: Option<String>,
    pub platform_fee_percentage: Option<f64>,
    pub log_level: Option<String>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub database_path: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub analyzer_url: Option<String>,
    pub platform_fee_percentage: Option<f64>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub database_path: PathBuf,
    pub public_base_url: String,
    pub analyzer_url: String,
    pub platform_fee_percentage: f64,
    pub log_level: String,
}

impl ServiceConfig {
    /// Resolve configuration, reading the TOML file from `config_file`
    /// (or the platform default location when `None`)
    pub fn resolve(cli: &CliOverrides, config_file: Option<&Path>) -> Result<Self> {
        let toml_config = match config_file {
            Some(path) => load_toml_config(path)?,
            None => match default_config_path() {
                Some(path) => load_toml_config(&path)?,
                None => TomlConfig::default(),
            },
        };
        Self::resolve_with(cli, &toml_config)
    }

    /// Resolve configuration from already-loaded sources
    pub fn resolve_with(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let bind_address = pick(
            cli.bind_address.clone(),
            env_vars::BIND_ADDRESS,
            toml_config.bind_address.clone(),
        )
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| std::env::var(env_vars::DATABASE_PATH).ok().map(PathBuf::from))
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or_else(default_database_path);

        let public_base_url = pick(
            cli.public_base_url.clone(),
            env_vars::PUBLIC_BASE_URL,
            toml_config.public_base_url.clone(),
        )
        .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());

        let analyzer_url = pick(
            cli.analyzer_url.clone(),
            env_vars::ANALYZER_URL,
            toml_config.analyzer_url.clone(),
        )
        .unwrap_or_else(|| DEFAULT_ANALYZER_URL.to_string());

        let env_fee = match std::env::var(env_vars::PLATFORM_FEE_PERCENTAGE)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|e| {
                Error::Config(format!(
                    "{} is not a number ('{}'): {}",
                    env_vars::PLATFORM_FEE_PERCENTAGE,
                    raw,
                    e
                ))
            })?),
            None => None,
        };
        let platform_fee_percentage = cli
            .platform_fee_percentage
            .or(env_fee)
            .or(toml_config.platform_fee_percentage)
            .unwrap_or(DEFAULT_PLATFORM_FEE_PERCENTAGE);

        if !platform_fee_percentage.is_finite() || !(0.0..100.0).contains(&platform_fee_percentage) {
            return Err(Error::Config(format!(
                "platform_fee_percentage must be in [0, 100), got {}",
                platform_fee_percentage
            )));
        }

        let log_level = pick(
            cli.log_level.clone(),
            env_vars::LOG_LEVEL,
            toml_config.log_level.clone(),
        )
        .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            bind_address,
            database_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            analyzer_url: analyzer_url.trim_end_matches('/').to_string(),
            platform_fee_percentage,
            log_level,
        })
    }

    /// Platform fee as a 0–1 fraction
    pub fn platform_fee_fraction(&self) -> f64 {
        self.platform_fee_percentage / 100.0
    }
}

fn pick(cli: Option<String>, env_var: &str, toml_value: Option<String>) -> Option<String> {
    cli.or_else(|| std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()))
        .or(toml_value)
}

/// Load a TOML config file; a missing file yields defaults with a warning
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Default config file location (`~/.config/ncos/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(env_vars::CONFIG_FILE) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("ncos").join("config.toml"))
}

/// OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ncos"))
        .unwrap_or_else(|| PathBuf::from("./ncos_data"))
        .join("ncos.db")
}
