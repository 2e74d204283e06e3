use crate::config::schema::Config;
use crate::schedule::ReferenceMonth;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
pub(crate) static CONFIG_TEST_ENV_LOCK: Mutex<()> = Mutex::new(());

pub const ENV_ACCESS_TOKEN: &str = "LINE_CHANNEL_ACCESS_TOKEN";
pub const ENV_CHANNEL_SECRET: &str = "LINE_CHANNEL_SECRET";
pub const ENV_BIND: &str = "TRASHDAY_BIND";
pub const ENV_REFERENCE_MONTH: &str = "TRASHDAY_REFERENCE_MONTH";
pub const ENV_TEMPLATE_PATH: &str = "TRASHDAY_TEMPLATE_PATH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{ENV_REFERENCE_MONTH} is invalid: {0}")]
    InvalidReferenceMonth(String),
}

/// Loads configuration with precedence CLI flags > environment > file > defaults.
pub fn load_config(cli_bind: Option<String>, cli_config_path: Option<PathBuf>) -> Result<Config> {
    tracing::debug!("Loading configuration");

    let mut config = Config::default();

    // Layer 1: config file (~/.trashday/config.json)
    let config_file = cli_config_path.or_else(get_default_config_path);

    if let Some(ref path) = config_file {
        if path.exists() {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            config = merge_config_from_file(config, path)?;
        } else {
            tracing::debug!(config_path = %path.display(), "Config file not found, using defaults");
        }
    }

    // Layer 2: environment variables
    tracing::debug!("Applying environment variable overrides");
    config = merge_env_variables(config)?;

    // Layer 3: CLI flags
    if let Some(bind) = cli_bind {
        tracing::debug!(bind_addr = %bind, "Applying CLI bind override");
        config.bind_addr = bind;
    }

    let summary = config.get_safe_summary();
    tracing::debug!(
        access_token_configured = summary.access_token_configured,
        channel_secret_configured = summary.channel_secret_configured,
        bind_addr = %summary.bind_addr,
        reference_month = %summary.reference_month,
        template_configured = summary.template_configured,
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".trashday").join("config.json"))
}

fn merge_config_from_file(config: Config, path: &Path) -> Result<Config> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(config),
        Err(e) => return Err(e).context("Failed to read metadata for config file"),
    };

    let mode = metadata.permissions().mode() & 0o777;

    // The file holds the channel secret
    if mode != 0o600 {
        tracing::error!(
            "Config file {:?} has permissions {:o}, expected 0600 - skipping for security",
            path,
            mode
        );
        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let file_config: Config = serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error: Configuration file contains invalid JSON.");
        eprintln!("Suggestion: Run 'trashday init' to recreate the configuration file.");
        ConfigError::InvalidJson(e)
    })?;

    Ok(file_config)
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn merge_env_variables(mut config: Config) -> Result<Config> {
    if let Some(token) = env_non_empty(ENV_ACCESS_TOKEN) {
        config.channel_access_token = Some(token);
    }
    if let Some(secret) = env_non_empty(ENV_CHANNEL_SECRET) {
        config.channel_secret = Some(secret);
    }
    if let Some(bind) = env_non_empty(ENV_BIND) {
        config.bind_addr = bind;
    }
    if let Some(month) = env_non_empty(ENV_REFERENCE_MONTH) {
        config.reference_month = month
            .parse::<ReferenceMonth>()
            .map_err(|e| ConfigError::InvalidReferenceMonth(e.to_string()))?;
    }
    if let Some(path) = env_non_empty(ENV_TEMPLATE_PATH) {
        config.template_path = Some(PathBuf::from(path));
    }
    Ok(config)
}

pub fn save_config(config: &Config, path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(config)?;

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create config file: {:?}", path))?;

    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    // Owner read/write only
    let mut permissions = file.metadata()?.permissions();
    permissions.set_mode(0o600);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to set permissions on config file: {:?}", path))?;

    tracing::info!("Configuration saved to {:?}", path);
    Ok(())
}

pub fn get_config_path() -> Option<PathBuf> {
    get_default_config_path()
}
