use std::path::{Path, PathBuf};

use crate::config::schema::{Config, StorageBackend, CONFIG_VERSION};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub const CONFIG_PATH_ENV: &str = "GADBATCH_CONFIG";
pub const LISTEN_ADDR_ENV: &str = "GADBATCH_LISTEN_ADDR";
pub const DATABASE_ENV: &str = "GADBATCH_DATABASE";
pub const TIME_SCALE_ENV: &str = "GADBATCH_TIME_SCALE";

/// Loads the effective configuration: file (if any), then environment
/// overrides, then validation.
pub fn load() -> Result<Config, ConfigError> {
    let mut config = match resolve_config_path() {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            load_config(&path)?
        }
        None => {
            log::info!("No config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// `$GADBATCH_CONFIG`, else `~/.gadbatch/config.json` if it exists.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::home_dir()
        .map(|h| h.join(".gadbatch").join("config.json"))
        .filter(|p| p.is_file())
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(addr) = env_value(LISTEN_ADDR_ENV) {
        config.listen_addr = addr;
    }

    if let Some(path) = env_value(DATABASE_ENV) {
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = Some(PathBuf::from(path));
    }

    if let Some(raw) = env_value(TIME_SCALE_ENV) {
        config.processing.time_scale = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| ConfigError::InvalidOverride {
                name: TIME_SCALE_ENV.to_string(),
                value: raw.clone(),
            })?;
    }

    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.default_user_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "default_user_id must not be empty".to_string(),
        });
    }

    let processing = &config.processing;
    if processing.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "processing.worker_count must be at least 1".to_string(),
        });
    }
    if !(processing.time_scale.is_finite() && processing.time_scale >= 0.0) {
        return Err(ConfigError::Validation {
            message: format!(
                "processing.time_scale must be >= 0 (got {})",
                processing.time_scale
            ),
        });
    }
    if !(1..=20).contains(&processing.max_files_per_batch) {
        return Err(ConfigError::Validation {
            message: format!(
                "processing.max_files_per_batch must be between 1 and 20 (got {})",
                processing.max_files_per_batch
            ),
        });
    }

    Ok(())
}
