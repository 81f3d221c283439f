use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Owner of every batch job and uploaded project.
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_user_id() -> String {
    "dummy-user".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            listen_addr: default_listen_addr(),
            default_user_id: default_user_id(),
            storage: StorageConfig::default(),
            processing: ProcessingConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite file. Defaults to `~/.gadbatch/data/gadbatch.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn database_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(crate::db::default_database_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Multiplier for the simulated step delays; 0 runs steps back to back.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    #[serde(default = "default_estimated_time")]
    pub estimated_time_secs: u32,
    #[serde(default = "default_max_files")]
    pub max_files_per_batch: usize,
}

fn default_worker_count() -> usize {
    2
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_estimated_time() -> u32 {
    180
}

fn default_max_files() -> usize {
    20
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            time_scale: default_time_scale(),
            estimated_time_secs: default_estimated_time(),
            max_files_per_batch: default_max_files(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
