pub mod loader;
pub mod schema;

pub use loader::{apply_env_overrides, load, load_config, load_config_from_str, resolve_config_path};
pub use schema::{Config, LogFormat, ProcessingConfig, StorageBackend, StorageConfig};
