use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Parse(#[from] ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidOverride { name: String, value: String },
}

/// Errors produced while reading an uploaded GAD parameter file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid file format: insufficient data")]
    InsufficientData,

    #[error("Invalid file format: failed to parse numeric values")]
    InvalidNumber,

    #[error("Validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(crate::db::DatabaseError::Sqlite(e))
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write archive entry: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Processing queue is closed")]
    ChannelClosed,

    #[error("Batch job not found: {0}")]
    JobNotFound(String),

    #[error("Processing failed: {0}")]
    JobFailed(String),

    #[error("Store error during processing: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the batch coordinator.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("A batch must contain between 1 and {max} files (got {count})")]
    InvalidFileCount { count: usize, max: usize },

    #[error("File '{name}' reports an unsupported size of {size} bytes")]
    InvalidFileSize { name: String, size: u64 },

    #[error("Batch job not found")]
    JobNotFound(String),

    #[error("Job is not in pending status")]
    NotPending(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to serialize parameters: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to queue batch job: {0}")]
    Queue(#[from] WorkerError),
}

pub type Result<T> = std::result::Result<T, GadError>;
