pub mod batch;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod store;
pub mod worker;

pub use batch::{BatchCoordinator, BatchSettings, BatchUpload, UploadedFile};
pub use broadcast::{FileProgressBroadcaster, FileProgressEvent};
pub use config::{load_config, Config};
pub use error::{
    BatchError, ConfigError, ExportError, GadError, ParseError, Result, StoreError, WorkerError,
};
pub use export::{build_archive, export_manifest, ExportManifest};
pub use parser::{parse_input, read_bridge_input, validate_input, BridgeInput};
pub use store::{open_store, MemoryStore, SqliteStore, Store};
pub use worker::{ProcessingQueue, SimulatedProcessor};
