//! Records persisted by the entity store.
//!
//! All records serialize to camelCase JSON, matching what the web client
//! polls for.

pub mod batch;
pub mod project;

pub use batch::{BatchJob, BatchJobFile, NewBatchJob, NewBatchJobFile, ProcessingStatus};
pub use project::{
    BridgeCrossSection, BridgeParameters, BridgeProject, DesignProject, DesignProjectPatch,
    NewBridgeProject, NewDesignProject, NewUser, User,
};

/// Generates a fresh record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Strips the last extension from a file name.
///
/// Names without a dot, or whose only dot is the first character, are
/// returned unchanged.
pub fn base_name(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}
