//! Upload handling: turning submitted files into batch jobs.

pub mod coordinator;

pub use coordinator::{
    BatchCoordinator, BatchSettings, BatchUpload, UploadedFile, QUEUED_STEP,
    VALIDATION_FAILED_STEP,
};
