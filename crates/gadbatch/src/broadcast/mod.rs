//! Event broadcasting for observers of batch processing.

pub mod file_progress;

pub use file_progress::{FileProgressBroadcaster, FileProgressEvent};
