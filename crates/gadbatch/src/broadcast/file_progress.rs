//! File progress broadcaster for real-time batch status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{BatchJobFile, ProcessingStatus};

/// Snapshot of one batch-job file after a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProgressEvent {
    pub job_id: String,
    pub file_id: String,
    pub file_name: String,
    pub status: ProcessingStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FileProgressEvent {
    pub fn from_file(file: &BatchJobFile) -> Self {
        Self {
            job_id: file.batch_job_id.clone(),
            file_id: file.id.clone(),
            file_name: file.file_name.clone(),
            status: file.status,
            progress: file.progress,
            current_step: file.current_step.clone(),
            error: file.error_message.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Fans file progress events out to any number of subscribers.
#[derive(Clone)]
pub struct FileProgressBroadcaster {
    sender: Arc<broadcast::Sender<FileProgressEvent>>,
}

impl FileProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: FileProgressEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Publishes the current state of `file`.
    pub fn publish(&self, file: &BatchJobFile) {
        self.send(FileProgressEvent::from_file(file));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FileProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for FileProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
