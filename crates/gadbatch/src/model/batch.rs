//! Batch jobs and the files they own.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state shared by batch jobs and batch-job files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    /// Returns true for states that never change again.
    pub fn is_finished(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// A user-submitted group of files processed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub status: ProcessingStatus,
    pub total_files: u32,
    /// Files in a finished state, recomputed from file statuses.
    pub processed_files: u32,
    pub failed_files: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    /// Moves the job to `next` unless that would move it backwards.
    ///
    /// Returns whether the status changed.
    pub fn advance_status(&mut self, next: ProcessingStatus) -> bool {
        let rank = |s: ProcessingStatus| match s {
            ProcessingStatus::Pending => 0,
            ProcessingStatus::Processing => 1,
            ProcessingStatus::Completed | ProcessingStatus::Failed => 2,
        };
        if rank(next) <= rank(self.status) {
            return false;
        }
        self.status = next;
        true
    }
}

/// Fields needed to create a batch job.
#[derive(Debug, Clone)]
pub struct NewBatchJob {
    pub user_id: String,
    pub name: String,
    pub total_files: u32,
}

/// One uploaded file inside a batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobFile {
    pub id: String,
    pub batch_job_id: String,
    pub project_id: Option<String>,
    pub file_name: String,
    pub file_size: u64,
    pub status: ProcessingStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub error_message: Option<String>,
    pub current_step: Option<String>,
    /// Estimated processing time in seconds.
    pub estimated_time: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields needed to create a batch-job file.
#[derive(Debug, Clone)]
pub struct NewBatchJobFile {
    pub batch_job_id: String,
    pub project_id: Option<String>,
    pub file_name: String,
    pub file_size: u64,
    pub status: ProcessingStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub current_step: Option<String>,
    pub estimated_time: Option<u32>,
}
