use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};

use crate::config::Config;
use crate::error::{BatchError, ParseError};
use crate::model::{
    base_name, new_id, BatchJob, BatchJobFile, BridgeCrossSection, BridgeParameters,
    NewBatchJob, NewBatchJobFile, NewBridgeProject, ProcessingStatus,
};
use crate::parser::{read_bridge_input, BridgeInput};
use crate::store::Store;
use crate::worker::ProcessingQueue;

pub const QUEUED_STEP: &str = "Queued for processing";
pub const VALIDATION_FAILED_STEP: &str = "Validation failed";

/// Largest file size a store column can hold.
pub const MAX_FILE_SIZE: u64 = i64::MAX as u64;

/// One file of an upload request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub content: String,
    /// Size in bytes as reported by the client.
    pub size: u64,
}

/// Result of accepting an upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpload {
    pub batch_job: BatchJob,
    pub job_files: Vec<BatchJobFile>,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub default_user_id: String,
    pub max_files: usize,
    pub estimated_time_secs: u32,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_user_id: config.default_user_id.clone(),
            max_files: config.processing.max_files_per_batch,
            estimated_time_secs: config.processing.estimated_time_secs,
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Turns uploads into batch jobs and hands them to the processing queue.
pub struct BatchCoordinator {
    store: Arc<dyn Store>,
    queue: Arc<ProcessingQueue>,
    settings: BatchSettings,
}

impl BatchCoordinator {
    pub fn new(store: Arc<dyn Store>, queue: Arc<ProcessingQueue>, settings: BatchSettings) -> Self {
        Self {
            store,
            queue,
            settings,
        }
    }

    /// Creates a job with one file record per upload and queues it.
    ///
    /// Files that fail to parse are recorded as failed; they never fail the
    /// request. Every record is persisted before the job is queued. If the
    /// store fails partway, the records written so far are removed again.
    pub fn upload(&self, files: Vec<UploadedFile>) -> Result<BatchUpload, BatchError> {
        if files.is_empty() || files.len() > self.settings.max_files {
            return Err(BatchError::InvalidFileCount {
                count: files.len(),
                max: self.settings.max_files,
            });
        }
        if let Some(file) = files.iter().find(|f| f.size > MAX_FILE_SIZE) {
            return Err(BatchError::InvalidFileSize {
                name: file.name.clone(),
                size: file.size,
            });
        }

        let job = self.store.create_batch_job(NewBatchJob {
            user_id: self.settings.default_user_id.clone(),
            name: format!(
                "Batch Job {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            total_files: files.len() as u32,
        })?;

        let span = info_span!("batch_upload", job_id = %job.id, files = files.len());
        let _enter = span.enter();

        let mut projects = Vec::new();
        let job_files = match self.record_files(&job, &files, &mut projects) {
            Ok(job_files) => job_files,
            Err(e) => {
                self.discard(&job.id, &projects);
                return Err(e);
            }
        };

        let batch_job = self.store.get_batch_job(&job.id)?.unwrap_or(job);
        info!(
            "Created {} with {} files ({} failed validation)",
            batch_job.name, batch_job.total_files, batch_job.failed_files
        );

        if let Err(e) = self.queue.submit(&batch_job.id) {
            warn!("Job {} was stored but not queued: {}", batch_job.id, e);
        }

        Ok(BatchUpload {
            batch_job,
            job_files,
        })
    }

    /// Queues a pending job. Returns whether it was newly queued.
    pub fn start_processing(&self, job_id: &str) -> Result<bool, BatchError> {
        let job = self
            .store
            .get_batch_job(job_id)?
            .ok_or_else(|| BatchError::JobNotFound(job_id.to_string()))?;
        if job.status != ProcessingStatus::Pending {
            return Err(BatchError::NotPending(job_id.to_string()));
        }
        Ok(self.queue.submit(job_id)?)
    }

    /// Writes one file record per upload. Ids of created projects are pushed
    /// to `projects` as they are written.
    fn record_files(
        &self,
        job: &BatchJob,
        files: &[UploadedFile],
        projects: &mut Vec<String>,
    ) -> Result<Vec<BatchJobFile>, BatchError> {
        let mut job_files = Vec::with_capacity(files.len());
        for file in files {
            let record = match read_bridge_input(&file.content) {
                Ok(input) => self.accept_file(job, file, &input, projects)?,
                Err(e) => self.reject_file(job, file, &e)?,
            };
            job_files.push(record);
        }
        Ok(job_files)
    }

    /// Removes a partially written job and the projects created for it.
    fn discard(&self, job_id: &str, projects: &[String]) {
        if let Err(e) = self.store.delete_batch_job(job_id) {
            error!("Failed to remove incomplete job {}: {}", job_id, e);
            return;
        }
        for project_id in projects {
            if let Err(e) = self.store.delete_bridge_project(project_id) {
                error!("Failed to remove project {} of job {}: {}", project_id, job_id, e);
            }
        }
        warn!("Removed incomplete job {} after a store failure", job_id);
    }

    fn accept_file(
        &self,
        job: &BatchJob,
        file: &UploadedFile,
        input: &BridgeInput,
        projects: &mut Vec<String>,
    ) -> Result<BatchJobFile, BatchError> {
        let project = self.store.create_bridge_project(NewBridgeProject {
            name: base_name(&file.name).to_string(),
            user_id: Some(self.settings.default_user_id.clone()),
            input_data: file.content.clone(),
            parameters: serde_json::to_string(input)?,
        })?;
        projects.push(project.id.clone());

        self.store
            .create_bridge_parameters(BridgeParameters::from_input(new_id(), &project.id, input))?;
        self.store.create_cross_sections(
            input
                .cross_sections
                .iter()
                .enumerate()
                .map(|(i, cs)| BridgeCrossSection {
                    id: new_id(),
                    project_id: project.id.clone(),
                    chainage: cs.chainage,
                    level: cs.level,
                    sequence: i as u32,
                })
                .collect(),
        )?;

        debug!("Accepted {} as project {}", file.name, project.id);

        Ok(self.store.create_batch_job_file(NewBatchJobFile {
            batch_job_id: job.id.clone(),
            project_id: Some(project.id),
            file_name: file.name.clone(),
            file_size: file.size,
            status: ProcessingStatus::Pending,
            progress: 0,
            error_message: None,
            current_step: Some(QUEUED_STEP.to_string()),
            estimated_time: Some(self.settings.estimated_time_secs),
        })?)
    }

    fn reject_file(
        &self,
        job: &BatchJob,
        file: &UploadedFile,
        error: &ParseError,
    ) -> Result<BatchJobFile, BatchError> {
        warn!("Rejected {}: {}", file.name, error);

        let record = self.store.create_batch_job_file(NewBatchJobFile {
            batch_job_id: job.id.clone(),
            project_id: None,
            file_name: file.name.clone(),
            file_size: file.size,
            status: ProcessingStatus::Failed,
            progress: 0,
            error_message: Some(error.to_string()),
            current_step: Some(VALIDATION_FAILED_STEP.to_string()),
            estimated_time: None,
        })?;
        self.store
            .update_batch_job(&job.id, &mut |j| j.failed_files += 1)?;
        Ok(record)
    }
}
