//! Simulated drawing generation.
//!
//! Each pending file walks through a fixed list of timed steps. No drawing
//! is computed; the steps only move the file's progress forward.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::broadcast::FileProgressBroadcaster;
use crate::error::WorkerError;
use crate::model::{BatchJob, BatchJobFile, ProcessingStatus};
use crate::store::Store;

/// One stage of simulated generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStep {
    pub name: &'static str,
    /// Progress reached once the step is done.
    pub progress: u8,
    pub delay_ms: u64,
}

pub const STEPS: [ProcessingStep; 5] = [
    ProcessingStep {
        name: "Parsing bridge parameters",
        progress: 20,
        delay_ms: 1000,
    },
    ProcessingStep {
        name: "Calculating coordinates",
        progress: 40,
        delay_ms: 1500,
    },
    ProcessingStep {
        name: "Generating plan view",
        progress: 60,
        delay_ms: 2000,
    },
    ProcessingStep {
        name: "Generating elevation views",
        progress: 80,
        delay_ms: 1500,
    },
    ProcessingStep {
        name: "Exporting files",
        progress: 100,
        delay_ms: 1000,
    },
];

pub const COMPLETED_STEP: &str = "Generation completed";

#[derive(Clone)]
pub struct SimulatedProcessor {
    store: Arc<dyn Store>,
    progress: FileProgressBroadcaster,
    /// Multiplier applied to every step delay. Zero disables sleeping.
    time_scale: f64,
}

impl SimulatedProcessor {
    pub fn new(store: Arc<dyn Store>, progress: FileProgressBroadcaster, time_scale: f64) -> Self {
        Self {
            store,
            progress,
            time_scale: time_scale.max(0.0),
        }
    }

    pub fn progress(&self) -> &FileProgressBroadcaster {
        &self.progress
    }

    /// Runs every pending file of the job and returns the job's final state.
    ///
    /// A job without pending files is returned untouched.
    pub async fn process_job(&self, job_id: &str) -> Result<BatchJob, WorkerError> {
        let job = self
            .store
            .get_batch_job(job_id)?
            .ok_or_else(|| WorkerError::JobNotFound(job_id.to_string()))?;

        let pending: Vec<BatchJobFile> = self
            .store
            .list_batch_job_files(job_id)?
            .into_iter()
            .filter(|f| f.status == ProcessingStatus::Pending)
            .collect();

        if pending.is_empty() {
            debug!("Job {} has no pending files", job_id);
            return Ok(job);
        }

        self.update_job(job_id, &mut |job| {
            job.advance_status(ProcessingStatus::Processing);
        })?;
        info!("Processing job {} ({} pending files)", job_id, pending.len());

        for file in &pending {
            let span = info_span!("process_file", job_id = %job_id, file = %file.file_name);
            if let Err(e) = self.process_file(file).instrument(span).await {
                warn!("File {} failed: {}", file.file_name, e);
                self.fail_file(file, &e.to_string())?;
            }
            self.refresh_processed_count(job_id)?;
        }

        self.finish_job(job_id)
    }

    async fn process_file(&self, file: &BatchJobFile) -> Result<(), WorkerError> {
        self.update_file(&file.id, &mut |f| {
            f.status = ProcessingStatus::Processing;
            f.progress = 0;
            f.current_step = Some(STEPS[0].name.to_string());
            f.started_at = Some(Utc::now());
        })?;

        for step in &STEPS {
            self.pause(step.delay_ms).await;
            debug!("{}: {}", file.file_name, step.name);
            self.update_file(&file.id, &mut |f| {
                f.current_step = Some(step.name.to_string());
                f.progress = step.progress;
            })?;
        }

        self.update_file(&file.id, &mut |f| {
            f.status = ProcessingStatus::Completed;
            f.progress = 100;
            f.current_step = Some(COMPLETED_STEP.to_string());
            f.completed_at = Some(Utc::now());
        })?;
        info!("Completed {}", file.file_name);
        Ok(())
    }

    async fn pause(&self, delay_ms: u64) {
        if self.time_scale > 0.0 {
            let secs = delay_ms as f64 / 1000.0 * self.time_scale;
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }

    fn fail_file(&self, file: &BatchJobFile, message: &str) -> Result<(), WorkerError> {
        self.update_file(&file.id, &mut |f| {
            f.status = ProcessingStatus::Failed;
            f.error_message = Some(message.to_string());
            f.completed_at = Some(Utc::now());
        })?;
        self.update_job(&file.batch_job_id, &mut |job| job.failed_files += 1)?;
        Ok(())
    }

    /// processedFiles counts every finished file, failed ones included.
    fn refresh_processed_count(&self, job_id: &str) -> Result<(), WorkerError> {
        let finished = self
            .store
            .list_batch_job_files(job_id)?
            .iter()
            .filter(|f| f.status.is_finished())
            .count() as u32;
        self.update_job(job_id, &mut |job| job.processed_files = finished)?;
        Ok(())
    }

    fn finish_job(&self, job_id: &str) -> Result<BatchJob, WorkerError> {
        let files = self.store.list_batch_job_files(job_id)?;
        let all_finished = files.iter().all(|f| f.status.is_finished());

        let job = self.update_job(job_id, &mut |job| {
            if all_finished && job.advance_status(ProcessingStatus::Completed) {
                job.completed_at = Some(Utc::now());
            }
        })?;
        if job.status == ProcessingStatus::Completed {
            info!(
                "Job {} completed ({} processed, {} failed)",
                job_id, job.processed_files, job.failed_files
            );
        }
        Ok(job)
    }

    fn update_job(
        &self,
        job_id: &str,
        f: &mut dyn FnMut(&mut BatchJob),
    ) -> Result<BatchJob, WorkerError> {
        self.store
            .update_batch_job(job_id, f)?
            .ok_or_else(|| WorkerError::JobNotFound(job_id.to_string()))
    }

    fn update_file(
        &self,
        file_id: &str,
        f: &mut dyn FnMut(&mut BatchJobFile),
    ) -> Result<(), WorkerError> {
        let file = self
            .store
            .update_batch_job_file(file_id, f)?
            .ok_or_else(|| WorkerError::JobFailed(format!("file {} disappeared", file_id)))?;
        self.progress.publish(&file);
        Ok(())
    }
}
