//! Test harness for running uploads through the full processing path.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use gadbatch::batch::{BatchCoordinator, BatchSettings, BatchUpload, UploadedFile};
use gadbatch::model::{BatchJob, BatchJobFile, ProcessingStatus};
use gadbatch::{FileProgressBroadcaster, MemoryStore, ProcessingQueue, SimulatedProcessor, SqliteStore, Store};

pub const DEFAULT_USER: &str = "dummy-user";

pub struct TestHarness {
    pub store: Arc<dyn Store>,
    pub progress: FileProgressBroadcaster,
    pub queue: Arc<ProcessingQueue>,
    pub coordinator: BatchCoordinator,
    /// Keeps the SQLite file alive for the harness lifetime.
    temp_dir: Option<TempDir>,
}

impl TestHarness {
    /// Memory store, zero step delays, two workers. Must run inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), None)
    }

    /// SQLite store in a fresh temp directory.
    pub fn sqlite() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SqliteStore::open(&temp_dir.path().join("gadbatch.db"))
            .expect("Failed to open SQLite store");
        Self::with_store(Arc::new(store), Some(temp_dir))
    }

    fn with_store(store: Arc<dyn Store>, temp_dir: Option<TempDir>) -> Self {
        store
            .ensure_user(DEFAULT_USER, "dummy")
            .expect("Failed to create default user");

        let progress = FileProgressBroadcaster::new(1024);
        let processor = SimulatedProcessor::new(store.clone(), progress.clone(), 0.0);
        let queue = Arc::new(ProcessingQueue::start(processor, 2));
        let coordinator = BatchCoordinator::new(
            store.clone(),
            queue.clone(),
            BatchSettings {
                default_user_id: DEFAULT_USER.to_string(),
                max_files: 20,
                estimated_time_secs: 180,
            },
        );

        Self {
            store,
            progress,
            queue,
            coordinator,
            temp_dir,
        }
    }

    pub fn upload(&self, files: Vec<UploadedFile>) -> BatchUpload {
        self.coordinator.upload(files).expect("Upload failed")
    }

    pub fn job(&self, id: &str) -> BatchJob {
        self.store
            .get_batch_job(id)
            .expect("Store error")
            .expect("Job not found")
    }

    pub fn files(&self, job_id: &str) -> Vec<BatchJobFile> {
        self.store.list_batch_job_files(job_id).expect("Store error")
    }

    /// Polls until the job reaches `status`, panicking after five seconds.
    pub async fn wait_for_status(&self, job_id: &str, status: ProcessingStatus) -> BatchJob {
        let poll = async {
            loop {
                let job = self.job(job_id);
                if job.status == status {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), poll)
            .await
            .unwrap_or_else(|_| panic!("Job {} never reached {}", job_id, status))
    }

    /// Drains the queue so every submitted job has run to the end.
    pub async fn drain(&self) {
        self.queue.shutdown().await;
    }
}
