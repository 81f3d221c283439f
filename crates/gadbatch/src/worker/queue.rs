use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::WorkerError;
use crate::worker::processor::SimulatedProcessor;

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Runs batch jobs on a fixed set of worker tasks.
///
/// A job id is tracked from submission until its worker finishes, and
/// resubmitting it during that window is a no-op.
pub struct ProcessingQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    in_flight: InFlight,
    shutdown: Arc<AtomicBool>,
}

impl ProcessingQueue {
    /// Spawns `worker_count` workers on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0 or if called outside a tokio runtime.
    pub fn start(processor: SimulatedProcessor, worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (sender, receiver) = mpsc::unbounded_channel::<String>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let in_flight: InFlight = Arc::new(Mutex::new(HashSet::new()));

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&receiver),
                    processor.clone(),
                    Arc::clone(&in_flight),
                ))
            })
            .collect();

        info!("Started {} processing workers", worker_count);

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            in_flight,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queues a job. Returns `Ok(false)` if it is already queued or running.
    pub fn submit(&self, job_id: &str) -> Result<bool, WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        if !lock(&self.in_flight).insert(job_id.to_string()) {
            debug!("Job {} already queued", job_id);
            return Ok(false);
        }

        let sent = lock(&self.sender)
            .as_ref()
            .map(|tx| tx.send(job_id.to_string()).is_ok())
            .unwrap_or(false);
        if !sent {
            lock(&self.in_flight).remove(job_id);
            return Err(WorkerError::ChannelClosed);
        }

        debug!("Queued job {}", job_id);
        Ok(true)
    }

    /// Whether the job is queued or being processed.
    pub fn is_in_flight(&self, job_id: &str) -> bool {
        lock(&self.in_flight).contains(job_id)
    }

    /// Stops accepting jobs, lets workers drain the queue, and waits for them.
    pub async fn shutdown(&self) {
        info!("Shutting down processing queue...");
        self.shutdown.store(true, Ordering::Relaxed);
        // Dropping the sender ends each worker's recv loop once the queue is empty.
        lock(&self.sender).take();

        let workers: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("Worker {} panicked: {}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All processing workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
    processor: SimulatedProcessor,
    in_flight: InFlight,
) {
    debug!("Worker {} started", worker_id);

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(job_id) = next else {
            debug!("Worker {} job channel closed", worker_id);
            break;
        };

        debug!("Worker {} processing job {}", worker_id, job_id);
        match processor.process_job(&job_id).await {
            Ok(job) => debug!(
                "Worker {} finished job {} with status {}",
                worker_id, job_id, job.status
            ),
            Err(e) => error!("Worker {} failed job {}: {}", worker_id, job_id, e),
        }

        lock(&in_flight).remove(&job_id);
    }

    debug!("Worker {} stopped", worker_id);
}
