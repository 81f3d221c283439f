mod error;
mod routes;
mod state;
mod tracing_support;

use std::error::Error;
use std::sync::Arc;

use gadbatch::config;
use gadbatch::model::ProcessingStatus;
use gadbatch::{FileProgressBroadcaster, Store};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = config::load()?;
    tracing_support::initialize_tracing(config.log_format)?;

    info!("Starting gadbatch-server v{}", env!("CARGO_PKG_VERSION"));

    let store = gadbatch::open_store(&config.storage)?;
    store.ensure_user(&config.default_user_id, &config.default_user_id)?;
    report_interrupted_jobs(store.as_ref());

    let state = Arc::new(AppState::new(store, &config));
    info!(
        "Processing queue started with {} workers (time scale {})",
        config.processing.worker_count, config.processing.time_scale
    );
    spawn_progress_logger(&state.progress);

    let app = routes::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for running jobs to finish");
    state.queue.shutdown().await;
    Ok(())
}

/// Jobs left in `processing` by a previous run are not resumed.
fn report_interrupted_jobs(store: &dyn Store) {
    match store.list_batch_jobs_by_status(ProcessingStatus::Processing) {
        Ok(jobs) => {
            for job in jobs {
                warn!(
                    "Job {} ({}) was interrupted after {}/{} files",
                    job.id, job.name, job.processed_files, job.total_files
                );
            }
        }
        Err(e) => warn!("Could not check for interrupted jobs: {}", e),
    }
}

fn spawn_progress_logger(progress: &FileProgressBroadcaster) {
    let mut rx = progress.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => debug!(
                    job_id = %event.job_id,
                    file = %event.file_name,
                    status = %event.status,
                    progress = event.progress,
                    "{}",
                    event.current_step.as_deref().unwrap_or("")
                ),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Progress logger skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
