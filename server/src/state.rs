use std::sync::Arc;

use gadbatch::{
    BatchCoordinator, BatchSettings, Config, FileProgressBroadcaster, ProcessingQueue,
    SimulatedProcessor, Store,
};

/// Shared by every handler.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub coordinator: BatchCoordinator,
    pub queue: Arc<ProcessingQueue>,
    pub progress: FileProgressBroadcaster,
    pub default_user_id: String,
}

impl AppState {
    /// Wires the processor, queue and coordinator around `store`.
    ///
    /// Spawns the queue workers, so this must run inside a tokio runtime.
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        let progress = FileProgressBroadcaster::default();
        let processor = SimulatedProcessor::new(
            store.clone(),
            progress.clone(),
            config.processing.time_scale,
        );
        let queue = Arc::new(ProcessingQueue::start(
            processor,
            config.processing.worker_count,
        ));
        let coordinator = BatchCoordinator::new(
            store.clone(),
            queue.clone(),
            BatchSettings::from_config(config),
        );

        Self {
            store,
            coordinator,
            queue,
            progress,
            default_user_id: config.default_user_id.clone(),
        }
    }
}
