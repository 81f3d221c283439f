pub mod processor;
pub mod queue;

pub use processor::{ProcessingStep, SimulatedProcessor, COMPLETED_STEP, STEPS};
pub use queue::ProcessingQueue;
