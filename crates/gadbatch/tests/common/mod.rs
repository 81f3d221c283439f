//! Shared test utilities for gadbatch integration tests.
//!
//! - `TestHarness` wires a store, processing queue and coordinator together
//! - builders produce parameter files and upload payloads

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
