//! Asynchronous image-to-3D job pipeline.
//!
//! [`JobOrchestrator`] owns the in-memory job table, spawns one background
//! task per submission, and answers status, download and catalog queries.

pub mod orchestrator;

pub use orchestrator::{JobOrchestrator, JobStats, GENERATION_PANIC_MESSAGE, SAVE_FAILED_MESSAGE};
