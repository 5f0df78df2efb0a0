//! Pipeline event bus and its logging subscriber.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`]: what happened to which job.
//! - [`EventLogger`]: background service that writes every event to the
//!   tracing log. It is the place where best-effort failures, such as a
//!   catalog append that did not stick, become visible to operators.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, PipelineEvent, PipelineEventKind};
pub use logger::EventLogger;
