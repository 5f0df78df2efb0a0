//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is designed to be shared via `Arc<EventBus>` between the
//! orchestrator and any number of subscribers.

use assetter_core::types::{JobId, Timestamp};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// What happened to a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEventKind {
    /// The job was accepted and its background task spawned.
    Submitted,

    /// The artifact was stored and the job completed.
    Completed { result_ref: String },

    /// The job reached the failed state.
    Failed { error: String },

    /// The artifact was stored but the catalog append failed. The job still
    /// completes; the model is downloadable but missing from listings.
    CatalogAppendFailed { error: String },
}

/// A job-scoped event with the time it was published.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    pub job_id: JobId,
    #[serde(flatten)]
    pub kind: PipelineEventKind,
    pub timestamp: Timestamp,
}

impl PipelineEvent {
    pub fn new(job_id: JobId, kind: PipelineEventKind) -> Self {
        Self {
            job_id,
            kind,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Dot-separated event name, e.g. `"job.completed"`.
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            PipelineEventKind::Submitted => "job.submitted",
            PipelineEventKind::Completed { .. } => "job.completed",
            PipelineEventKind::Failed { .. } => "job.failed",
            PipelineEventKind::CatalogAppendFailed { .. } => "catalog.append_failed",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use assetter_core::types::JobId;
/// use assetter_events::bus::{EventBus, PipelineEvent, PipelineEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PipelineEvent::new(JobId::generate(), PipelineEventKind::Submitted));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: PipelineEvent) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
