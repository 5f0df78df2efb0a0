//! Event logging service.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and writes every received [`PipelineEvent`] to the
//! tracing log. It runs as a long-lived background task and shuts down
//! gracefully when the bus sender is dropped.

use tokio::sync::broadcast;

use crate::bus::{PipelineEvent, PipelineEventKind};

/// Background service that logs pipeline events.
pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the bus is dropped.
    ///
    /// Returns the number of events logged.
    pub async fn run(mut receiver: broadcast::Receiver<PipelineEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::log(&event);
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
        logged
    }

    fn log(event: &PipelineEvent) {
        let event_type = event.event_type();
        match &event.kind {
            PipelineEventKind::Submitted => {
                tracing::info!(job_id = %event.job_id, event_type, "Job submitted");
            }
            PipelineEventKind::Completed { result_ref } => {
                tracing::info!(job_id = %event.job_id, event_type, result_ref = %result_ref, "Job completed");
            }
            PipelineEventKind::Failed { error } => {
                tracing::warn!(job_id = %event.job_id, event_type, error = %error, "Job failed");
            }
            PipelineEventKind::CatalogAppendFailed { error } => {
                tracing::warn!(
                    job_id = %event.job_id,
                    event_type,
                    error = %error,
                    "Model saved but not catalogued; it stays downloadable but is missing from listings"
                );
            }
        }
    }
}
