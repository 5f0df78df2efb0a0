//! Job lifecycle.
//!
//! A job starts in [`JobStatus::Processing`] and moves exactly once to either
//! [`JobStatus::Completed`] or [`JobStatus::Failed`]. Both are terminal; the
//! transition methods refuse to leave them.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory record of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Blob path of the stored artifact. Only set once completed.
    pub result_ref: Option<String>,
    /// Failure description. Only set once failed.
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl Job {
    /// Create a job in the `processing` state.
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Processing,
            result_ref: None,
            error: None,
            created_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    /// Transition `processing -> completed`.
    pub fn complete(&mut self, result_ref: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_processing(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.result_ref = Some(result_ref.into());
        self.finished_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Transition `processing -> failed`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_processing(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.error = Some(message.into());
        self.finished_at = Some(chrono::Utc::now());
        Ok(())
    }

    fn ensure_processing(&self, target: JobStatus) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Job {} is already {} and cannot become {target}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}
