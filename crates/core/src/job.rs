//! Job state model.
//!
//! A [`Job`] is one remote generation request as seen from the console.
//! It is owned by the poller that created it; transitions are checked so
//! a terminal job can never be moved again.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{SubjectId, Timestamp};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    NotStarted,
    Processing,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::NotStarted => "NOT_STARTED",
            JobState::Processing => "PROCESSING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::TimedOut => "TIMED_OUT",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::TimedOut
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies an accepted job.
///
/// `started_at` is captured locally when the guard is armed and is the
/// only clock trusted for staleness checks. `started` is the monotonic
/// twin used for elapsed-time rendering.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub subject_id: SubjectId,
    /// Opaque id returned by the remote, when it issues one.
    pub job_id: Option<String>,
    pub started_at: Timestamp,
    pub started: tokio::time::Instant,
}

impl JobHandle {
    pub fn new(subject_id: SubjectId, job_id: Option<String>, started_at: Timestamp) -> Self {
        Self {
            subject_id,
            job_id,
            started_at,
            started: tokio::time::Instant::now(),
        }
    }

    /// Time since submission on the monotonic clock.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

/// One remote generation request and its local bookkeeping.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub handle: JobHandle,
    /// Document or record identifiers that were submitted.
    pub inputs: Vec<String>,
    pub state: JobState,
    /// Status checks performed so far.
    pub attempts: u32,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> Job<T> {
    /// A freshly accepted job. Submission already succeeded, so the job
    /// starts in [`JobState::Processing`].
    pub fn accepted(handle: JobHandle, inputs: Vec<String>) -> Self {
        Self {
            handle,
            inputs,
            state: JobState::Processing,
            attempts: 0,
            result: None,
            error: None,
        }
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.handle.subject_id
    }

    /// Count one status check. Returns the new attempt total.
    pub fn record_attempt(&mut self) -> Result<u32, CoreError> {
        self.ensure_open("record an attempt")?;
        self.attempts += 1;
        Ok(self.attempts)
    }

    pub fn complete(&mut self, result: T) -> Result<(), CoreError> {
        self.ensure_open("complete")?;
        self.state = JobState::Completed;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_open("fail")?;
        self.state = JobState::Failed;
        self.error = Some(error.into());
        Ok(())
    }

    pub fn time_out(&mut self) -> Result<(), CoreError> {
        self.ensure_open("time out")?;
        self.state = JobState::TimedOut;
        self.error = Some(format!(
            "No result after {} status checks",
            self.attempts
        ));
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> Result<(), CoreError> {
        if self.state.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Cannot {action}: job for {} is already {}",
                self.handle.subject_id, self.state
            )));
        }
        Ok(())
    }
}
