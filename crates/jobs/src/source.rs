//! The seam between the generic poll engine and a concrete remote flow.
//!
//! A [`JobSource`] knows how to validate a request, start the remote
//! job, read its status and fetch its output. Everything else (guard,
//! cache, staleness, timing, cancellation) is handled by the engine.

use async_trait::async_trait;
use leadconsole_client::ApiError;
use leadconsole_core::job::JobHandle;
use leadconsole_core::progress::{self, JobView};
use leadconsole_core::types::{SubjectId, Timestamp};

/// Remote status reduced to what the poller needs to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemotePhase {
    /// Accepted but not picked up yet (`not_started`, `not_found`, `queued`).
    Pending,
    Processing,
    Completed,
    /// The remote gave up. Carries its message.
    Failed(String),
    /// A status string this build does not know. Treated as transient.
    Unrecognized,
}

/// A parsed status response.
pub trait RemoteStatus {
    fn phase(&self) -> RemotePhase;
}

/// A fetched result payload.
pub trait JobOutput {
    /// An empty payload after `completed` is treated as not ready yet.
    fn is_empty(&self) -> bool;

    /// Remote production time, for sources that can only return "the
    /// current result for a subject". `None` skips the staleness check
    /// unless [`requires_produced_at`](Self::requires_produced_at) is set.
    fn produced_at(&self) -> Option<Timestamp>;

    /// Whether an output without `produced_at` must be treated as stale.
    fn requires_produced_at(&self) -> bool {
        false
    }

    /// One-line description shown next to the completed view.
    fn summary(&self) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait JobSource: Send + Sync + 'static {
    type Request: Send + Sync;
    type Status: RemoteStatus + Send + Sync;
    type Output: JobOutput + Clone + Send + Sync + 'static;

    /// Short name used in logs and events, e.g. `fcs`.
    fn kind(&self) -> &'static str;

    /// User-facing noun, e.g. "Report".
    fn label(&self) -> &'static str;

    /// Check a request before anything is armed. Returns the normalized
    /// input ids recorded on the job.
    fn validate(
        &self,
        subject_id: &SubjectId,
        request: &Self::Request,
    ) -> Result<Vec<String>, String>;

    /// Issue the single outbound start request. Returns the remote job id
    /// when one is issued.
    async fn start(
        &self,
        subject_id: &SubjectId,
        request: &Self::Request,
        inputs: &[String],
    ) -> Result<Option<String>, ApiError>;

    async fn status(&self, handle: &JobHandle) -> Result<Self::Status, ApiError>;

    /// Fetch the result after the status reported `completed`. `Ok(None)`
    /// means the remote has nothing to return yet.
    async fn output(
        &self,
        handle: &JobHandle,
        status: &Self::Status,
    ) -> Result<Option<Self::Output>, ApiError>;

    /// View for a non-terminal poll. `status` is `None` when the last
    /// check did not produce a usable status.
    fn progress_view(
        &self,
        handle: &JobHandle,
        _status: Option<&Self::Status>,
        attempts: u32,
    ) -> JobView {
        progress::processing_view(handle.elapsed(), attempts)
    }
}
