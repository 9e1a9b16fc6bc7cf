//! Validation, guard acquisition and the single start request.

use std::sync::Arc;

use leadconsole_client::ApiError;
use leadconsole_core::cache::ResultCache;
use leadconsole_core::guard::{GuardLease, JobGuard};
use leadconsole_core::job::{Job, JobHandle};
use leadconsole_core::types::SubjectId;

use crate::source::JobSource;

/// Errors returned when a job cannot be started.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Nothing valid to submit. The guard was not touched.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A job for the subject is already being tracked.
    #[error("A job for {0} is already in progress")]
    AlreadyInProgress(SubjectId),

    /// The subject was cancelled while the start request was in flight.
    /// The remote job may exist but is not polled.
    #[error("Submission for {0} was cancelled")]
    Cancelled(SubjectId),

    /// The start request failed. The guard has been released.
    #[error("Failed to start job: {0}")]
    Remote(#[from] ApiError),
}

/// An accepted job together with the lease that keeps its subject armed.
#[derive(Debug)]
pub struct Submission<T> {
    pub job: Job<T>,
    pub lease: GuardLease,
}

/// Starts remote jobs for one [`JobSource`].
pub struct JobSubmitter<S: JobSource> {
    source: Arc<S>,
    guard: JobGuard,
    cache: ResultCache<S::Output>,
}

impl<S: JobSource> JobSubmitter<S> {
    pub fn new(source: Arc<S>, guard: JobGuard, cache: ResultCache<S::Output>) -> Self {
        Self {
            source,
            guard,
            cache,
        }
    }

    /// Validate, arm the guard, then issue one start request.
    ///
    /// On success the subject's cached result is invalidated and the
    /// returned handle carries the guard's `started_at`. On any start
    /// failure the lease is dropped, which releases the guard.
    pub async fn submit(
        &self,
        subject_id: &SubjectId,
        request: &S::Request,
    ) -> Result<Submission<S::Output>, SubmitError> {
        let kind = self.source.kind();

        if subject_id.is_blank() {
            return Err(SubmitError::Validation("subject id is required".to_string()));
        }
        let inputs = self
            .source
            .validate(subject_id, request)
            .map_err(SubmitError::Validation)?;

        let lease = self.guard.try_acquire(subject_id).ok_or_else(|| {
            tracing::debug!(kind, subject_id = %subject_id, "Duplicate submission ignored");
            SubmitError::AlreadyInProgress(subject_id.clone())
        })?;

        let job_id = match self.source.start(subject_id, request, &inputs).await {
            Ok(job_id) => job_id,
            Err(e) => {
                tracing::error!(kind, subject_id = %subject_id, error = %e, "Failed to start job");
                drop(lease);
                return Err(e.into());
            }
        };

        self.cache.invalidate(subject_id);

        tracing::info!(
            kind,
            subject_id = %subject_id,
            job_id = job_id.as_deref().unwrap_or("-"),
            inputs = inputs.len(),
            "Job submitted",
        );

        let handle = JobHandle::new(subject_id.clone(), job_id, lease.started_at());
        Ok(Submission {
            job: Job::accepted(handle, inputs),
            lease,
        })
    }

    /// Re-arm the guard for an already accepted job without resubmitting.
    pub fn rearm(&self, handle: &JobHandle) -> Result<Submission<S::Output>, SubmitError> {
        let lease = self
            .guard
            .try_acquire(&handle.subject_id)
            .ok_or_else(|| SubmitError::AlreadyInProgress(handle.subject_id.clone()))?;

        tracing::info!(
            kind = self.source.kind(),
            subject_id = %handle.subject_id,
            "Re-checking job status",
        );

        Ok(Submission {
            job: Job::accepted(handle.clone(), Vec::new()),
            lease,
        })
    }
}
