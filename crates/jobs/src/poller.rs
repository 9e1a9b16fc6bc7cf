//! Fixed-interval status polling for one accepted job.
//!
//! [`JobPoller::run`] drives a [`Job`] from `PROCESSING` to a terminal
//! state:
//!
//! - each status check counts as one attempt, successful or not;
//! - after `completed`, a second fetch must return a fresh, non-empty
//!   output before the job completes (undated outputs count as stale for
//!   sources that require a timestamp);
//! - consecutive failed checks are capped separately from the attempt
//!   budget and end in [`JobFailure::StatusUnreachable`];
//! - every sleep and request races the [`CancellationToken`].
//!
//! The guard lease is released exactly once when a terminal state is
//! reached. A cancelled run leaves the lease to its owner.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use leadconsole_core::cache::ResultCache;
use leadconsole_core::error::CoreError;
use leadconsole_core::guard::GuardLease;
use leadconsole_core::job::{Job, JobHandle};
use leadconsole_core::policy::PollPolicy;
use leadconsole_core::progress::{self, JobView};
use leadconsole_core::staleness::{self, Freshness};

use crate::events::JobEvent;
use crate::source::{JobOutput, JobSource, RemotePhase, RemoteStatus};

/// Why a job ended in `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The remote processor reported failure.
    Remote(String),
    /// Too many consecutive status checks failed.
    StatusUnreachable(String),
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobFailure::Remote(msg) => write!(f, "{msg}"),
            JobFailure::StatusUnreachable(msg) => write!(f, "error checking status: {msg}"),
        }
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<T> {
    Completed(T),
    Failed(JobFailure),
    TimedOut { attempts: u32 },
    Cancelled,
}

impl<T> JobOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

/// The job as the poller left it, plus how the loop ended.
#[derive(Debug, Clone)]
pub struct PollReport<T> {
    pub job: Job<T>,
    pub outcome: JobOutcome<T>,
}

/// Result of one status check.
enum Check<T> {
    Done(T),
    RemoteFailed(String),
    Pending(JobView),
    Stale,
    Transient(String),
}

pub struct JobPoller<S: JobSource> {
    source: Arc<S>,
    policy: PollPolicy,
    cache: ResultCache<S::Output>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl<S: JobSource> JobPoller<S> {
    pub fn new(
        source: Arc<S>,
        policy: PollPolicy,
        cache: ResultCache<S::Output>,
        event_tx: broadcast::Sender<JobEvent>,
    ) -> Self {
        Self {
            source,
            policy,
            cache,
            event_tx,
        }
    }

    /// Poll until the job is terminal or `cancel` fires.
    pub async fn run(
        &self,
        mut job: Job<S::Output>,
        lease: GuardLease,
        cancel: CancellationToken,
    ) -> PollReport<S::Output> {
        let outcome = match self.drive(&mut job, &cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    kind = self.source.kind(),
                    subject_id = %job.subject_id(),
                    error = %e,
                    "Job state conflict while polling",
                );
                JobOutcome::Failed(JobFailure::StatusUnreachable(e.to_string()))
            }
        };

        match &outcome {
            JobOutcome::Cancelled => {
                tracing::info!(
                    kind = self.source.kind(),
                    subject_id = %job.subject_id(),
                    attempts = job.attempts,
                    "Polling cancelled",
                );
                self.emit(JobEvent::Cancelled {
                    kind: self.source.kind(),
                    subject_id: job.subject_id().clone(),
                    view: progress::cancelled_view(self.source.label()),
                });
                // Dropping the lease is a no-op if the canceller already
                // released the subject.
                drop(lease);
            }
            _ => {
                lease.release();
            }
        }

        PollReport { job, outcome }
    }

    // ---- private helpers ----

    async fn drive(
        &self,
        job: &mut Job<S::Output>,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome<S::Output>, CoreError> {
        let kind = self.source.kind();
        let mut consecutive_errors = 0u32;

        if !sleep_or_cancel(self.policy.initial_delay, cancel).await {
            return Ok(JobOutcome::Cancelled);
        }

        loop {
            let attempt = job.record_attempt()?;

            let check = tokio::select! {
                _ = cancel.cancelled() => return Ok(JobOutcome::Cancelled),
                check = self.check_once(&job.handle, attempt) => check,
            };

            match check {
                Check::Done(output) => {
                    return self.finish_completed(job, output);
                }
                Check::RemoteFailed(message) => {
                    job.fail(message.clone())?;
                    tracing::error!(
                        kind,
                        subject_id = %job.subject_id(),
                        attempts = attempt,
                        error = %message,
                        "Remote job failed",
                    );
                    self.emit(JobEvent::Failed {
                        kind,
                        subject_id: job.subject_id().clone(),
                        attempts: attempt,
                        error: message.clone(),
                        view: progress::remote_failure_view(self.source.label(), &message),
                    });
                    return Ok(JobOutcome::Failed(JobFailure::Remote(message)));
                }
                Check::Pending(view) => {
                    consecutive_errors = 0;
                    tracing::debug!(kind, subject_id = %job.subject_id(), attempt, "Job still running");
                    self.emit_progress(job, attempt, view);
                }
                Check::Stale => {
                    consecutive_errors = 0;
                    tracing::debug!(
                        kind,
                        subject_id = %job.subject_id(),
                        attempt,
                        "Discarding result produced before submission",
                    );
                    let view = self.source.progress_view(&job.handle, None, attempt);
                    self.emit_progress(job, attempt, view);
                }
                Check::Transient(reason) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        kind,
                        subject_id = %job.subject_id(),
                        attempt,
                        consecutive_errors,
                        error = %reason,
                        "Status check failed",
                    );
                    if consecutive_errors >= self.policy.max_transient_errors {
                        let failure = JobFailure::StatusUnreachable(reason);
                        job.fail(failure.to_string())?;
                        tracing::error!(
                            kind,
                            subject_id = %job.subject_id(),
                            attempts = attempt,
                            "Giving up after repeated status check failures",
                        );
                        self.emit(JobEvent::Failed {
                            kind,
                            subject_id: job.subject_id().clone(),
                            attempts: attempt,
                            error: failure.to_string(),
                            view: progress::status_unreachable_view(&failure.to_string()),
                        });
                        return Ok(JobOutcome::Failed(failure));
                    }
                    let view = self.source.progress_view(&job.handle, None, attempt);
                    self.emit_progress(job, attempt, view);
                }
            }

            if attempt >= self.policy.max_attempts {
                job.time_out()?;
                tracing::error!(
                    kind,
                    subject_id = %job.subject_id(),
                    attempts = attempt,
                    elapsed_secs = job.handle.elapsed().as_secs(),
                    "Job timed out",
                );
                self.emit(JobEvent::TimedOut {
                    kind,
                    subject_id: job.subject_id().clone(),
                    attempts: attempt,
                    view: progress::timed_out_view(job.handle.elapsed(), attempt),
                });
                return Ok(JobOutcome::TimedOut { attempts: attempt });
            }

            if !sleep_or_cancel(self.policy.interval, cancel).await {
                return Ok(JobOutcome::Cancelled);
            }
        }
    }

    async fn check_once(&self, handle: &JobHandle, attempt: u32) -> Check<S::Output> {
        let status = match self.source.status(handle).await {
            Ok(status) => status,
            Err(e) => return Check::Transient(e.to_string()),
        };

        match status.phase() {
            RemotePhase::Pending | RemotePhase::Processing => {
                Check::Pending(self.source.progress_view(handle, Some(&status), attempt))
            }
            RemotePhase::Failed(message) => Check::RemoteFailed(message),
            RemotePhase::Unrecognized => Check::Transient("unrecognized status".to_string()),
            RemotePhase::Completed => match self.source.output(handle, &status).await {
                Err(e) => Check::Transient(e.to_string()),
                Ok(None) => Check::Transient("completed without a result".to_string()),
                Ok(Some(output)) if output.is_empty() => {
                    tracing::debug!(subject_id = %handle.subject_id, "Completed with an empty result");
                    Check::Transient("completed with an empty result".to_string())
                }
                Ok(Some(output)) => {
                    let freshness = if output.requires_produced_at() {
                        staleness::check_dated(output.produced_at(), handle.started_at)
                    } else {
                        staleness::check(output.produced_at(), handle.started_at)
                    };
                    match freshness {
                        Freshness::Stale => Check::Stale,
                        Freshness::Fresh | Freshness::Unchecked => Check::Done(output),
                    }
                }
            },
        }
    }

    fn finish_completed(
        &self,
        job: &mut Job<S::Output>,
        output: S::Output,
    ) -> Result<JobOutcome<S::Output>, CoreError> {
        let kind = self.source.kind();
        job.complete(output.clone())?;
        self.cache
            .set(job.subject_id().clone(), output.clone(), output.produced_at());

        tracing::info!(
            kind,
            subject_id = %job.subject_id(),
            attempts = job.attempts,
            elapsed_secs = job.handle.elapsed().as_secs(),
            "Job completed",
        );
        self.emit(JobEvent::Completed {
            kind,
            subject_id: job.subject_id().clone(),
            attempts: job.attempts,
            view: progress::completed_view(self.source.label(), output.summary()),
        });
        Ok(JobOutcome::Completed(output))
    }

    fn emit_progress(&self, job: &Job<S::Output>, attempt: u32, view: JobView) {
        self.emit(JobEvent::Progress {
            kind: self.source.kind(),
            subject_id: job.subject_id().clone(),
            attempt,
            view,
        });
    }

    fn emit(&self, event: JobEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Sleep for `delay`. Returns `false` if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
