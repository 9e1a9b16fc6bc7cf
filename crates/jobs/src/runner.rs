//! Owns the guard, cache, events and cancellation for one job flow.
//!
//! [`JobRunner`] submits through a [`JobSubmitter`] and then spawns one
//! poll task per accepted job. Each task gets a child of the runner's
//! master [`CancellationToken`], so a single subject can be cancelled
//! when its view closes and everything stops on [`JobRunner::shutdown`].
//!
//! Platform events are broadcast via a [`tokio::sync::broadcast`]
//! channel. Call [`JobRunner::subscribe`] to receive them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use leadconsole_core::cache::ResultCache;
use leadconsole_core::guard::JobGuard;
use leadconsole_core::job::JobHandle;
use leadconsole_core::policy::PollPolicy;
use leadconsole_core::types::{SubjectId, Timestamp};

use crate::events::JobEvent;
use crate::poller::{JobPoller, PollReport};
use crate::source::JobSource;
use crate::submitter::{JobSubmitter, SubmitError, Submission};

/// Broadcast channel capacity for job events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long [`JobRunner::shutdown`] waits for each poll task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A spawned poll loop.
pub struct RunningJob<T> {
    pub handle: JobHandle,
    task: JoinHandle<PollReport<T>>,
}

impl<T> RunningJob<T> {
    /// Wait for the poll loop to finish.
    pub async fn wait(self) -> Result<PollReport<T>, JoinError> {
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Bookkeeping for one active poll loop.
struct ActiveLoop {
    /// Distinguishes a loop from a later one for the same subject.
    id: u64,
    cancel: CancellationToken,
}

pub struct JobRunner<S: JobSource> {
    source: Arc<S>,
    policy: PollPolicy,
    guard: JobGuard,
    cache: ResultCache<S::Output>,
    submitter: JobSubmitter<S>,
    active: Arc<Mutex<HashMap<SubjectId, ActiveLoop>>>,
    next_loop_id: AtomicU64,
    event_tx: broadcast::Sender<JobEvent>,
    /// Master cancellation token, cancelled during shutdown.
    cancel: CancellationToken,
}

impl<S: JobSource> JobRunner<S> {
    pub fn new(source: S, policy: PollPolicy) -> Self {
        let source = Arc::new(source);
        let guard = JobGuard::new();
        let cache = ResultCache::new();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            submitter: JobSubmitter::new(Arc::clone(&source), guard.clone(), cache.clone()),
            source,
            policy,
            guard,
            cache,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_loop_id: AtomicU64::new(1),
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn guard(&self) -> &JobGuard {
        &self.guard
    }

    pub fn cache(&self) -> &ResultCache<S::Output> {
        &self.cache
    }

    /// Validate and start a job, then poll it in the background.
    pub async fn submit(
        &self,
        subject_id: &SubjectId,
        request: &S::Request,
    ) -> Result<RunningJob<S::Output>, SubmitError> {
        if self.cancel.is_cancelled() {
            return Err(SubmitError::Validation("runner is shut down".to_string()));
        }
        let submission = self.submitter.submit(subject_id, request).await?;
        let job_id = submission.job.handle.job_id.clone();
        let started_at = submission.job.handle.started_at;

        let running = self.spawn_poller(submission, self.policy)?;

        let _ = self.event_tx.send(JobEvent::Submitted {
            kind: self.source.kind(),
            subject_id: subject_id.clone(),
            job_id,
            started_at,
        });

        Ok(running)
    }

    /// Poll an existing job again with no initial delay.
    ///
    /// Used after a timeout or an unreachable status endpoint. The
    /// original `started_at` is kept for staleness checks and nothing is
    /// resubmitted.
    pub fn recheck(&self, handle: &JobHandle) -> Result<RunningJob<S::Output>, SubmitError> {
        if self.cancel.is_cancelled() {
            return Err(SubmitError::Validation("runner is shut down".to_string()));
        }
        let submission = self.submitter.rearm(handle)?;
        self.spawn_poller(submission, self.policy.immediate())
    }

    /// Stop polling a subject and release its guard immediately.
    ///
    /// A submission still waiting on its start request is cancelled too:
    /// it returns [`SubmitError::Cancelled`] instead of spawning a loop.
    /// Returns whether a poll loop or a pending submission was stopped.
    pub fn cancel(&self, subject_id: &SubjectId) -> bool {
        // Released under the `active` lock so `spawn_poller` sees either
        // the loop entry or the cleared guard, never neither.
        let mut active = self.lock_active();
        let running = active.remove(subject_id);
        let released = self.guard.release(subject_id);
        drop(active);

        match running {
            Some(running) => {
                tracing::info!(
                    kind = self.source.kind(),
                    subject_id = %subject_id,
                    "Cancelling job polling",
                );
                running.cancel.cancel();
                true
            }
            None if released => {
                tracing::info!(
                    kind = self.source.kind(),
                    subject_id = %subject_id,
                    "Cancelling pending submission",
                );
                true
            }
            None => false,
        }
    }

    /// Cached result for a subject, if any.
    pub fn cached(&self, subject_id: &SubjectId) -> Option<S::Output> {
        self.cache.get(subject_id)
    }

    /// Cached result for a subject, only if produced after `started_at`.
    pub fn cached_since(&self, subject_id: &SubjectId, started_at: Timestamp) -> Option<S::Output> {
        self.cache.get_fresh(subject_id, started_at)
    }

    pub fn is_active(&self, subject_id: &SubjectId) -> bool {
        self.guard.is_active(subject_id)
    }

    /// Cancel every poll loop and wait briefly for each to exit.
    pub async fn shutdown(&self) {
        tracing::info!(kind = self.source.kind(), "Shutting down job runner");
        self.cancel.cancel();

        let drained: Vec<(SubjectId, ActiveLoop)> = self.lock_active().drain().collect();
        for (subject_id, active) in drained {
            tracing::debug!(subject_id = %subject_id, "Stopping poll task");
            active.cancel.cancel();
        }

        // Give the tasks a moment to observe cancellation and drop leases.
        let deadline = tokio::time::Instant::now() + SHUTDOWN_TIMEOUT;
        while self.guard.active_count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tracing::info!(kind = self.source.kind(), "Job runner shut down complete");
    }

    // ---- private helpers ----

    /// Register and spawn the poll loop for an armed submission.
    ///
    /// Refuses when the lease was cleared in the meantime (the subject
    /// was cancelled while the start request was in flight) or when a
    /// live loop is already registered for the subject.
    fn spawn_poller(
        &self,
        submission: Submission<S::Output>,
        policy: PollPolicy,
    ) -> Result<RunningJob<S::Output>, SubmitError> {
        let Submission { job, lease } = submission;
        let handle = job.handle.clone();
        let subject_id = handle.subject_id.clone();
        let kind = self.source.kind();

        let loop_id = self.next_loop_id.fetch_add(1, Ordering::Relaxed);
        let loop_cancel = self.cancel.child_token();
        {
            let mut active = self.lock_active();
            if !lease.is_held() || self.cancel.is_cancelled() {
                tracing::info!(kind, subject_id = %subject_id, "Submission cancelled before polling started");
                return Err(SubmitError::Cancelled(subject_id));
            }
            if active
                .get(&subject_id)
                .is_some_and(|a| !a.cancel.is_cancelled())
            {
                tracing::warn!(kind, subject_id = %subject_id, "Poll loop already registered");
                return Err(SubmitError::AlreadyInProgress(subject_id));
            }
            active.insert(
                subject_id.clone(),
                ActiveLoop {
                    id: loop_id,
                    cancel: loop_cancel.clone(),
                },
            );
        }

        let poller = JobPoller::new(
            Arc::clone(&self.source),
            policy,
            self.cache.clone(),
            self.event_tx.clone(),
        );
        let active = Arc::clone(&self.active);

        let task = tokio::spawn(async move {
            tracing::debug!(kind, subject_id = %subject_id, "Starting poll task");
            let report = poller.run(job, lease, loop_cancel).await;

            let mut active = active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.get(&subject_id).is_some_and(|a| a.id == loop_id) {
                active.remove(&subject_id);
            }
            drop(active);

            tracing::debug!(kind, subject_id = %subject_id, "Poll task exited");
            report
        });

        Ok(RunningJob { handle, task })
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashMap<SubjectId, ActiveLoop>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
