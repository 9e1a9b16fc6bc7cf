//! Platform events emitted by the job runners.
//!
//! Every event carries a rendered [`JobView`] so a listener can update
//! the UI without re-deriving anything. Subscribe through
//! [`crate::runner::JobRunner::subscribe`].

use serde::Serialize;
use leadconsole_core::job_events::{
    MSG_TYPE_JOB_CANCELLED, MSG_TYPE_JOB_COMPLETED, MSG_TYPE_JOB_FAILED, MSG_TYPE_JOB_PROGRESS,
    MSG_TYPE_JOB_SUBMITTED, MSG_TYPE_JOB_TIMED_OUT,
};
use leadconsole_core::progress::JobView;
use leadconsole_core::types::{SubjectId, Timestamp};

/// A lifecycle event for one subject's job.
#[derive(Debug, Clone, Serialize)]
pub enum JobEvent {
    /// The remote accepted the start request and polling is scheduled.
    Submitted {
        kind: &'static str,
        subject_id: SubjectId,
        job_id: Option<String>,
        started_at: Timestamp,
    },

    /// A status check finished without reaching a terminal state.
    Progress {
        kind: &'static str,
        subject_id: SubjectId,
        attempt: u32,
        view: JobView,
    },

    /// A fresh, non-empty result was fetched and cached.
    Completed {
        kind: &'static str,
        subject_id: SubjectId,
        attempts: u32,
        view: JobView,
    },

    /// The remote reported failure or the status could not be read.
    Failed {
        kind: &'static str,
        subject_id: SubjectId,
        attempts: u32,
        error: String,
        view: JobView,
    },

    /// The poll budget ran out.
    TimedOut {
        kind: &'static str,
        subject_id: SubjectId,
        attempts: u32,
        view: JobView,
    },

    /// Polling stopped locally before a terminal state.
    Cancelled {
        kind: &'static str,
        subject_id: SubjectId,
        view: JobView,
    },
}

impl JobEvent {
    pub fn subject_id(&self) -> &SubjectId {
        match self {
            JobEvent::Submitted { subject_id, .. }
            | JobEvent::Progress { subject_id, .. }
            | JobEvent::Completed { subject_id, .. }
            | JobEvent::Failed { subject_id, .. }
            | JobEvent::TimedOut { subject_id, .. }
            | JobEvent::Cancelled { subject_id, .. } => subject_id,
        }
    }

    /// The view to render, if the event carries one.
    pub fn view(&self) -> Option<&JobView> {
        match self {
            JobEvent::Submitted { .. } => None,
            JobEvent::Progress { view, .. }
            | JobEvent::Completed { view, .. }
            | JobEvent::Failed { view, .. }
            | JobEvent::TimedOut { view, .. }
            | JobEvent::Cancelled { view, .. } => Some(view),
        }
    }

    /// Stable message type for UI listeners.
    pub fn message_type(&self) -> &'static str {
        match self {
            JobEvent::Submitted { .. } => MSG_TYPE_JOB_SUBMITTED,
            JobEvent::Progress { .. } => MSG_TYPE_JOB_PROGRESS,
            JobEvent::Completed { .. } => MSG_TYPE_JOB_COMPLETED,
            JobEvent::Failed { .. } => MSG_TYPE_JOB_FAILED,
            JobEvent::TimedOut { .. } => MSG_TYPE_JOB_TIMED_OUT,
            JobEvent::Cancelled { .. } => MSG_TYPE_JOB_CANCELLED,
        }
    }

    /// Serialize as `{ "type": ..., "data": ... }`.
    pub fn to_message(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.message_type(),
            "data": self,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Completed { .. } | JobEvent::Failed { .. } | JobEvent::TimedOut { .. }
        )
    }
}
