//! Message type constants for job lifecycle events.
//!
//! Carried in the `type` field of serialized job events so that UI
//! listeners can switch on a stable string.

/// A job was accepted by the remote processor.
pub const MSG_TYPE_JOB_SUBMITTED: &str = "job_submitted";

/// A poll returned without reaching a terminal state.
pub const MSG_TYPE_JOB_PROGRESS: &str = "job_progress";

/// Job completed successfully and its result was cached.
pub const MSG_TYPE_JOB_COMPLETED: &str = "job_completed";

/// Job failed, either remotely or because status could not be read.
pub const MSG_TYPE_JOB_FAILED: &str = "job_failed";

/// Poll budget exhausted while the remote still reported work in flight.
pub const MSG_TYPE_JOB_TIMED_OUT: &str = "job_timed_out";

/// Polling was cancelled locally (view closed, subject switched).
pub const MSG_TYPE_JOB_CANCELLED: &str = "job_cancelled";
