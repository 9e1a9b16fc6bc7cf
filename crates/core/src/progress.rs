//! Human-readable progress rendering.
//!
//! Every function here is pure: the same inputs always produce the same
//! [`JobView`], so a view can be re-rendered as often as the UI likes
//! without accumulating state.

use std::time::Duration;

use serde::Serialize;

use crate::job::JobState;

/// Report generation is considered "initializing" below this elapsed time.
pub const PHASE_INITIALIZING_SECS: u64 = 5;

/// Upper bound of the "extracting" phase.
pub const PHASE_EXTRACTING_SECS: u64 = 20;

/// Upper bound of the "analyzing" phase.
pub const PHASE_ANALYZING_SECS: u64 = 40;

/// Coarse phase of a running report generation, inferred from elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Initializing,
    Extracting,
    Analyzing,
    StillProcessing,
}

impl ProgressPhase {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        match elapsed.as_secs() {
            s if s < PHASE_INITIALIZING_SECS => ProgressPhase::Initializing,
            s if s < PHASE_EXTRACTING_SECS => ProgressPhase::Extracting,
            s if s < PHASE_ANALYZING_SECS => ProgressPhase::Analyzing,
            _ => ProgressPhase::StillProcessing,
        }
    }
}

/// Follow-up the UI should offer next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewAction {
    /// Poll the existing job again without resubmitting.
    CheckAgain,
    /// Re-open the submission flow.
    Retry,
    /// Show the finished result.
    ViewResult,
}

/// Everything the UI needs to render one job's status panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub state: JobState,
    pub headline: String,
    pub detail: Option<String>,
    /// Completion percentage when the remote reports one.
    pub percent: Option<u8>,
    pub action: Option<ViewAction>,
}

/// Progress text for a running report generation.
pub fn progress_message(elapsed: Duration, poll_count: u32) -> String {
    if poll_count == 0 {
        return "Starting report generation...".to_string();
    }
    match ProgressPhase::from_elapsed(elapsed) {
        ProgressPhase::Initializing => "Initializing report generation...".to_string(),
        ProgressPhase::Extracting => "Extracting data from bank statements...".to_string(),
        ProgressPhase::Analyzing => "Analyzing financial data...".to_string(),
        ProgressPhase::StillProcessing => {
            format!("Still processing... ({}s elapsed)", elapsed.as_secs())
        }
    }
}

/// View for a report generation that has not reached a terminal state.
pub fn processing_view(elapsed: Duration, poll_count: u32) -> JobView {
    let detail = if poll_count == 0 {
        "Waiting for the processor to pick up the documents".to_string()
    } else {
        format!("Status check {poll_count}")
    };
    JobView {
        state: JobState::Processing,
        headline: progress_message(elapsed, poll_count),
        detail: Some(detail),
        percent: None,
        action: None,
    }
}

/// View for a running bulk import.
///
/// `percent` from the remote wins; otherwise it is derived from the row
/// counts.
pub fn import_view(processed_rows: u64, total_rows: u64, percent: Option<u8>) -> JobView {
    let percent = percent
        .map(|p| p.min(100))
        .or_else(|| row_percent(processed_rows, total_rows));
    let headline = match (total_rows, percent) {
        (0, _) => "Preparing import...".to_string(),
        (total, Some(p)) => format!("Processed {processed_rows} of {total} rows ({p}%)"),
        (total, None) => format!("Processed {processed_rows} of {total} rows"),
    };
    JobView {
        state: JobState::Processing,
        headline,
        detail: None,
        percent,
        action: None,
    }
}

/// `label` names the job for the user, e.g. "Report" or "Import".
pub fn completed_view(label: &str, summary: Option<String>) -> JobView {
    JobView {
        state: JobState::Completed,
        headline: format!("{label} ready"),
        detail: summary,
        percent: Some(100),
        action: Some(ViewAction::ViewResult),
    }
}

/// The remote processor reported the job as failed.
pub fn remote_failure_view(label: &str, message: &str) -> JobView {
    JobView {
        state: JobState::Failed,
        headline: format!("{label} failed"),
        detail: Some(message.to_string()),
        percent: None,
        action: Some(ViewAction::Retry),
    }
}

/// The status endpoint could not be read often enough to decide.
pub fn status_unreachable_view(message: &str) -> JobView {
    JobView {
        state: JobState::Failed,
        headline: "Error checking status".to_string(),
        detail: Some(message.to_string()),
        percent: None,
        action: Some(ViewAction::CheckAgain),
    }
}

/// Poll budget exhausted. The remote may still finish later.
pub fn timed_out_view(elapsed: Duration, attempts: u32) -> JobView {
    JobView {
        state: JobState::TimedOut,
        headline: "Still processing in the background".to_string(),
        detail: Some(format!(
            "No result after {attempts} checks ({}s). Check again in a few minutes.",
            elapsed.as_secs()
        )),
        percent: None,
        action: Some(ViewAction::CheckAgain),
    }
}

pub fn cancelled_view(label: &str) -> JobView {
    JobView {
        state: JobState::NotStarted,
        headline: format!("{label} cancelled"),
        detail: None,
        percent: None,
        action: Some(ViewAction::Retry),
    }
}

fn row_percent(processed: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = (processed.min(total) as f64 / total as f64 * 100.0).round() as u8;
    Some(pct)
}
