//! Poll loop behaviour against a scripted source, on paused time.

mod common;

use assert_matches::assert_matches;
use leadconsole_core::job::JobState;
use leadconsole_core::policy::PollPolicy;
use leadconsole_core::progress::ViewAction;
use leadconsole_core::types::SubjectId;
use leadconsole_jobs::events::JobEvent;
use leadconsole_jobs::{JobFailure, JobOutcome, JobRunner};

use common::{docs, drain, init_tracing, quick_policy, Fetch, ScriptedSource, Step};

fn subject() -> SubjectId {
    SubjectId::from("A")
}

// ---------------------------------------------------------------------------
// Test: processing x3 then completed with a fresh report
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn completes_after_processing_polls() {
    init_tracing();
    let source = ScriptedSource::new(
        vec![Step::Processing, Step::Processing, Step::Processing, Step::Completed],
        vec![Fetch::Report("cash flow ok", 22)],
    );
    let runner = JobRunner::new(source, PollPolicy::fcs());
    let mut events = runner.subscribe();
    let t0 = tokio::time::Instant::now();

    let running = runner.submit(&subject(), &docs(&["d1", "d2"])).await.unwrap();
    assert!(runner.is_active(&subject()));
    let report = running.wait().await.unwrap();

    let expected = match report.outcome {
        JobOutcome::Completed(r) => r,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(expected.text, "cash flow ok");
    assert_eq!(report.job.state, JobState::Completed);
    assert_eq!(report.job.attempts, 4);
    assert_eq!(report.job.inputs, vec!["d1", "d2"]);
    assert_eq!(t0.elapsed().as_secs(), 20);

    assert_eq!(runner.cached(&subject()), Some(expected));
    assert!(!runner.is_active(&subject()));
    assert_eq!(runner.source().status_checks(), 4);
    assert_eq!(runner.source().fetches(), 1);

    let events = drain(&mut events);
    assert_matches!(events.first(), Some(JobEvent::Submitted { .. }));
    let last = events.last().unwrap();
    assert_matches!(last, JobEvent::Completed { attempts: 4, .. });
    let view = last.view().unwrap();
    assert_eq!(view.headline, "Report ready");
    assert_eq!(view.action, Some(ViewAction::ViewResult));
}

// ---------------------------------------------------------------------------
// Test: the attempt cap forces TIMED_OUT
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn sixty_processing_polls_time_out() {
    init_tracing();
    let runner = JobRunner::new(
        ScriptedSource::new(vec![Step::Processing], vec![]),
        PollPolicy::fcs(),
    );
    let mut events = runner.subscribe();

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_matches!(report.outcome, JobOutcome::TimedOut { attempts: 60 });
    assert_eq!(report.job.state, JobState::TimedOut);
    assert_eq!(runner.source().status_checks(), 60);
    assert!(!runner.is_active(&subject()));
    assert!(runner.cached(&subject()).is_none());

    let events = drain(&mut events);
    let progress = events
        .iter()
        .filter(|e| matches!(e, JobEvent::Progress { .. }))
        .count();
    assert_eq!(progress, 60);
    let view = events.last().unwrap().view().unwrap();
    assert_eq!(view.state, JobState::TimedOut);
    assert_eq!(view.action, Some(ViewAction::CheckAgain));
}

#[tokio::test(start_paused = true)]
async fn attempt_cap_holds_while_status_is_unreachable() {
    let runner = JobRunner::new(
        ScriptedSource::new(vec![Step::Unreachable], vec![]),
        quick_policy(60, 100),
    );

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_matches!(report.outcome, JobOutcome::TimedOut { attempts: 60 });
    assert_eq!(runner.source().status_checks(), 60);
}

// ---------------------------------------------------------------------------
// Test: empty or missing payloads after "completed" keep polling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn empty_report_keeps_polling() {
    let runner = JobRunner::new(
        ScriptedSource::new(
            vec![Step::Completed],
            vec![Fetch::Empty, Fetch::Missing, Fetch::Report("final", 30)],
        ),
        PollPolicy::fcs(),
    );

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_matches!(report.outcome, JobOutcome::Completed(r) if r.text == "final");
    assert_eq!(report.job.attempts, 3);
    assert_eq!(runner.source().fetches(), 3);
}

// ---------------------------------------------------------------------------
// Test: stale results are skipped
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stale_result_is_skipped_then_fresh_completes() {
    let runner = JobRunner::new(
        ScriptedSource::new(
            vec![Step::Completed],
            vec![
                Fetch::Report("yesterday", -3600),
                Fetch::Report("same instant", 0),
                Fetch::Report("today", 12),
            ],
        ),
        PollPolicy::fcs(),
    );
    let mut events = runner.subscribe();

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_matches!(report.outcome, JobOutcome::Completed(ref r) if r.text == "today");
    assert_eq!(report.job.attempts, 3);
    assert_eq!(runner.cached(&subject()).unwrap().text, "today");

    let completed: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, JobEvent::Completed { .. }))
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(
        completed[0].view().unwrap().detail.as_deref(),
        Some("today")
    );
}

#[tokio::test(start_paused = true)]
async fn undated_result_is_accepted() {
    let runner = JobRunner::new(
        ScriptedSource::new(vec![Step::Completed], vec![Fetch::Undated("by id")]),
        PollPolicy::fcs(),
    );

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_matches!(report.outcome, JobOutcome::Completed(r) if r.produced_at.is_none());
}

// ---------------------------------------------------------------------------
// Test: remote failure vs. status unreachable
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn remote_failure_is_terminal() {
    let runner = JobRunner::new(
        ScriptedSource::new(vec![Step::NotStarted, Step::Failed("No statements found")], vec![]),
        PollPolicy::fcs(),
    );
    let mut events = runner.subscribe();

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(
        report.outcome,
        JobOutcome::Failed(JobFailure::Remote("No statements found".to_string()))
    );
    assert_eq!(report.job.error.as_deref(), Some("No statements found"));
    assert!(runner.cached(&subject()).is_none());
    assert!(!runner.is_active(&subject()));

    let view = drain(&mut events).last().unwrap().view().cloned().unwrap();
    assert_eq!(view.headline, "Report failed");
    assert_eq!(view.action, Some(ViewAction::Retry));
}

#[tokio::test(start_paused = true)]
async fn transient_cap_fails_with_status_unreachable() {
    let runner = JobRunner::new(
        ScriptedSource::new(vec![Step::Unreachable], vec![]),
        PollPolicy::fcs(),
    );
    let mut events = runner.subscribe();

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_matches!(report.outcome, JobOutcome::Failed(JobFailure::StatusUnreachable(_)));
    assert_eq!(runner.source().status_checks(), 10);
    assert!(report.job.error.unwrap().starts_with("error checking status"));
    assert!(!runner.is_active(&subject()));

    let view = drain(&mut events).last().unwrap().view().cloned().unwrap();
    assert_eq!(view.headline, "Error checking status");
    assert_eq!(view.action, Some(ViewAction::CheckAgain));
}

#[tokio::test(start_paused = true)]
async fn successful_status_resets_transient_count() {
    let mut steps = vec![Step::Unreachable; 9];
    steps.push(Step::Processing);
    steps.extend(vec![Step::Unknown; 9]);
    steps.push(Step::Completed);
    let runner = JobRunner::new(
        ScriptedSource::new(steps, vec![Fetch::Report("done", 100)]),
        PollPolicy::fcs(),
    );

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.job.attempts, 20);
}

#[tokio::test(start_paused = true)]
async fn failed_result_fetch_counts_as_transient() {
    let runner = JobRunner::new(
        ScriptedSource::new(vec![Step::Completed], vec![Fetch::Unreachable]),
        quick_policy(60, 3),
    );

    let report = runner
        .submit(&subject(), &docs(&["d1"]))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_matches!(report.outcome, JobOutcome::Failed(JobFailure::StatusUnreachable(_)));
    assert_eq!(runner.source().fetches(), 3);
}
