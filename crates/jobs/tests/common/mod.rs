//! Scripted [`JobSource`] shared by the engine tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use tokio::sync::{broadcast, Notify};

use leadconsole_client::ApiError;
use leadconsole_core::job::JobHandle;
use leadconsole_core::policy::PollPolicy;
use leadconsole_core::types::{SubjectId, Timestamp};
use leadconsole_jobs::events::JobEvent;
use leadconsole_jobs::source::{JobOutput, JobSource, RemotePhase, RemoteStatus};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted status response.
#[derive(Debug, Clone)]
pub enum Step {
    NotStarted,
    Processing,
    Completed,
    Failed(&'static str),
    Unknown,
    /// The status request itself fails.
    Unreachable,
}

/// One scripted result fetch.
#[derive(Debug, Clone)]
pub enum Fetch {
    /// A report produced this many seconds after the job started.
    Report(&'static str, i64),
    /// A report with no production time.
    Undated(&'static str),
    Empty,
    Missing,
    Unreachable,
}

pub struct FakeStatus(RemotePhase);

impl RemoteStatus for FakeStatus {
    fn phase(&self) -> RemotePhase {
        self.0.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeReport {
    pub text: String,
    pub produced_at: Option<Timestamp>,
}

impl JobOutput for FakeReport {
    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn produced_at(&self) -> Option<Timestamp> {
        self.produced_at
    }

    fn summary(&self) -> Option<String> {
        Some(self.text.clone())
    }
}

/// Replays scripted steps. When a script runs dry its last step repeats.
#[derive(Default)]
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    fetches: Mutex<VecDeque<Fetch>>,
    fail_start: AtomicBool,
    start_gate: Option<Arc<Notify>>,
    pub start_calls: AtomicU32,
    pub status_calls: AtomicU32,
    pub output_calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>, fetches: Vec<Fetch>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fetches: Mutex::new(fetches.into()),
            ..Default::default()
        }
    }

    pub fn failing_start(self) -> Self {
        self.fail_start.store(true, Ordering::SeqCst);
        self
    }

    /// Hold every start request until `gate` is notified.
    pub fn gated_start(mut self, gate: Arc<Notify>) -> Self {
        self.start_gate = Some(gate);
        self
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn starts(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn status_checks(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> u32 {
        self.output_calls.load(Ordering::SeqCst)
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl JobSource for ScriptedSource {
    type Request = Vec<String>;
    type Status = FakeStatus;
    type Output = FakeReport;

    fn kind(&self) -> &'static str {
        "fake"
    }

    fn label(&self) -> &'static str {
        "Report"
    }

    fn validate(&self, _subject_id: &SubjectId, request: &Vec<String>) -> Result<Vec<String>, String> {
        if request.is_empty() {
            return Err("no documents".to_string());
        }
        Ok(request.clone())
    }

    async fn start(
        &self,
        subject_id: &SubjectId,
        _request: &Vec<String>,
        _inputs: &[String],
    ) -> Result<Option<String>, ApiError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.start_gate {
            gate.notified().await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected("processor unavailable".to_string()));
        }
        Ok(Some(format!("job-{subject_id}")))
    }

    async fn status(&self, _handle: &JobHandle) -> Result<FakeStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let phase = match Self::next(&self.steps).unwrap_or(Step::Processing) {
            Step::NotStarted => RemotePhase::Pending,
            Step::Processing => RemotePhase::Processing,
            Step::Completed => RemotePhase::Completed,
            Step::Failed(msg) => RemotePhase::Failed(msg.to_string()),
            Step::Unknown => RemotePhase::Unrecognized,
            Step::Unreachable => {
                return Err(ApiError::ApiError {
                    status: 502,
                    body: "bad gateway".to_string(),
                })
            }
        };
        Ok(FakeStatus(phase))
    }

    async fn output(
        &self,
        handle: &JobHandle,
        _status: &FakeStatus,
    ) -> Result<Option<FakeReport>, ApiError> {
        self.output_calls.fetch_add(1, Ordering::SeqCst);
        match Self::next(&self.fetches).unwrap_or(Fetch::Missing) {
            Fetch::Report(text, offset) => Ok(Some(FakeReport {
                text: text.to_string(),
                produced_at: Some(handle.started_at + ChronoDuration::seconds(offset)),
            })),
            Fetch::Undated(text) => Ok(Some(FakeReport {
                text: text.to_string(),
                produced_at: None,
            })),
            Fetch::Empty => Ok(Some(FakeReport {
                text: String::new(),
                produced_at: Some(handle.started_at + ChronoDuration::seconds(1)),
            })),
            Fetch::Missing => Ok(None),
            Fetch::Unreachable => Err(ApiError::Malformed("truncated body".to_string())),
        }
    }
}

pub fn docs(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|d| d.to_string()).collect()
}

/// Small policy for tests that should not take 60 polls.
pub fn quick_policy(max_attempts: u32, max_transient_errors: u32) -> PollPolicy {
    PollPolicy {
        initial_delay: Duration::from_secs(1),
        interval: Duration::from_secs(1),
        max_attempts,
        max_transient_errors,
    }
}

/// Everything currently buffered on a receiver.
pub fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
