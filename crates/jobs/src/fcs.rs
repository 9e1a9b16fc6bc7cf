//! FCS report generation as a [`JobSource`].
//!
//! The remote tracks generation per conversation and only exposes "the
//! current report" for it, so report outputs carry `completed_at` and go
//! through the staleness check. A report without `completed_at` is never
//! accepted.

use async_trait::async_trait;
use serde::Serialize;

use leadconsole_client::messages::{FcsStatusKind, FcsStatusResponse, GenerateFcsRequest};
use leadconsole_client::{ApiError, FcsClient};
use leadconsole_core::job::JobHandle;
use leadconsole_core::policy::PollPolicy;
use leadconsole_core::types::{SubjectId, Timestamp};

use crate::runner::JobRunner;
use crate::source::{JobOutput, JobSource, RemotePhase, RemoteStatus};

/// Runner for FCS report generation.
pub type FcsReports = JobRunner<FcsSource>;

/// What the user asked to generate.
#[derive(Debug, Clone)]
pub struct FcsRequest {
    pub business_name: String,
    pub document_ids: Vec<String>,
}

/// A generated report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FcsReport {
    pub report: String,
    pub completed_at: Option<Timestamp>,
    pub business_name: Option<String>,
    pub statement_count: Option<u32>,
}

impl JobOutput for FcsReport {
    fn is_empty(&self) -> bool {
        self.report.trim().is_empty()
    }

    fn produced_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    fn requires_produced_at(&self) -> bool {
        true
    }

    fn summary(&self) -> Option<String> {
        self.statement_count.map(|n| match n {
            1 => "1 statement analyzed".to_string(),
            n => format!("{n} statements analyzed"),
        })
    }
}

impl RemoteStatus for FcsStatusResponse {
    fn phase(&self) -> RemotePhase {
        match self.status {
            FcsStatusKind::NotStarted | FcsStatusKind::NotFound => RemotePhase::Pending,
            FcsStatusKind::Processing => RemotePhase::Processing,
            FcsStatusKind::Completed => RemotePhase::Completed,
            FcsStatusKind::Failed => RemotePhase::Failed(
                self.error
                    .clone()
                    .unwrap_or_else(|| "Report generation failed".to_string()),
            ),
            FcsStatusKind::Unknown => RemotePhase::Unrecognized,
        }
    }
}

pub struct FcsSource {
    client: FcsClient,
}

impl FcsSource {
    pub fn new(client: FcsClient) -> Self {
        Self { client }
    }

    /// Runner with the default report poll policy.
    pub fn runner(client: FcsClient) -> FcsReports {
        JobRunner::new(Self::new(client), PollPolicy::fcs())
    }
}

#[async_trait]
impl JobSource for FcsSource {
    type Request = FcsRequest;
    type Status = FcsStatusResponse;
    type Output = FcsReport;

    fn kind(&self) -> &'static str {
        "fcs"
    }

    fn label(&self) -> &'static str {
        "Report"
    }

    fn validate(&self, _subject_id: &SubjectId, request: &FcsRequest) -> Result<Vec<String>, String> {
        if request.business_name.trim().is_empty() {
            return Err("business name is required".to_string());
        }
        let documents = normalize_document_ids(&request.document_ids);
        if documents.is_empty() {
            return Err("select at least one bank statement".to_string());
        }
        Ok(documents)
    }

    async fn start(
        &self,
        subject_id: &SubjectId,
        request: &FcsRequest,
        inputs: &[String],
    ) -> Result<Option<String>, ApiError> {
        let body = GenerateFcsRequest {
            business_name: request.business_name.trim().to_string(),
            document_ids: inputs.to_vec(),
        };
        self.client.generate(subject_id.as_str(), &body).await
    }

    async fn status(&self, handle: &JobHandle) -> Result<FcsStatusResponse, ApiError> {
        self.client.status(handle.subject_id.as_str()).await
    }

    async fn output(
        &self,
        handle: &JobHandle,
        _status: &FcsStatusResponse,
    ) -> Result<Option<FcsReport>, ApiError> {
        let analysis = self.client.report(handle.subject_id.as_str()).await?;
        Ok(analysis.and_then(|a| {
            a.report.map(|report| FcsReport {
                report,
                completed_at: a.completed_at,
                business_name: a.business_name,
                statement_count: a.statement_count,
            })
        }))
    }
}

/// Trim ids, drop blanks and duplicates, keep first-seen order.
fn normalize_document_ids(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        if !id.is_empty() && !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    }
    out
}
