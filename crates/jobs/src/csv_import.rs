//! Bulk CSV import as a [`JobSource`].
//!
//! The subject is the import id returned by the upload. Status is read
//! by that id, so outputs need no staleness check. Starting a job saves
//! the column mapping and then kicks off the import.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use leadconsole_client::csv_import::UploadedFile;
use leadconsole_client::messages::{ImportStatusKind, ImportStatusResponse};
use leadconsole_client::{ApiError, CsvImportClient};
use leadconsole_core::job::JobHandle;
use leadconsole_core::policy::PollPolicy;
use leadconsole_core::progress::{self, JobView};
use leadconsole_core::types::{SubjectId, Timestamp};

use crate::runner::JobRunner;
use crate::source::{JobOutput, JobSource, RemotePhase, RemoteStatus};

/// Runner for bulk CSV imports.
pub type CsvImports = JobRunner<CsvImportSource>;

/// Column mapping for an uploaded file: CSV header → lead field.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub column_mapping: BTreeMap<String, String>,
}

/// Final counts of a finished import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub total_rows: u64,
    pub successful_rows: u64,
    pub failed_rows: u64,
}

impl JobOutput for ImportSummary {
    fn is_empty(&self) -> bool {
        false
    }

    fn produced_at(&self) -> Option<Timestamp> {
        None
    }

    fn summary(&self) -> Option<String> {
        Some(format!(
            "Imported {} of {} rows ({} failed)",
            self.successful_rows, self.total_rows, self.failed_rows
        ))
    }
}

impl RemoteStatus for ImportStatusResponse {
    fn phase(&self) -> RemotePhase {
        match self.status {
            ImportStatusKind::Pending | ImportStatusKind::Queued => RemotePhase::Pending,
            ImportStatusKind::Processing => RemotePhase::Processing,
            ImportStatusKind::Completed => RemotePhase::Completed,
            ImportStatusKind::Failed | ImportStatusKind::Error => RemotePhase::Failed(
                self.error.clone().unwrap_or_else(|| "Import failed".to_string()),
            ),
            ImportStatusKind::Unknown => RemotePhase::Unrecognized,
        }
    }
}

pub struct CsvImportSource {
    client: CsvImportClient,
}

impl CsvImportSource {
    pub fn new(client: CsvImportClient) -> Self {
        Self { client }
    }

    /// Runner with the default import poll policy.
    pub fn runner(client: CsvImportClient) -> CsvImports {
        JobRunner::new(Self::new(client), PollPolicy::csv_import())
    }
}

#[async_trait]
impl JobSource for CsvImportSource {
    type Request = ImportRequest;
    type Status = ImportStatusResponse;
    type Output = ImportSummary;

    fn kind(&self) -> &'static str {
        "csv_import"
    }

    fn label(&self) -> &'static str {
        "Import"
    }

    fn validate(&self, _subject_id: &SubjectId, request: &ImportRequest) -> Result<Vec<String>, String> {
        let columns: Vec<String> = request
            .column_mapping
            .iter()
            .filter(|(header, field)| !header.trim().is_empty() && !field.trim().is_empty())
            .map(|(header, _)| header.clone())
            .collect();
        if columns.is_empty() {
            return Err("map at least one column".to_string());
        }
        Ok(columns)
    }

    async fn start(
        &self,
        subject_id: &SubjectId,
        request: &ImportRequest,
        inputs: &[String],
    ) -> Result<Option<String>, ApiError> {
        let mapping: BTreeMap<String, String> = request
            .column_mapping
            .iter()
            .filter(|(header, _)| inputs.contains(header))
            .map(|(header, field)| (header.clone(), field.trim().to_string()))
            .collect();
        self.client.save_mapping(subject_id.as_str(), mapping).await?;
        self.client.start_import(subject_id.as_str()).await?;
        Ok(Some(subject_id.to_string()))
    }

    async fn status(&self, handle: &JobHandle) -> Result<ImportStatusResponse, ApiError> {
        self.client.status(handle.subject_id.as_str()).await
    }

    async fn output(
        &self,
        _handle: &JobHandle,
        status: &ImportStatusResponse,
    ) -> Result<Option<ImportSummary>, ApiError> {
        Ok(Some(ImportSummary {
            total_rows: status.total_rows,
            successful_rows: status.successful_rows,
            failed_rows: status.failed_rows,
        }))
    }

    fn progress_view(
        &self,
        _handle: &JobHandle,
        status: Option<&ImportStatusResponse>,
        _attempts: u32,
    ) -> JobView {
        match status {
            Some(s) => progress::import_view(s.processed_rows, s.total_rows, s.percent()),
            None => progress::import_view(0, 0, None),
        }
    }
}

impl CsvImports {
    /// Upload a file. The returned import id is the subject for
    /// [`JobRunner::submit`].
    pub async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadedFile, ApiError> {
        let uploaded = self.source().client.upload(file_name, contents).await?;
        tracing::info!(
            import_id = %uploaded.import_id,
            columns = uploaded.headers.len(),
            rows = uploaded.row_count.unwrap_or(0),
            "CSV uploaded",
        );
        Ok(uploaded)
    }
}
