//! Wire shapes for the console API.
//!
//! Field names are camelCase on the wire. Status strings the client does
//! not know deserialize to an `Unknown` variant instead of failing, so
//! the poller can treat them as a transient oddity.

use std::collections::BTreeMap;

use leadconsole_core::types::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// FCS report generation
// ---------------------------------------------------------------------------

/// Body of `POST /api/conversations/{id}/fcs/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFcsRequest {
    pub business_name: String,
    pub document_ids: Vec<String>,
}

/// Response of the generate endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFcsResponse {
    pub success: bool,
    /// Present when the remote tracks the job by its own id.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Remote state of a report generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FcsStatusKind {
    NotStarted,
    NotFound,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Response of `GET /api/conversations/{id}/fcs/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct FcsStatusResponse {
    pub status: FcsStatusKind,
    #[serde(default)]
    pub error: Option<String>,
}

/// The analysis block of `GET /api/conversations/{id}/fcs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcsAnalysis {
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub statement_count: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `GET /api/conversations/{id}/fcs`.
#[derive(Debug, Clone, Deserialize)]
pub struct FcsReportResponse {
    pub success: bool,
    #[serde(default)]
    pub analysis: Option<FcsAnalysis>,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// CSV import
// ---------------------------------------------------------------------------

/// Response of `POST /api/csv-import/upload`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub import_id: Option<String>,
    /// Column headers detected in the uploaded file.
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/csv-import/mapping`: CSV header → lead field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMappingRequest {
    pub import_id: String,
    pub column_mapping: BTreeMap<String, String>,
}

/// Body of `POST /api/csv-import/import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportRequest {
    pub import_id: String,
}

/// Plain `{success, error?}` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Remote state of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatusKind {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Error,
    #[serde(other)]
    Unknown,
}

/// Response of `GET /api/csv-import/status/{importId}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusResponse {
    pub status: ImportStatusKind,
    /// Completion percentage, 0-100.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub processed_rows: u64,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub successful_rows: u64,
    #[serde(default)]
    pub failed_rows: u64,
    #[serde(default)]
    pub error: Option<String>,
}

impl ImportStatusResponse {
    /// Remote percentage clamped to `0..=100`, if reported.
    pub fn percent(&self) -> Option<u8> {
        self.progress
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 100.0).round() as u8)
    }
}

// ---- helpers ----

/// Accept `"abc"`, `42` or `null` for id fields.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Str(s)) if !s.trim().is_empty() => Some(s),
        Some(Raw::Str(_)) | None => None,
        Some(Raw::Int(n)) => Some(n.to_string()),
    })
}
