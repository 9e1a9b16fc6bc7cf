//! Bulk CSV import endpoints.
//!
//! An import is a four step exchange: upload the file, save the column
//! mapping, start the import, then poll its status by import id.

use std::collections::BTreeMap;

use reqwest::multipart::{Form, Part};

use crate::api::{ApiClient, ApiError};
use crate::messages::{
    AckResponse, ImportStatusResponse, SaveMappingRequest, StartImportRequest, UploadResponse,
};

/// Summary of an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub import_id: String,
    pub headers: Vec<String>,
    pub row_count: Option<u64>,
}

/// Typed wrapper for `/api/csv-import/*`.
#[derive(Debug, Clone)]
pub struct CsvImportClient {
    api: ApiClient,
}

impl CsvImportClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Upload a CSV file as `multipart/form-data` (field `file`).
    pub async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadedFile, ApiError> {
        let url = self.api.endpoint(&["api", "csv-import", "upload"])?;
        let size = contents.len();
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        tracing::debug!(file_name, size, "Uploading CSV for import");

        let response = self.api.http().post(url).multipart(form).send().await?;
        let body: UploadResponse = ApiClient::parse_response(response).await?;

        if !body.success {
            return Err(ApiError::Rejected(
                body.error.unwrap_or_else(|| "upload was not accepted".to_string()),
            ));
        }
        let import_id = body
            .import_id
            .ok_or_else(|| ApiError::Malformed("upload response has no importId".to_string()))?;

        Ok(UploadedFile {
            import_id,
            headers: body.headers,
            row_count: body.row_count,
        })
    }

    /// Save the CSV header → lead field mapping for an upload.
    pub async fn save_mapping(
        &self,
        import_id: &str,
        column_mapping: BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        let url = self.api.endpoint(&["api", "csv-import", "mapping"])?;
        let body = SaveMappingRequest {
            import_id: import_id.to_string(),
            column_mapping,
        };
        let response = self.api.http().post(url).json(&body).send().await?;
        Self::check_ack(ApiClient::parse_response(response).await?, "mapping was not saved")
    }

    /// Start processing a mapped upload.
    pub async fn start_import(&self, import_id: &str) -> Result<(), ApiError> {
        let url = self.api.endpoint(&["api", "csv-import", "import"])?;
        let body = StartImportRequest {
            import_id: import_id.to_string(),
        };
        let response = self.api.http().post(url).json(&body).send().await?;
        Self::check_ack(ApiClient::parse_response(response).await?, "import was not started")
    }

    /// Fetch progress for an import.
    pub async fn status(&self, import_id: &str) -> Result<ImportStatusResponse, ApiError> {
        let url = self.api.endpoint(&["api", "csv-import", "status", import_id])?;
        let response = self.api.http().get(url).send().await?;
        ApiClient::parse_response(response).await
    }

    fn check_ack(ack: AckResponse, fallback: &str) -> Result<(), ApiError> {
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                ack.error.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}
