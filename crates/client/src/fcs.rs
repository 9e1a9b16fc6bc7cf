//! FCS report endpoints.
//!
//! The remote tracks report generation per conversation: one endpoint
//! starts it, one reports its status, and one returns "the current
//! report" for the conversation.

use crate::api::{ApiClient, ApiError};
use crate::messages::{
    FcsAnalysis, FcsReportResponse, FcsStatusResponse, GenerateFcsRequest, GenerateFcsResponse,
};

/// Typed wrapper for `/api/conversations/{id}/fcs*`.
#[derive(Debug, Clone)]
pub struct FcsClient {
    api: ApiClient,
}

impl FcsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Start a report generation.
    ///
    /// Sends `POST /api/conversations/{id}/fcs/generate`. A `success:
    /// false` body is returned as [`ApiError::Rejected`]. On success the
    /// remote job id is returned when the server issues one.
    pub async fn generate(
        &self,
        conversation_id: &str,
        request: &GenerateFcsRequest,
    ) -> Result<Option<String>, ApiError> {
        let url = self
            .api
            .endpoint(&["api", "conversations", conversation_id, "fcs", "generate"])?;

        tracing::debug!(
            conversation_id,
            documents = request.document_ids.len(),
            "Requesting FCS generation",
        );

        let response = self.api.http().post(url).json(request).send().await?;
        let body: GenerateFcsResponse = ApiClient::parse_response(response).await?;

        if !body.success {
            return Err(ApiError::Rejected(
                body.error
                    .unwrap_or_else(|| "generation was not accepted".to_string()),
            ));
        }
        Ok(body.job_id)
    }

    /// Fetch the generation status for a conversation.
    pub async fn status(&self, conversation_id: &str) -> Result<FcsStatusResponse, ApiError> {
        let url = self
            .api
            .endpoint(&["api", "conversations", conversation_id, "fcs", "status"])?;
        let response = self.api.http().get(url).send().await?;
        ApiClient::parse_response(response).await
    }

    /// Fetch the current report for a conversation.
    ///
    /// Returns `Ok(None)` when the server answers successfully but has no
    /// analysis block yet.
    pub async fn report(&self, conversation_id: &str) -> Result<Option<FcsAnalysis>, ApiError> {
        let url = self
            .api
            .endpoint(&["api", "conversations", conversation_id, "fcs"])?;
        let response = self.api.http().get(url).send().await?;
        let body: FcsReportResponse = ApiClient::parse_response(response).await?;

        if !body.success {
            return Err(ApiError::Rejected(
                body.error
                    .unwrap_or_else(|| "report could not be loaded".to_string()),
            ));
        }
        Ok(body.analysis)
    }
}
