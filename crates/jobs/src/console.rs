//! Both job flows wired against one API client.

use leadconsole_client::{ApiError, CsvImportClient, FcsClient};

use crate::config::ConsoleConfig;
use crate::csv_import::{CsvImportSource, CsvImports};
use crate::fcs::{FcsReports, FcsSource};
use crate::runner::JobRunner;

/// Report and import runners sharing one HTTP client.
///
/// Each runner keeps its own guard: report subjects are conversation
/// ids and import subjects are import ids, so the key spaces never mix.
pub struct LeadConsole {
    pub fcs: FcsReports,
    pub imports: CsvImports,
}

impl LeadConsole {
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ApiError> {
        let api = config.api_client()?;

        tracing::info!(
            api_url = %config.api_url,
            fcs_max_attempts = config.fcs_policy.max_attempts,
            csv_import_max_attempts = config.csv_import_policy.max_attempts,
            "Lead console job runners ready",
        );

        Ok(Self {
            fcs: JobRunner::new(FcsSource::new(FcsClient::new(api.clone())), config.fcs_policy),
            imports: JobRunner::new(
                CsvImportSource::new(CsvImportClient::new(api)),
                config.csv_import_policy,
            ),
        })
    }

    /// Stop every poll loop in both flows.
    pub async fn shutdown(&self) {
        self.fcs.shutdown().await;
        self.imports.shutdown().await;
    }
}
