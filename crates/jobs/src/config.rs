use std::time::Duration;

use leadconsole_client::api::DEFAULT_REQUEST_TIMEOUT;
use leadconsole_client::{ApiClient, ApiError};
use leadconsole_core::error::CoreError;
use leadconsole_core::policy::PollPolicy;

/// Console configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Base URL of the console API, e.g. `https://console.example.com`.
    pub api_url: String,
    /// Per-request HTTP timeout (default: `30` seconds).
    pub request_timeout: Duration,
    /// Poll policy for FCS report generation.
    pub fcs_policy: PollPolicy,
    /// Poll policy for bulk CSV imports.
    pub csv_import_policy: PollPolicy,
}

impl ConsoleConfig {
    /// Load configuration from the environment, reading `.env` first if
    /// present.
    ///
    /// | Env Var                            | Default         |
    /// |------------------------------------|-----------------|
    /// | `LEADCONSOLE_API_URL`              | required        |
    /// | `LEADCONSOLE_REQUEST_TIMEOUT_SECS` | `30`            |
    /// | `FCS_*`                            | `5 / 5 / 60 / 10` |
    /// | `CSV_IMPORT_*`                     | `2 / 2 / 150 / 10` |
    ///
    /// See [`PollPolicy::from_env`] for the `*` suffixes.
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("LEADCONSOLE_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::Config("LEADCONSOLE_API_URL is required".to_string()))?;

        let request_timeout = match lookup("LEADCONSOLE_REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(CoreError::Config(format!(
                        "LEADCONSOLE_REQUEST_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                    )))
                }
            },
        };

        let fcs_policy = PollPolicy::from_lookup("FCS", PollPolicy::fcs(), &lookup)?;
        let csv_import_policy =
            PollPolicy::from_lookup("CSV_IMPORT", PollPolicy::csv_import(), &lookup)?;

        Ok(Self {
            api_url,
            request_timeout,
            fcs_policy,
            csv_import_policy,
        })
    }

    /// HTTP client for the configured API.
    pub fn api_client(&self) -> Result<ApiClient, ApiError> {
        ApiClient::with_timeout(&self.api_url, self.request_timeout)
    }
}
