//! HTTP client for the lead console's long-running job endpoints.
//!
//! Provides typed request/response shapes and thin [`reqwest`] wrappers
//! for FCS report generation and bulk CSV import. Polling, retries and
//! guards live one layer up in `leadconsole-jobs`.

pub mod api;
pub mod csv_import;
pub mod fcs;
pub mod messages;

pub use api::{ApiClient, ApiError};
pub use csv_import::CsvImportClient;
pub use fcs::FcsClient;
