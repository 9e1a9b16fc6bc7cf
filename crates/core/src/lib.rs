//! Pure domain logic for the lead console job pipeline.
//!
//! Everything here is synchronous and I/O free: identifiers, the job
//! state model, polling policy, the per-subject [`guard::JobGuard`],
//! the [`cache::ResultCache`], the staleness shim and the progress
//! presenter. The async engine lives in `leadconsole-jobs`.

pub mod cache;
pub mod error;
pub mod guard;
pub mod job;
pub mod job_events;
pub mod policy;
pub mod progress;
pub mod staleness;
pub mod types;
