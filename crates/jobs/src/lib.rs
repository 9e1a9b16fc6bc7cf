//! Async engine for the lead console's long-running remote jobs.
//!
//! A [`source::JobSource`] adapts one remote flow (FCS report
//! generation, bulk CSV import). [`runner::JobRunner`] validates and
//! submits through [`submitter::JobSubmitter`], then drives each
//! accepted job with a [`poller::JobPoller`] on its own task.

pub mod config;
pub mod console;
pub mod csv_import;
pub mod events;
pub mod fcs;
pub mod poller;
pub mod runner;
pub mod source;
pub mod submitter;

pub use config::ConsoleConfig;
pub use console::LeadConsole;
pub use events::JobEvent;
pub use poller::{JobFailure, JobOutcome, PollReport};
pub use runner::{JobRunner, RunningJob};
pub use source::JobSource;
pub use submitter::SubmitError;
