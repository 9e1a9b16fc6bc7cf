//! Polling policy: cadence and the two independent caps.
//!
//! The defaults reflect the observed remote latency (report generation
//! finishes within a few minutes, imports stream progress every couple
//! of seconds). They are overridable from the environment because the
//! right values depend on the remote job's latency distribution.

use std::time::Duration;

use crate::error::CoreError;

/// Seconds to wait after submission before the first report status check.
pub const FCS_INITIAL_DELAY_SECS: u64 = 5;

/// Seconds between report status checks.
pub const FCS_POLL_INTERVAL_SECS: u64 = 5;

/// Report status checks before giving up (~5 minutes at the default cadence).
pub const FCS_MAX_POLL_ATTEMPTS: u32 = 60;

/// Seconds between import status checks.
pub const CSV_IMPORT_POLL_INTERVAL_SECS: u64 = 2;

/// Import status checks before giving up (~5 minutes at the default cadence).
pub const CSV_IMPORT_MAX_POLL_ATTEMPTS: u32 = 150;

/// Consecutive failed or malformed status checks tolerated before the
/// poller reports that status cannot be read.
pub const DEFAULT_MAX_TRANSIENT_ERRORS: u32 = 10;

/// Cadence and caps for one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between submission and the first status check.
    pub initial_delay: Duration,
    /// Fixed delay between consecutive status checks.
    pub interval: Duration,
    /// Hard cap on status checks; reaching it times the job out.
    pub max_attempts: u32,
    /// Cap on consecutive transient errors; reaching it fails the job.
    pub max_transient_errors: u32,
}

impl PollPolicy {
    /// Report generation defaults: 5 s / 5 s / 60 / 10.
    pub fn fcs() -> Self {
        Self {
            initial_delay: Duration::from_secs(FCS_INITIAL_DELAY_SECS),
            interval: Duration::from_secs(FCS_POLL_INTERVAL_SECS),
            max_attempts: FCS_MAX_POLL_ATTEMPTS,
            max_transient_errors: DEFAULT_MAX_TRANSIENT_ERRORS,
        }
    }

    /// Bulk import defaults: 2 s / 2 s / 150 / 10.
    pub fn csv_import() -> Self {
        Self {
            initial_delay: Duration::from_secs(CSV_IMPORT_POLL_INTERVAL_SECS),
            interval: Duration::from_secs(CSV_IMPORT_POLL_INTERVAL_SECS),
            max_attempts: CSV_IMPORT_MAX_POLL_ATTEMPTS,
            max_transient_errors: DEFAULT_MAX_TRANSIENT_ERRORS,
        }
    }

    /// Same policy with no initial delay. Used for manual re-checks.
    pub fn immediate(self) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            ..self
        }
    }

    /// Load a policy from environment variables, falling back to `defaults`.
    ///
    /// | Env Var                          | Field                  |
    /// |----------------------------------|------------------------|
    /// | `{PREFIX}_INITIAL_DELAY_SECS`    | `initial_delay`        |
    /// | `{PREFIX}_POLL_INTERVAL_SECS`    | `interval`             |
    /// | `{PREFIX}_MAX_POLL_ATTEMPTS`     | `max_attempts`         |
    /// | `{PREFIX}_MAX_TRANSIENT_ERRORS`  | `max_transient_errors` |
    pub fn from_env(prefix: &str, defaults: Self) -> Result<Self, CoreError> {
        Self::from_lookup(prefix, defaults, |key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<F>(prefix: &str, defaults: Self, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |suffix: &str| -> Result<Option<u64>, CoreError> {
            let key = format!("{prefix}_{suffix}");
            match lookup(&key) {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
                    CoreError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))
                }),
            }
        };

        let initial_delay = read("INITIAL_DELAY_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.initial_delay);
        let interval = read("POLL_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);
        let max_attempts = read_u32(read("MAX_POLL_ATTEMPTS")?, prefix, "MAX_POLL_ATTEMPTS")?
            .unwrap_or(defaults.max_attempts);
        let max_transient_errors =
            read_u32(read("MAX_TRANSIENT_ERRORS")?, prefix, "MAX_TRANSIENT_ERRORS")?
                .unwrap_or(defaults.max_transient_errors);

        let policy = Self {
            initial_delay,
            interval,
            max_attempts,
            max_transient_errors,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Reject policies that could never terminate or never poll.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_attempts == 0 {
            return Err(CoreError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_transient_errors == 0 {
            return Err(CoreError::Config(
                "max_transient_errors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_u32(value: Option<u64>, prefix: &str, suffix: &str) -> Result<Option<u32>, CoreError> {
    value
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| CoreError::Config(format!("{prefix}_{suffix} is out of range: {v}")))
        })
        .transpose()
}
