//! Session configuration.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default wait between two polls of the file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Where the cursor is placed when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// Deliver every complete line already in the file, then follow.
    FromBeginning,
    /// Only deliver lines appended after the session starts.
    #[default]
    FromEnd,
}

/// What the loop does with I/O faults other than a missing file.
///
/// A missing file is always treated as transient and retried on the next
/// interval, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the fault and retry on the next interval, forever.
    #[default]
    RetryForever,
    /// End the session on the n-th consecutive fault.
    GiveUpAfter(u32),
}

impl FailurePolicy {
    /// Whether `consecutive` faults in a row should end the session.
    pub fn should_give_up(&self, consecutive: u32) -> bool {
        match self {
            FailurePolicy::RetryForever => false,
            FailurePolicy::GiveUpAfter(limit) => consecutive >= (*limit).max(1),
        }
    }
}

/// Construction parameters for a [`TailSession`](crate::TailSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailConfig {
    pub path: PathBuf,
    /// Zero means a single pass with no repeat.
    pub poll_interval: Duration,
    pub start_mode: StartMode,
    pub failure_policy: FailurePolicy,
}

impl TailConfig {
    /// Creates a config for `path` with the default interval, tailing from
    /// end-of-file.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_mode: StartMode::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_start_mode(mut self, mode: StartMode) -> Self {
        self.start_mode = mode;
        self
    }

    /// Shorthand for choosing between [`StartMode::FromBeginning`] and
    /// [`StartMode::FromEnd`].
    pub fn start_at_beginning(self, yes: bool) -> Self {
        self.with_start_mode(if yes {
            StartMode::FromBeginning
        } else {
            StartMode::FromEnd
        })
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Whether the session runs a single pass and exits.
    pub fn is_one_shot(&self) -> bool {
        self.poll_interval.is_zero()
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "file path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
