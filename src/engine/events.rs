//! Events streamed from the engine worker to observers.
use serde::Serialize;
use std::fmt;

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Progress narration.
    Info,
    /// An operation or the run succeeded.
    Success,
    /// Nothing to do, or cancelled.
    Warning,
    /// An operation failed.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Every operation was dispatched.
    Completed,
    /// The cancel flag stopped the run between operations.
    Cancelled,
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Operations in the batch.
    pub total: usize,
    /// Operations that succeeded.
    pub succeeded: usize,
    /// Operations that failed.
    pub failed: usize,
    /// Terminal state.
    pub state: RunState,
}

impl ExecutionResult {
    /// Fresh counters for a batch of `total` operations.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
            state: RunState::Completed,
        }
    }

    /// Operations dispatched so far.
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// `true` when no processed operation failed.
    #[must_use]
    pub const fn overall_success(&self) -> bool {
        self.failed == 0
    }

    /// `true` when the run was cancelled.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.state == RunState::Cancelled
    }
}

/// One item of the ordered event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A user-facing log line.
    Log {
        /// Severity.
        level: LogLevel,
        /// Text.
        message: String,
    },
    /// Percentage of the batch processed, `0..=100`.
    Progress {
        /// Percent complete.
        percent: u8,
    },
    /// Terminal event; nothing follows it.
    Finished {
        /// `failed == 0`.
        overall_success: bool,
        /// Final counts.
        result: ExecutionResult,
    },
}

impl Event {
    /// Shorthand for a log event.
    #[must_use]
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }
}
