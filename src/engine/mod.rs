//! Execution engine: runs a batch strictly in order on one worker thread.
//!
//! The engine dispatches each operation to [`Handlers`], counts outcomes, and
//! narrates everything as [`Event`]s on an `mpsc` channel. Failures never stop
//! the run; only the [`CancelToken`] does, and only between operations.
//!
//! ```text
//! Idle ──start──▶ Running ──all dispatched──▶ Completed
//!                    │
//!                    └──cancel flag seen────▶ Cancelled
//! ```
pub mod cancel;
pub mod events;

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{Result, anyhow};

pub use cancel::CancelToken;
pub use events::{Event, ExecutionResult, LogLevel, RunState};

use crate::handlers::Handlers;
use crate::operation::Operation;

/// Runs batches of operations.
#[derive(Debug, Clone)]
pub struct Engine {
    handlers: Handlers,
    max_error_chars: usize,
}

impl Engine {
    /// Create an engine; the error truncation limit comes from the handler settings.
    #[must_use]
    pub fn new(handlers: Handlers) -> Self {
        let max_error_chars = handlers.context().settings.max_error_chars;
        Self {
            handlers,
            max_error_chars,
        }
    }

    /// Run `batch` on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn start(self, batch: Vec<Operation>) -> Result<RunHandle> {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let worker = std::thread::Builder::new()
            .name("postinstall-engine".to_string())
            .spawn(move || self.run(&batch, &worker_cancel, &tx))?;
        Ok(RunHandle {
            events: rx,
            cancel,
            worker,
        })
    }

    /// Run `batch` on the calling thread, emitting events into `events`.
    ///
    /// A closed receiver does not stop the run.
    pub fn run(
        &self,
        batch: &[Operation],
        cancel: &CancelToken,
        events: &Sender<Event>,
    ) -> ExecutionResult {
        let emit = |event: Event| {
            events.send(event).ok();
        };
        let log = |level: LogLevel, message: String| emit(Event::log(level, message));

        let total = batch.len();
        let mut result = ExecutionResult::new(total);
        if total == 0 {
            log(LogLevel::Warning, "No operations to execute".to_string());
            emit(Event::Finished {
                overall_success: true,
                result,
            });
            return result;
        }

        log(
            LogLevel::Info,
            format!("Starting execution of {total} operation(s)..."),
        );
        for (index, op) in batch.iter().enumerate() {
            if cancel.is_cancelled() {
                log(LogLevel::Warning, "Operation cancelled by user".to_string());
                result.state = RunState::Cancelled;
                break;
            }
            log(LogLevel::Info, format!("Executing: {}", op.display_name));
            let started = Instant::now();
            let outcome = self.handlers.handle(op);
            tracing::debug!(
                "{} [{}] finished in {:.1}s: success={} code={:?}",
                op.display_name,
                op.kind.tag(),
                started.elapsed().as_secs_f64(),
                outcome.success,
                outcome.code
            );
            if outcome.success {
                result.succeeded += 1;
                log(
                    LogLevel::Success,
                    format!("✓ {} completed successfully", op.display_name),
                );
            } else {
                result.failed += 1;
                let detail = self.handlers.failure_message(op, &outcome);
                log(
                    LogLevel::Error,
                    format!(
                        "✗ {} failed: {}",
                        op.display_name,
                        truncate(&detail, self.max_error_chars)
                    ),
                );
            }
            emit(Event::Progress {
                percent: progress_percent(index + 1, total),
            });
        }

        for (level, line) in summary_lines(&result) {
            log(level, line);
        }
        emit(Event::Finished {
            overall_success: result.overall_success(),
            result,
        });
        result
    }
}

/// A run in progress on the worker thread.
#[derive(Debug)]
pub struct RunHandle {
    events: Receiver<Event>,
    cancel: CancelToken,
    worker: JoinHandle<ExecutionResult>,
}

impl RunHandle {
    /// The ordered event stream; it ends after [`Event::Finished`].
    #[must_use]
    pub const fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// A clone of the run's cancel flag.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the worker and return its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread panicked.
    pub fn join(self) -> Result<ExecutionResult> {
        self.worker
            .join()
            .map_err(|_| anyhow!("engine worker thread panicked"))
    }
}

/// `round(100 * done / total)`, half rounding up; 100 for an empty total.
#[must_use]
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (200 * done.min(total) + total) / (2 * total);
    u8::try_from(percent).unwrap_or(100)
}

/// Cut `message` to `max` characters, marking the cut with `...`.
#[must_use]
pub fn truncate(message: &str, max: usize) -> String {
    if message.chars().count() <= max {
        return message.to_string();
    }
    let mut cut: String = message.chars().take(max).collect();
    cut.push_str("...");
    cut
}

/// The end-of-run summary block.
#[must_use]
pub fn summary_lines(result: &ExecutionResult) -> Vec<(LogLevel, String)> {
    vec![
        (LogLevel::Info, String::new()),
        (LogLevel::Info, "=== Execution Summary ===".to_string()),
        (LogLevel::Info, format!("Total operations: {}", result.total)),
        (LogLevel::Success, format!("✓ Successful: {}", result.succeeded)),
        (
            if result.failed > 0 {
                LogLevel::Error
            } else {
                LogLevel::Info
            },
            format!("✗ Failed: {}", result.failed),
        ),
    ]
}
