//! Console logger with dry-run awareness and a single-row progress line.
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET, SUCCESS_TARGET};
use super::utils::{log_file_path, terminal_columns};

/// Structured logger used by the command front end.
///
/// All messages are always written to a persistent log file at
/// `<cache>/postinstall/<command>.log` with timestamps and ANSI codes
/// stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
    /// Whether a progress line is currently displayed.
    ///
    /// The line is truncated to one terminal row, so clearing it never needs
    /// cursor-up movement.
    progress_shown: Mutex<bool>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display after a run. The file itself is
    /// created by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: log_file_path(command),
            progress_shown: Mutex::new(false),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        self.clear_progress();
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        self.clear_progress();
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        self.clear_progress();
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        self.clear_progress();
        tracing::info!("{msg}");
    }

    /// Log a success message.
    pub fn success(&self, msg: &str) {
        self.clear_progress();
        tracing::info!(target: SUCCESS_TARGET, "{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        self.clear_progress();
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Print where the full log was written.
    pub fn print_log_location(&self) {
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }

    /// Erase the progress line from the console.
    ///
    /// No-op if no progress line is currently shown.
    pub fn clear_progress(&self) {
        let mut shown = self
            .progress_shown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *shown {
            let mut out = std::io::stdout().lock();
            write!(out, "\r\x1b[K").ok();
            out.flush().ok();
            *shown = false;
        }
    }

    /// Draw `[####    ]  42% label` on the current row, replacing any
    /// previous progress line.
    pub fn draw_progress(&self, percent: u8, label: &str) {
        self.clear_progress();
        let line = progress_line(percent, label, terminal_columns());
        let mut out = std::io::stdout().lock();
        write!(out, "  \x1b[2m{line}\x1b[0m").ok();
        out.flush().ok();
        *self
            .progress_shown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = true;
    }

    #[cfg(test)]
    pub(crate) fn progress_visible(&self) -> bool {
        *self
            .progress_shown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Width of the bar between the brackets.
const BAR_WIDTH: usize = 20;

/// Render a progress line that fits in `cols - 2` columns.
fn progress_line(percent: u8, label: &str, cols: usize) -> String {
    let percent = percent.min(100);
    let filled = BAR_WIDTH * usize::from(percent) / 100;
    let bar = format!(
        "[{}{}] {percent:>3}%",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled)
    );
    let room = cols.saturating_sub(2 + bar.chars().count() + 1);
    if label.is_empty() || room == 0 {
        return bar;
    }
    let label = if label.chars().count() > room {
        let truncated: String = label.chars().take(room.saturating_sub(1)).collect();
        format!("{truncated}…")
    } else {
        label.to_string()
    };
    format!("{bar} {label}")
}
