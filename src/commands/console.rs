//! Observers that render the engine's event stream.
use std::io::{IsTerminal as _, Write};

use anyhow::{Context as _, Result};

use crate::engine::{Event, LogLevel};
use crate::logging::Logger;

/// Line logged once the event stream has finished.
pub const COMPLETION_LINE: &str = "All operations completed.";

/// Consumes engine events in order.
pub trait Observer {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be written out.
    fn observe(&mut self, event: &Event) -> Result<()>;
}

/// Re-emits events through the [`Logger`] and draws a progress line.
#[derive(Debug)]
pub struct ConsoleObserver<'a> {
    log: &'a Logger,
    show_progress: bool,
    current: String,
}

impl<'a> ConsoleObserver<'a> {
    /// Observer writing through `log`; the progress line is only drawn when
    /// stdout is a terminal.
    #[must_use]
    pub fn new(log: &'a Logger) -> Self {
        Self {
            log,
            show_progress: std::io::stdout().is_terminal(),
            current: String::new(),
        }
    }
}

impl Observer for ConsoleObserver<'_> {
    fn observe(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Log { level, message } => {
                match level {
                    LogLevel::Info => self.log.info(message),
                    LogLevel::Success => self.log.success(message),
                    LogLevel::Warning => self.log.warn(message),
                    LogLevel::Error => self.log.error(message),
                }
                if let Some(name) = message.strip_prefix("Executing: ") {
                    name.clone_into(&mut self.current);
                }
            }
            Event::Progress { percent } => {
                if self.show_progress {
                    self.log.draw_progress(*percent, &self.current);
                }
            }
            Event::Finished { .. } => {
                self.log.clear_progress();
                self.log.info(COMPLETION_LINE);
            }
        }
        Ok(())
    }
}

/// Writes one JSON object per event.
#[derive(Debug)]
pub struct JsonObserver<W> {
    out: W,
}

impl<W: Write> JsonObserver<W> {
    /// Observer writing JSON lines to `out`.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Return the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Observer for JsonObserver<W> {
    fn observe(&mut self, event: &Event) -> Result<()> {
        serde_json::to_writer(&mut self.out, event).context("serializing event")?;
        writeln!(self.out).context("writing event")?;
        self.out.flush().context("writing event")
    }
}
