//! Command runner: launch one process with a time bound and capture its output.
//!
//! Every process is described by an [`Invocation`] (program plus discrete
//! argument vector) so untrusted strings are never joined into a single
//! command line. The runner never returns an error: launch failures and
//! timeouts come back as failed [`CommandOutcome`]s.
use std::fmt;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::error::OperationError;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for the output readers once the child is gone.
///
/// A grandchild that inherited the pipes can keep them open after the child
/// exits; the readers are abandoned after this grace period.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Result of running one process (or of a handler that never launched one).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// `true` when the process exited with code 0.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error, or the failure message for classified errors.
    pub stderr: String,
    /// Exit code, when the process ran to completion.
    pub code: Option<i32>,
    /// Classified failure, `None` on success.
    pub error: Option<OperationError>,
}

impl CommandOutcome {
    /// A successful outcome with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            code: Some(0),
            ..Self::default()
        }
    }

    /// A failed outcome carrying `error`; its message becomes stderr.
    #[must_use]
    pub fn failed(error: OperationError) -> Self {
        Self {
            success: false,
            stderr: error.to_string(),
            error: Some(error),
            ..Self::default()
        }
    }

    /// Classify a finished process by its exit code (`0` ⇒ success).
    #[must_use]
    pub fn from_exit(code: Option<i32>, stdout: String, stderr: String) -> Self {
        let success = code == Some(0);
        Self {
            success,
            stdout,
            stderr,
            code,
            error: (!success).then(|| OperationError::Process {
                code: code.unwrap_or(-1),
            }),
        }
    }
}

impl From<Output> for CommandOutcome {
    fn from(output: Output) -> Self {
        Self::from_exit(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }
}

/// A program and its argument vector, plus extra environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, each passed to the OS as a discrete element.
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Start an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Human-readable rendering for logs and dry runs. Not used to launch anything.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_token(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", display_token(arg))?;
        }
        Ok(())
    }
}

fn display_token(s: &str) -> String {
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

/// `PowerShell` invocation that runs `script` via `-EncodedCommand`.
///
/// The script travels as base64 of its UTF-16LE bytes, so no character in it
/// is ever re-parsed by a command line.
#[must_use]
pub fn powershell_encoded(script: &str) -> Invocation {
    use base64::Engine as _;
    let utf16: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let encoded = base64::engine::general_purpose::STANDARD.encode(utf16);
    Invocation::new("powershell").args([
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-EncodedCommand",
        encoded.as_str(),
    ])
}

/// Abstraction over process execution (injectable for testing).
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run `invocation`, killing it if it outlives `timeout`.
    fn run(&self, invocation: &Invocation, timeout: Duration) -> CommandOutcome;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// Production [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, invocation: &Invocation, timeout: Duration) -> CommandOutcome {
        run_with_timeout(invocation, timeout)
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Spawn `invocation`, capture both streams, and enforce `timeout`.
#[must_use]
pub fn run_with_timeout(invocation: &Invocation, timeout: Duration) -> CommandOutcome {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in &invocation.env {
        cmd.env(key, value);
    }

    let started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return CommandOutcome::failed(OperationError::Launch {
                program: invocation.program.clone(),
                reason: e.to_string(),
            });
        }
    };
    tracing::debug!("spawned pid {}: {invocation}", child.id());

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    match wait_with_deadline(&mut child, timeout) {
        Ok(Some(status)) => {
            tracing::debug!(
                "{} exited with {status} after {:.1}s",
                invocation.program,
                started.elapsed().as_secs_f64()
            );
            CommandOutcome::from_exit(status.code(), collect(&stdout), collect(&stderr))
        }
        Ok(None) => {
            child.kill().ok();
            child.wait().ok();
            let error = OperationError::Timeout {
                seconds: timeout.as_secs(),
            };
            tracing::debug!("{} killed: {error}", invocation.program);
            timed_out(error, collect(&stdout), &collect(&stderr))
        }
        Err(e) => {
            child.kill().ok();
            CommandOutcome::failed(OperationError::Launch {
                program: invocation.program.clone(),
                reason: format!("wait failed: {e}"),
            })
        }
    }
}

/// Failure for a killed child; partial stderr follows the timeout message.
fn timed_out(error: OperationError, stdout: String, partial_stderr: &str) -> CommandOutcome {
    let mut outcome = CommandOutcome {
        stdout,
        ..CommandOutcome::failed(error)
    };
    let partial = partial_stderr.trim_end();
    if !partial.is_empty() {
        outcome.stderr = format!("{}\n{partial}", outcome.stderr);
    }
    outcome
}

/// Poll `child` until it exits or `timeout` elapses (`Ok(None)`).
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    // An unrepresentable deadline means "effectively forever".
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let remaining = deadline.map_or(POLL_INTERVAL, |d| {
            d.saturating_duration_since(Instant::now())
        });
        if remaining.is_zero() {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(remaining));
    }
}

/// Drain `source` on a helper thread; the text arrives on the returned channel.
fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut source) = source {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            source.read_to_end(&mut buf).ok();
            tx.send(String::from_utf8_lossy(&buf).into_owned()).ok();
        });
    }
    rx
}

fn collect(rx: &mpsc::Receiver<String>) -> String {
    rx.recv_timeout(READER_GRACE).unwrap_or_default()
}
