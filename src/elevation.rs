//! Privileged process launcher.
//!
//! [`SystemLauncher`] asks the OS to run one program with administrator
//! rights, waits for it, and maps its exit code through the usual success
//! rule. When the [`PrivilegeContext`] says the process is already elevated
//! the target runs directly through the [`Executor`] instead.
//!
//! On Windows the request goes through a fixed `PowerShell` script calling
//! `Start-Process -Verb RunAs`. The script text never contains user data: the
//! target path and the pre-quoted argument line reach it through environment
//! variables. Elsewhere `sudo -n` is used with a plain argument vector.
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::OperationError;
use crate::exec::{CommandOutcome, Executor, Invocation};

/// Exit code `Start-Process` failures are mapped to (`ERROR_CANCELLED`).
pub const ERROR_CANCELLED: i32 = 1223;

/// Environment variable carrying the target path to the elevation script.
#[cfg(windows)]
const PATH_VAR: &str = "POSTINSTALL_ELEVATE_PATH";

/// Environment variable carrying the quoted argument line.
#[cfg(windows)]
const ARGS_VAR: &str = "POSTINSTALL_ELEVATE_ARGS";

#[cfg(windows)]
const ELEVATE_SCRIPT: &str = r"$ErrorActionPreference = 'Stop'
$params = @{ FilePath = $env:POSTINSTALL_ELEVATE_PATH; Verb = 'RunAs'; PassThru = $true; Wait = $true }
if ($env:POSTINSTALL_ELEVATE_ARGS) { $params.ArgumentList = $env:POSTINSTALL_ELEVATE_ARGS }
try {
    $process = Start-Process @params
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 1223
}
exit $process.ExitCode
";

/// Whether the current process already holds administrator rights.
///
/// Detected once by the caller and handed to handlers at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrivilegeContext {
    /// `true` when running elevated.
    pub elevated: bool,
}

impl PrivilegeContext {
    /// Context for an elevated process.
    #[must_use]
    pub const fn elevated() -> Self {
        Self { elevated: true }
    }

    /// Context for a standard-user process.
    #[must_use]
    pub const fn standard() -> Self {
        Self { elevated: false }
    }
}

/// Runs one program with administrator rights.
pub trait ElevatedLauncher: Send + Sync + fmt::Debug {
    /// Run `program` elevated and wait for it (bounded by `timeout`).
    ///
    /// Never errors: a declined or impossible elevation comes back as a
    /// failed outcome carrying [`OperationError::Permission`].
    fn run_elevated(&self, program: &Path, args: &[String], timeout: Duration) -> CommandOutcome;
}

/// Production launcher built on an [`Executor`].
#[derive(Debug)]
pub struct SystemLauncher {
    executor: Arc<dyn Executor>,
    privilege: PrivilegeContext,
}

impl SystemLauncher {
    /// Create a launcher that spawns through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, privilege: PrivilegeContext) -> Self {
        Self {
            executor,
            privilege,
        }
    }
}

impl ElevatedLauncher for SystemLauncher {
    fn run_elevated(&self, program: &Path, args: &[String], timeout: Duration) -> CommandOutcome {
        let program = program.display().to_string();
        if self.privilege.elevated {
            tracing::debug!("already elevated, running {program} directly");
            let invocation = Invocation::new(program).args(args.iter().cloned());
            return self.executor.run(&invocation, timeout);
        }
        let request = elevation_request(&program, args);
        tracing::debug!("requesting elevation: {request}");
        classify(self.executor.run(&request, timeout))
    }
}

/// Build the invocation that asks the OS to elevate `program`.
#[cfg(windows)]
#[must_use]
pub fn elevation_request(program: &str, args: &[String]) -> Invocation {
    crate::exec::powershell_encoded(ELEVATE_SCRIPT)
        .env(PATH_VAR, program)
        .env(ARGS_VAR, build_argument_line(args))
}

/// Build the invocation that asks the OS to elevate `program`.
#[cfg(not(windows))]
#[must_use]
pub fn elevation_request(program: &str, args: &[String]) -> Invocation {
    Invocation::new("sudo")
        .args(["-n", "--", program])
        .args(args.iter().cloned())
}

/// Turn a refused or impossible elevation into a permission failure.
fn classify(outcome: CommandOutcome) -> CommandOutcome {
    if outcome.success {
        return outcome;
    }
    let refused = match &outcome.error {
        Some(OperationError::Launch { program, reason }) => Some(format!(
            "could not request elevation through {program}: {reason}"
        )),
        _ if refused_by_os(&outcome) => {
            let detail = outcome.stderr.lines().next().unwrap_or_default().trim();
            Some(if detail.is_empty() {
                "elevation was declined".to_string()
            } else {
                format!("elevation was declined: {detail}")
            })
        }
        _ => None,
    };
    match refused {
        Some(message) => CommandOutcome {
            code: outcome.code,
            stdout: outcome.stdout,
            ..CommandOutcome::failed(OperationError::Permission(message))
        },
        None => outcome,
    }
}

#[cfg(windows)]
fn refused_by_os(outcome: &CommandOutcome) -> bool {
    outcome.code == Some(ERROR_CANCELLED)
}

#[cfg(not(windows))]
fn refused_by_os(outcome: &CommandOutcome) -> bool {
    outcome.stderr.starts_with("sudo:")
        && (outcome.stderr.contains("password is required") || outcome.stderr.contains("sudoers"))
}

/// Quote one argument so `CommandLineToArgvW` parses it back unchanged.
///
/// Arguments without whitespace or quotes pass through as-is. Otherwise the
/// argument is wrapped in quotes, embedded quotes are escaped, and runs of
/// backslashes are doubled only where they precede a quote.
///
/// This covers programs that parse argv. `cmd.exe` re-parses its command
/// line with its own rules; batch targets are checked by the tool and
/// executable handlers instead.
#[must_use]
pub fn quote_windows_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '\n', '\u{b}', '"']) {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(std::iter::repeat_n('\\', backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat_n('\\', backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.extend(std::iter::repeat_n('\\', backslashes * 2));
    quoted.push('"');
    quoted
}

/// Join independently quoted arguments into one command line.
#[must_use]
pub fn build_argument_line(args: &[String]) -> String {
    args.iter()
        .map(|a| quote_windows_arg(a))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::MockExecutor;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    // -----------------------------------------------------------------------
    // quote_windows_arg
    // -----------------------------------------------------------------------

    #[test]
    fn plain_argument_is_unchanged() {
        assert_eq!(quote_windows_arg("/quiet"), "/quiet");
        assert_eq!(quote_windows_arg(r"C:\Tools\x.exe"), r"C:\Tools\x.exe");
    }

    #[test]
    fn empty_argument_is_quoted() {
        assert_eq!(quote_windows_arg(""), r#""""#);
    }

    #[test]
    fn spaces_are_quoted() {
        assert_eq!(
            quote_windows_arg(r"C:\Program Files\App\setup.exe"),
            r#""C:\Program Files\App\setup.exe""#
        );
    }

    #[test]
    fn embedded_quote_is_escaped() {
        assert_eq!(quote_windows_arg(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn backslashes_before_quote_are_doubled() {
        assert_eq!(quote_windows_arg(r#"a\"b"#), r#""a\\\"b""#);
    }

    #[test]
    fn trailing_backslash_is_doubled_inside_quotes() {
        assert_eq!(quote_windows_arg(r"C:\My Dir\"), r#""C:\My Dir\\""#);
    }

    #[test]
    fn argv_quoting_ignores_shell_metacharacters() {
        assert_eq!(quote_windows_arg("$env:PATH;%TEMP%&"), "$env:PATH;%TEMP%&");
    }

    #[test]
    fn argument_line_quotes_each_argument() {
        let line = build_argument_line(&strings(&["/i", r"C:\My Apps\a.msi", "/qn"]));
        assert_eq!(line, r#"/i "C:\My Apps\a.msi" /qn"#);
        assert_eq!(build_argument_line(&[]), "");
    }

    // -----------------------------------------------------------------------
    // SystemLauncher
    // -----------------------------------------------------------------------

    #[test]
    fn elevated_context_runs_target_directly() {
        let executor = Arc::new(MockExecutor::ok("done"));
        let launcher = SystemLauncher::new(executor.clone(), PrivilegeContext::elevated());
        let outcome = launcher.run_elevated(
            Path::new("/setup/tool.exe"),
            &strings(&["/S"]),
            Duration::from_secs(5),
        );
        assert!(outcome.success);
        let calls = executor.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "/setup/tool.exe");
        assert_eq!(calls[0].args, strings(&["/S"]));
    }

    #[test]
    fn standard_context_requests_elevation() {
        let executor = Arc::new(MockExecutor::ok(""));
        let launcher = SystemLauncher::new(executor.clone(), PrivilegeContext::standard());
        let args = strings(&["a b", "$x"]);
        launcher.run_elevated(Path::new("/setup/tool.exe"), &args, Duration::from_secs(5));
        let calls = executor.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], elevation_request("/setup/tool.exe", &args));
        assert_ne!(calls[0].program, "/setup/tool.exe");
        #[cfg(not(windows))]
        assert_eq!(
            calls[0].args,
            strings(&["-n", "--", "/setup/tool.exe", "a b", "$x"])
        );
    }

    #[cfg(windows)]
    #[test]
    fn windows_request_passes_target_through_environment() {
        let request = elevation_request(r"C:\Setup\tool.exe", &strings(&["a b", "$x"]));
        assert!(request.env.contains(&(PATH_VAR.to_string(), r"C:\Setup\tool.exe".to_string())));
        assert!(request.env.contains(&(ARGS_VAR.to_string(), r#""a b" $x"#.to_string())));
    }


    #[test]
    fn launch_failure_is_permission_error() {
        let executor = Arc::new(MockExecutor::with_outcomes(vec![CommandOutcome::failed(
            OperationError::Launch {
                program: "powershell".into(),
                reason: "not found".into(),
            },
        )]));
        let launcher = SystemLauncher::new(executor, PrivilegeContext::standard());
        let outcome = launcher.run_elevated(Path::new("x.exe"), &[], Duration::from_secs(5));
        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(OperationError::Permission(_))));
    }

    #[test]
    fn target_failure_keeps_process_error() {
        let executor = Arc::new(MockExecutor::with_outcomes(vec![CommandOutcome::from_exit(
            Some(2),
            String::new(),
            "bad switch".into(),
        )]));
        let launcher = SystemLauncher::new(executor, PrivilegeContext::standard());
        let outcome = launcher.run_elevated(Path::new("x.exe"), &[], Duration::from_secs(5));
        assert_eq!(outcome.error, Some(OperationError::Process { code: 2 }));
        assert_eq!(outcome.stderr, "bad switch");
    }

    #[cfg(windows)]
    #[test]
    fn consent_denial_is_permission_error() {
        let executor = Arc::new(MockExecutor::with_outcomes(vec![CommandOutcome::from_exit(
            Some(ERROR_CANCELLED),
            String::new(),
            "The operation was canceled by the user.".into(),
        )]));
        let launcher = SystemLauncher::new(executor, PrivilegeContext::standard());
        let outcome = launcher.run_elevated(Path::new("x.exe"), &[], Duration::from_secs(5));
        assert_eq!(
            outcome.error,
            Some(OperationError::Permission(
                "elevation was declined: The operation was canceled by the user.".into()
            ))
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn sudo_password_prompt_is_permission_error() {
        let executor = Arc::new(MockExecutor::with_outcomes(vec![CommandOutcome::from_exit(
            Some(1),
            String::new(),
            "sudo: a password is required\n".into(),
        )]));
        let launcher = SystemLauncher::new(executor, PrivilegeContext::standard());
        let outcome = launcher.run_elevated(Path::new("/bin/true"), &[], Duration::from_secs(5));
        assert_eq!(
            outcome.error,
            Some(OperationError::Permission(
                "elevation was declined: sudo: a password is required".into()
            ))
        );
        assert_eq!(outcome.code, Some(1));
    }

    #[cfg(not(windows))]
    #[test]
    fn sudo_request_passes_argument_vector() {
        let inv = elevation_request("/opt/tool", &strings(&["--flag", "two words"]));
        assert_eq!(inv.program, "sudo");
        assert_eq!(inv.args, strings(&["-n", "--", "/opt/tool", "--flag", "two words"]));
        assert!(inv.env.is_empty());
    }
}
