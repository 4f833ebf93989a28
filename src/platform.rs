//! Host platform detection: OS family, elevation, installation root.
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::elevation::PrivilegeContext;
use crate::exec::{Executor, Invocation};

/// Bound on the elevation probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux and other Unix-like systems.
    Linux,
    /// Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Platform information for the current system.
///
/// Handlers pick their command shapes (shell, installer switches) from this
/// value rather than from `cfg!`, so Windows invocations are testable anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub const fn detect() -> Self {
        Self {
            os: if cfg!(target_os = "windows") {
                Os::Windows
            } else {
                Os::Linux
            },
        }
    }

    /// Create a platform with an explicit OS.
    #[must_use]
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// Whether this is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Probe whether the current process holds administrator rights.
    ///
    /// Windows: `net session` only succeeds for administrators.
    /// Elsewhere: the effective user id is 0.
    #[must_use]
    pub fn detect_privilege(&self, executor: &dyn Executor) -> PrivilegeContext {
        let elevated = if self.is_windows() {
            executor
                .run(&Invocation::new("net").arg("session"), PROBE_TIMEOUT)
                .success
        } else {
            let outcome = executor.run(&Invocation::new("id").arg("-u"), PROBE_TIMEOUT);
            outcome.success && outcome.stdout.trim() == "0"
        };
        tracing::debug!("elevated: {elevated}");
        PrivilegeContext { elevated }
    }
}

/// Directory containing the running executable, canonicalized.
///
/// Falls back to the current directory when the executable path is unknown.
#[must_use]
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
        .and_then(|dir| dunce::canonicalize(dir).ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::CommandOutcome;
    use crate::handlers::test_helpers::MockExecutor;

    #[test]
    fn platform_detect_matches_target() {
        let p = Platform::detect();
        assert_eq!(p.is_windows(), cfg!(target_os = "windows"));
    }

    #[test]
    fn os_display() {
        assert_eq!(Os::Linux.to_string(), "linux");
        assert_eq!(Os::Windows.to_string(), "windows");
    }

    #[test]
    fn unix_root_user_is_elevated() {
        let executor = MockExecutor::ok("0\n");
        let ctx = Platform::new(Os::Linux).detect_privilege(&executor);
        assert!(ctx.elevated);
        assert_eq!(executor.invocations()[0], Invocation::new("id").arg("-u"));
    }

    #[test]
    fn unix_regular_user_is_not_elevated() {
        let executor = MockExecutor::ok("1000\n");
        assert!(!Platform::new(Os::Linux).detect_privilege(&executor).elevated);
    }

    #[test]
    fn windows_probe_uses_net_session() {
        let executor = MockExecutor::with_outcomes(vec![CommandOutcome::from_exit(
            Some(2),
            String::new(),
            "System error 5 has occurred.".into(),
        )]);
        let ctx = Platform::new(Os::Windows).detect_privilege(&executor);
        assert!(!ctx.elevated);
        assert_eq!(executor.invocations()[0].program, "net");
    }

    #[test]
    fn executable_dir_exists() {
        assert!(executable_dir().exists());
    }
}
