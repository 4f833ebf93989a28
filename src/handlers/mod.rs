//! Operation handlers: one module per operation kind.
//!
//! Each handler module exposes a `prepare` step that checks preconditions and
//! resolves what to launch (never spawning anything), and a `run` step that
//! performs the work and returns a [`CommandOutcome`]. [`Handlers`] is the
//! exhaustive dispatcher the engine calls.
pub mod executable;
pub mod installer;
pub mod package;
pub mod registry;
pub mod shell;
pub mod tool;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::elevation::{ElevatedLauncher, PrivilegeContext};
use crate::error::OperationError;
use crate::exec::{CommandOutcome, Executor};
use crate::operation::{Operation, OperationKind};
use crate::operations::{FileSystemOps, SystemFileSystemOps, resolve_under};
use crate::platform::Platform;
use crate::store::ConfigStore;

/// Everything a handler may touch, fixed for the whole run.
#[derive(Debug, Clone)]
pub struct Context {
    /// Runs non-elevated processes.
    pub executor: Arc<dyn Executor>,
    /// Runs elevated processes.
    pub launcher: Arc<dyn ElevatedLauncher>,
    /// Persistent configuration store.
    pub store: Arc<dyn ConfigStore>,
    /// Filesystem queries (target existence checks).
    pub fs: Arc<dyn FileSystemOps>,
    /// Elevation state detected once by the caller.
    pub privilege: PrivilegeContext,
    /// Decides command shapes (shell, installer switches).
    pub platform: Platform,
    /// Base for relative installer, tool and executable paths.
    pub root: PathBuf,
    /// Package manager, timeouts and excerpt limits.
    pub settings: Settings,
}

impl Context {
    /// Create a context for the detected platform with default settings.
    #[must_use]
    pub fn new(
        executor: Arc<dyn Executor>,
        launcher: Arc<dyn ElevatedLauncher>,
        store: Arc<dyn ConfigStore>,
        privilege: PrivilegeContext,
    ) -> Self {
        Self {
            executor,
            launcher,
            store,
            fs: Arc::new(SystemFileSystemOps),
            privilege,
            platform: Platform::detect(),
            root: PathBuf::from("."),
            settings: Settings::default(),
        }
    }

    /// Replace the filesystem used for existence checks.
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn FileSystemOps>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the platform.
    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Set the installation root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Replace the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolve `path` under the installation root and require a regular file.
    ///
    /// `what` names the target in messages (`"installer"`, `"tool"`, ...).
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty path and a not-found error
    /// naming the resolved path when no such file exists.
    pub fn require_file(&self, what: &str, path: &Path) -> Result<PathBuf, OperationError> {
        if path.as_os_str().is_empty() {
            return Err(OperationError::validation(format!("{what} path is missing")));
        }
        let resolved = resolve_under(&self.root, path);
        tracing::debug!("{what} path {} -> {}", path.display(), resolved.display());
        if self.fs.is_file(&resolved) {
            Ok(resolved)
        } else {
            Err(OperationError::not_found(what, resolved.display().to_string()))
        }
    }
}

/// A program and its arguments, to be run through the elevated launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatedRun {
    /// Program to elevate.
    pub program: PathBuf,
    /// Arguments, passed through one by one.
    pub args: Vec<String>,
}

impl ElevatedRun {
    /// Describe an elevated run of `program` with `args`.
    #[must_use]
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Launch elevated with the install time bound.
    #[must_use]
    pub fn launch(&self, ctx: &Context) -> CommandOutcome {
        ctx.launcher
            .run_elevated(&self.program, &self.args, ctx.settings.timeouts.install())
    }
}

/// Exhaustive dispatcher from [`OperationKind`] to its handler.
#[derive(Debug, Clone)]
pub struct Handlers {
    ctx: Context,
}

impl Handlers {
    /// Create a dispatcher over `ctx`.
    #[must_use]
    pub const fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// The context handlers run with.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// Check preconditions without launching anything or writing anywhere.
    ///
    /// # Errors
    ///
    /// Returns the error [`handle`](Self::handle) would fail with before
    /// doing any work.
    pub fn validate(&self, op: &Operation) -> Result<(), OperationError> {
        let ctx = &self.ctx;
        match &op.kind {
            OperationKind::PackageInstall(spec) => {
                package::prepare(package::Verb::Install, spec, ctx).map(drop)
            }
            OperationKind::PackageUninstall(spec) => {
                package::prepare(package::Verb::Uninstall, spec, ctx).map(drop)
            }
            OperationKind::ShellCommand(spec) => shell::prepare(spec, ctx).map(drop),
            OperationKind::ConfigValue(spec) => registry::prepare(spec, ctx).map(drop),
            OperationKind::LocalInstaller(spec) => installer::prepare(spec, ctx).map(drop),
            OperationKind::ToolInvocation(spec) => tool::prepare(spec, ctx).map(drop),
            OperationKind::Executable(spec) => executable::prepare(spec, ctx).map(drop),
            OperationKind::Unrecognized { kind } => Err(unknown_kind(kind)),
        }
    }

    /// Run one operation. Never panics or errors: failures are outcomes.
    #[must_use]
    pub fn handle(&self, op: &Operation) -> CommandOutcome {
        let ctx = &self.ctx;
        match &op.kind {
            OperationKind::PackageInstall(spec) => package::run(package::Verb::Install, spec, ctx),
            OperationKind::PackageUninstall(spec) => {
                package::run(package::Verb::Uninstall, spec, ctx)
            }
            OperationKind::ShellCommand(spec) => shell::run(spec, ctx),
            OperationKind::ConfigValue(spec) => registry::run(spec, ctx),
            OperationKind::LocalInstaller(spec) => installer::run(spec, ctx),
            OperationKind::ToolInvocation(spec) => tool::run(spec, ctx),
            OperationKind::Executable(spec) => executable::run(spec, ctx),
            OperationKind::Unrecognized { kind } => CommandOutcome::failed(unknown_kind(kind)),
        }
    }

    /// Diagnostic text for a failed outcome, before length truncation.
    ///
    /// Tool processes report both streams, each cut to the excerpt limit.
    /// Everything else reports stderr, else stdout, else a kind default.
    #[must_use]
    pub fn failure_message(&self, op: &Operation, outcome: &CommandOutcome) -> String {
        let ran = !outcome
            .error
            .as_ref()
            .is_some_and(OperationError::is_precondition);
        if matches!(op.kind, OperationKind::ToolInvocation(_)) && ran {
            return tool::failure_detail(outcome, self.ctx.settings.stream_excerpt_chars)
                .unwrap_or_else(|| op.kind.default_failure().to_string());
        }
        [outcome.stderr.trim(), outcome.stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map_or_else(|| op.kind.default_failure().to_string(), str::to_string)
    }
}

fn unknown_kind(kind: &str) -> OperationError {
    OperationError::UnknownKind(if kind.is_empty() {
        "(missing)".to_string()
    } else {
        kind.to_string()
    })
}
