//! Side-effect-free seams for `--dry-run`.
//!
//! Each fake logs what it would have done and reports success, so the engine
//! walks the whole batch with real validation and real event narration.
use std::path::Path;
use std::time::Duration;

use crate::elevation::ElevatedLauncher;
use crate::error::OperationError;
use crate::exec::{CommandOutcome, Executor, Invocation};
use crate::logging::DRY_RUN_TARGET;
use crate::operation::{Scope, TypedValue};
use crate::store::ConfigStore;

/// Executor that logs invocations instead of spawning them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

impl Executor for DryRunExecutor {
    fn run(&self, invocation: &Invocation, _timeout: Duration) -> CommandOutcome {
        tracing::info!(target: DRY_RUN_TARGET, "would run: {invocation}");
        CommandOutcome::ok("")
    }

    fn which(&self, _program: &str) -> bool {
        true
    }
}

/// Launcher that logs elevated launches instead of performing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunLauncher;

impl ElevatedLauncher for DryRunLauncher {
    fn run_elevated(&self, program: &Path, args: &[String], _timeout: Duration) -> CommandOutcome {
        let invocation = Invocation::new(program.display().to_string()).args(args.iter().cloned());
        tracing::info!(target: DRY_RUN_TARGET, "would run elevated: {invocation}");
        CommandOutcome::ok("")
    }
}

/// Store that logs writes instead of persisting them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunStore;

impl ConfigStore for DryRunStore {
    fn write(
        &self,
        scope: Scope,
        key_path: &str,
        value_name: &str,
        value: &TypedValue,
    ) -> Result<(), OperationError> {
        let rendered = match value {
            TypedValue::Dword(v) => format!("{v} (dword)"),
            TypedValue::Text(s) => format!("\"{s}\" (string)"),
        };
        tracing::info!(
            target: DRY_RUN_TARGET,
            "would set {scope}\\{key_path}\\{value_name} = {rendered}"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::elevation::PrivilegeContext;
    use crate::engine::{CancelToken, Engine};
    use crate::handlers::{Context, Handlers};
    use crate::operation::{ConfigData, Operation, OperationKind};
    use crate::operations::MockFileSystemOps;
    use std::sync::Arc;
    use std::sync::mpsc;

    #[test]
    fn executor_reports_success_without_spawning() {
        let outcome = DryRunExecutor.run(
            &Invocation::new("definitely-not-a-real-program-xyz"),
            Duration::from_secs(1),
        );
        assert!(outcome.success);
        assert!(DryRunExecutor.which("winget"));
    }

    #[test]
    fn store_accepts_writes() {
        DryRunStore
            .write(Scope::Machine, "SOFTWARE\\X", "Y", &TypedValue::Dword(0))
            .unwrap();
    }

    #[test]
    fn dry_run_batch_succeeds_but_still_validates() {
        let ctx = Context::new(
            Arc::new(DryRunExecutor),
            Arc::new(DryRunLauncher),
            Arc::new(DryRunStore),
            PrivilegeContext::standard(),
        )
        .with_fs(Arc::new(MockFileSystemOps::new().with_file("/setup/Tools/fix.ps1")))
        .with_root("/setup");
        let batch = [
            Operation::unnamed(OperationKind::package_install("Mozilla.Firefox")),
            Operation::unnamed(OperationKind::tool("Tools/fix.ps1")),
            Operation::unnamed(OperationKind::config_value(
                "Software\\X",
                "Y",
                ConfigData::Integer(1),
                Scope::User,
            )),
            Operation::unnamed(OperationKind::shell("")),
        ];
        let (tx, _rx) = mpsc::channel();
        let result = Engine::new(Handlers::new(ctx)).run(&batch, &CancelToken::new(), &tx);
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failed, 1, "an empty command still fails validation");
    }
}
