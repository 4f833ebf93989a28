//! Executables with arguments, elevated unless told otherwise.
use crate::error::OperationError;
use crate::exec::{CommandOutcome, Invocation};
use crate::operation::{ExecutableSpec, ToolKind};

use super::tool::require_cmd_safe;
use super::{Context, ElevatedRun};

/// Resolve the executable and keep its arguments as given.
///
/// # Errors
///
/// Fails if the path is empty or the file does not exist. A batch file on
/// Windows is started through `cmd.exe`, so its path and arguments must not
/// carry characters `cmd.exe` would interpret.
pub fn prepare(spec: &ExecutableSpec, ctx: &Context) -> Result<ElevatedRun, OperationError> {
    let path = ctx.require_file("executable", &spec.file_path)?;
    if ctx.platform.is_windows() && matches!(ToolKind::from_path(&path), ToolKind::Batch) {
        require_cmd_safe("batch executable path", &path.display().to_string())?;
        for arg in &spec.args {
            require_cmd_safe("batch executable argument", arg)?;
        }
    }
    Ok(ElevatedRun::new(path, spec.args.iter().cloned()))
}

/// Run one executable.
#[must_use]
pub fn run(spec: &ExecutableSpec, ctx: &Context) -> CommandOutcome {
    let run = match prepare(spec, ctx) {
        Ok(run) => run,
        Err(e) => return CommandOutcome::failed(e),
    };
    if spec.elevated {
        return run.launch(ctx);
    }
    let invocation = Invocation::new(run.program.display().to_string()).args(run.args);
    ctx.executor
        .run(&invocation, ctx.settings.timeouts.install())
}
