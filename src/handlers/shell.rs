//! Shell commands, run without elevation.
use crate::error::OperationError;
use crate::exec::{CommandOutcome, Invocation, powershell_encoded};
use crate::operation::ShellSpec;

use super::Context;

/// Build the shell invocation: encoded `PowerShell` on Windows, `sh -c` elsewhere.
///
/// # Errors
///
/// Fails if the command text is empty.
pub fn prepare(spec: &ShellSpec, ctx: &Context) -> Result<Invocation, OperationError> {
    if spec.command_text.trim().is_empty() {
        return Err(OperationError::validation("shell command is missing"));
    }
    Ok(if ctx.platform.is_windows() {
        powershell_encoded(&spec.command_text)
    } else {
        Invocation::new("sh").args(["-c", spec.command_text.as_str()])
    })
}

/// Run one shell command.
#[must_use]
pub fn run(spec: &ShellSpec, ctx: &Context) -> CommandOutcome {
    match prepare(spec, ctx) {
        Ok(invocation) => ctx
            .executor
            .run(&invocation, ctx.settings.timeouts.command()),
        Err(e) => CommandOutcome::failed(e),
    }
}
