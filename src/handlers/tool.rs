//! Tool files (executables, scripts, batch files), always run elevated.
use crate::error::OperationError;
use crate::exec::CommandOutcome;
use crate::operation::{ToolKind, ToolSpec};

use super::{Context, ElevatedRun};

/// Characters `cmd.exe` would act on when it re-parses its command line.
///
/// `%` and `!` expand variables even inside quotes, and `cmd /c` offers no
/// escape for them, so paths carrying any of these are refused outright.
/// Parentheses and `@` stop `cmd` from keeping the quotes around a path
/// with spaces.
const CMD_METACHARACTERS: [char; 11] = ['%', '!', '^', '&', '|', '<', '>', '"', '(', ')', '@'];

/// Refuse `text` if `cmd.exe` would interpret any of its characters.
///
/// # Errors
///
/// Returns a validation error naming the first offending character.
pub fn require_cmd_safe(what: &str, text: &str) -> Result<(), OperationError> {
    match text.chars().find(|c| CMD_METACHARACTERS.contains(c)) {
        Some(c) => Err(OperationError::validation(format!(
            "{what} contains '{c}', which cmd.exe would interpret: {text}"
        ))),
        None => Ok(()),
    }
}

/// Resolve the tool and the command that runs it.
///
/// # Errors
///
/// Fails if the file does not exist, for batch files off Windows, and for
/// batch paths `cmd.exe` would re-interpret.
pub fn prepare(spec: &ToolSpec, ctx: &Context) -> Result<ElevatedRun, OperationError> {
    let path = ctx.require_file("tool", &spec.file_path)?;
    let kind = spec.tool_kind.unwrap_or_else(|| ToolKind::from_path(&path));
    let target = path.display().to_string();
    match kind {
        ToolKind::Exe => Ok(ElevatedRun::new(path, Vec::<String>::new())),
        ToolKind::Script => {
            let shell = if ctx.platform.is_windows() {
                "powershell"
            } else {
                "pwsh"
            };
            Ok(ElevatedRun::new(
                shell,
                ["-NoProfile", "-ExecutionPolicy", "Bypass", "-File", target.as_str()],
            ))
        }
        ToolKind::Batch if ctx.platform.is_windows() => {
            require_cmd_safe("batch tool path", &target)?;
            Ok(ElevatedRun::new("cmd", ["/d", "/c", target.as_str()]))
        }
        ToolKind::Batch => Err(OperationError::Unsupported(format!(
            "{kind} tools require Windows"
        ))),
    }
}

/// Run one tool.
#[must_use]
pub fn run(spec: &ToolSpec, ctx: &Context) -> CommandOutcome {
    match prepare(spec, ctx) {
        Ok(run) => run.launch(ctx),
        Err(e) => CommandOutcome::failed(e),
    }
}

/// Both captured streams, each cut to `limit` characters, or `None` if both are empty.
#[must_use]
pub fn failure_detail(outcome: &CommandOutcome, limit: usize) -> Option<String> {
    let parts: Vec<String> = [("STDERR", &outcome.stderr), ("STDOUT", &outcome.stdout)]
        .into_iter()
        .map(|(label, text)| (label, text.trim()))
        .filter(|(_, text)| !text.is_empty())
        .map(|(label, text)| format!("{label}: {}", text.chars().take(limit).collect::<String>()))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" | "))
}
