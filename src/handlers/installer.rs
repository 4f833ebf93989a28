//! Local installer files, run silently and elevated.
use crate::error::OperationError;
use crate::exec::CommandOutcome;
use crate::operation::{InstallerKind, InstallerSpec};

use super::{Context, ElevatedRun};

/// Resolve the installer and its silent-install command.
///
/// # Errors
///
/// Fails if the file does not exist, or for package formats the platform
/// cannot install.
pub fn prepare(spec: &InstallerSpec, ctx: &Context) -> Result<ElevatedRun, OperationError> {
    let path = ctx.require_file("installer", &spec.file_path)?;
    let kind = spec
        .installer_kind
        .unwrap_or_else(|| InstallerKind::from_path(&path));
    let target = path.display().to_string();
    match kind {
        InstallerKind::Exe => Ok(ElevatedRun::new(path, ["/S"])),
        InstallerKind::Msi | InstallerKind::Msix if !ctx.platform.is_windows() => Err(
            OperationError::Unsupported(format!("{kind} installers require Windows")),
        ),
        InstallerKind::Msi => Ok(ElevatedRun::new(
            "msiexec",
            ["/i", target.as_str(), "/quiet", "/norestart", "/qn"],
        )),
        InstallerKind::Msix => Ok(ElevatedRun::new(
            "powershell",
            [
                "-NoProfile".to_string(),
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-Command".to_string(),
                format!(
                    "Add-AppxPackage -Path '{}' -ErrorAction Stop",
                    target.replace('\'', "''")
                ),
            ],
        )),
    }
}

/// Run one installer.
#[must_use]
pub fn run(spec: &InstallerSpec, ctx: &Context) -> CommandOutcome {
    match prepare(spec, ctx) {
        Ok(run) => run.launch(ctx),
        Err(e) => CommandOutcome::failed(e),
    }
}
