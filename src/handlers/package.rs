//! Package install and removal through the package manager CLI.
use crate::error::OperationError;
use crate::exec::{CommandOutcome, Invocation};
use crate::operation::PackageSpec;

use super::Context;

/// Which package manager verb to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `install`
    Install,
    /// `uninstall`
    Uninstall,
}

impl Verb {
    fn args(self, package_id: &str) -> Vec<&str> {
        match self {
            Self::Install => vec![
                "install",
                "--id",
                package_id,
                "--exact",
                "--silent",
                "--accept-package-agreements",
                "--accept-source-agreements",
                "--disable-interactivity",
            ],
            Self::Uninstall => vec![
                "uninstall",
                "--id",
                package_id,
                "--exact",
                "--silent",
                "--disable-interactivity",
            ],
        }
    }
}

/// Build the package manager invocation.
///
/// # Errors
///
/// Fails if the package ID is empty or the package manager is not on `PATH`.
pub fn prepare(verb: Verb, spec: &PackageSpec, ctx: &Context) -> Result<Invocation, OperationError> {
    let package_id = spec.package_id.trim();
    if package_id.is_empty() {
        return Err(OperationError::validation("package ID is missing"));
    }
    let manager = &ctx.settings.package_manager;
    if !ctx.executor.which(manager) {
        return Err(OperationError::not_found("package manager", manager.as_str()));
    }
    Ok(Invocation::new(manager.as_str()).args(verb.args(package_id)))
}

/// Install or remove one package.
#[must_use]
pub fn run(verb: Verb, spec: &PackageSpec, ctx: &Context) -> CommandOutcome {
    match prepare(verb, spec, ctx) {
        Ok(invocation) => ctx
            .executor
            .run(&invocation, ctx.settings.timeouts.install()),
        Err(e) => CommandOutcome::failed(e),
    }
}
