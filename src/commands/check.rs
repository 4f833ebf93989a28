//! `check`: validate a batch without running it.
use anyhow::{Context as _, Result, bail};

use super::CommandSetup;
use crate::cli::{CheckOpts, GlobalOpts};
use crate::config::batch;
use crate::error::OperationError;
use crate::handlers::Handlers;
use crate::logging::Logger;
use crate::operation::Operation;

/// Run the `check` command: precondition checks only, nothing is launched.
///
/// # Errors
///
/// Returns an error if settings or the batch cannot be loaded, or any
/// operation would fail its preconditions.
pub fn run(global: &GlobalOpts, opts: &CheckOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;

    log.stage("Loading batch");
    let batch = batch::load(&opts.batch)
        .with_context(|| format!("loading batch {}", opts.batch.display()))?;

    log.stage("Checking preconditions");
    let results = validate_all(&setup.handlers(), &batch);
    for (index, (op, result)) in batch.iter().zip(&results).enumerate() {
        match result {
            Ok(()) => log.success(&format!("✓ {}. {}", index + 1, op.display_name)),
            Err(e) => log.error(&format!("✗ {}. {}: {e}", index + 1, op.display_name)),
        }
    }

    let failures = results.iter().filter(|r| r.is_err()).count();
    log.info(&format!(
        "{} operation(s) checked, {failures} would fail",
        batch.len()
    ));
    if failures > 0 {
        bail!("{failures} of {} operation(s) would fail", batch.len());
    }
    Ok(())
}

/// Validate every operation in order.
#[must_use]
pub fn validate_all(handlers: &Handlers, batch: &[Operation]) -> Vec<Result<(), OperationError>> {
    batch.iter().map(|op| handlers.validate(op)).collect()
}
