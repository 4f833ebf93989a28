//! `run`: confirm, execute a batch, and report the outcome.
use std::io::IsTerminal as _;
use std::path::Path;

use anyhow::{Context as _, Result, bail};

use super::CommandSetup;
use super::console::{ConsoleObserver, JsonObserver, Observer};
use super::plan::{self, Plan};
use crate::cli::{EventFormat, GlobalOpts, RunOpts};
use crate::config::batch::{self, STDIN_PATH};
use crate::engine::{CancelToken, Engine, ExecutionResult};
use crate::logging::Logger;
use crate::operation::Operation;

/// Run the `run` command.
///
/// # Errors
///
/// Returns an error if settings or the batch cannot be loaded, confirmation
/// is refused, the run is cancelled, or any operation fails.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: &Logger) -> Result<()> {
    log.info(&format!("postinstall {}", crate::VERSION));
    let setup = CommandSetup::init(global, log)?;

    log.stage("Loading batch");
    let batch = batch::load(&opts.batch)
        .with_context(|| format!("loading batch {}", opts.batch.display()))?;
    log.info(&format!(
        "loaded {} operation(s) from {}",
        batch.len(),
        opts.batch.display()
    ));

    if !batch.is_empty() {
        let plan = Plan::new(&batch);
        plan.log(log);
        if !opts.yes && !setup.dry_run {
            ensure_confirmed(&plan, &opts.batch)?;
        }
    }

    log.stage(if setup.dry_run {
        "Executing (dry run)"
    } else {
        "Executing"
    });
    let result = execute(Engine::new(setup.handlers()), batch, opts.events, log)?;
    log.print_log_location();
    outcome(&result)
}

/// Start the engine, forward Ctrl-C to its cancel flag, and drain events
/// into the observer for `format` until the run finishes.
///
/// # Errors
///
/// Returns an error if the worker cannot be started or joined, or an event
/// cannot be written out (the run is cancelled in that case).
pub fn execute(
    engine: Engine,
    batch: Vec<Operation>,
    format: EventFormat,
    log: &Logger,
) -> Result<ExecutionResult> {
    let handle = engine.start(batch)?;
    install_interrupt_handler(handle.cancel_token());

    let mut observer: Box<dyn Observer + '_> = match format {
        EventFormat::Text => Box::new(ConsoleObserver::new(log)),
        EventFormat::Json => Box::new(JsonObserver::new(std::io::stdout())),
    };
    let mut failure = None;
    for event in handle.events() {
        if failure.is_none()
            && let Err(e) = observer.observe(&event)
        {
            handle.cancel_token().cancel();
            failure = Some(e);
        }
    }
    let result = handle.join()?;
    if let Some(e) = failure {
        return Err(e);
    }
    Ok(result)
}

/// Map a finished run to the process outcome.
///
/// # Errors
///
/// Returns an error if the run was cancelled or any operation failed.
pub fn outcome(result: &ExecutionResult) -> Result<()> {
    if result.was_cancelled() {
        bail!(
            "run cancelled after {} of {} operation(s)",
            result.processed(),
            result.total
        );
    }
    if result.failed > 0 {
        bail!("{} of {} operation(s) failed", result.failed, result.total);
    }
    Ok(())
}

fn ensure_confirmed(plan: &Plan, batch_path: &Path) -> Result<()> {
    let stdin = std::io::stdin();
    if batch_path.as_os_str() == STDIN_PATH || !stdin.is_terminal() {
        bail!("confirmation required but stdin is not interactive; pass --yes to run anyway");
    }
    if !plan::confirm(plan, &mut stdin.lock(), &mut std::io::stderr())? {
        bail!("aborted: execution not confirmed");
    }
    Ok(())
}

/// Route Ctrl-C to `token`; repeats are ignored until the worker notices.
fn install_interrupt_handler(token: CancelToken) {
    if let Err(e) = ctrlc::set_handler(move || {
        if !token.is_cancelled() {
            token.cancel();
            tracing::warn!("cancellation requested; stopping after the current operation");
        }
    }) {
        tracing::debug!("interrupt handler not installed: {e}");
    }
}
