//! Pre-run plan: what a batch is about to do, and the confirmation prompt.
use std::io::{BufRead, Write};

use anyhow::{Context as _, Result};

use crate::logging::Logger;
use crate::operation::{Operation, OperationKind};

/// Display-name fragment that marks an operation as high-risk.
const HIGH_RISK_MARKER: &str = "defender";

/// Counts per category plus the high-risk operations, in batch order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Operations in the batch.
    pub total: usize,
    /// Package and local installers.
    pub installs: usize,
    /// Package removals.
    pub removals: usize,
    /// Shell commands.
    pub shell_commands: usize,
    /// Configuration values.
    pub settings: usize,
    /// Tools and executables.
    pub tools: usize,
    /// Operations with an unknown kind.
    pub unrecognized: usize,
    /// Display names flagged as high-risk.
    pub high_risk: Vec<String>,
}

impl Plan {
    /// Summarise `batch`.
    #[must_use]
    pub fn new(batch: &[Operation]) -> Self {
        let mut plan = Self {
            total: batch.len(),
            ..Self::default()
        };
        for op in batch {
            match op.kind {
                OperationKind::PackageInstall(_) | OperationKind::LocalInstaller(_) => {
                    plan.installs += 1;
                }
                OperationKind::PackageUninstall(_) => plan.removals += 1,
                OperationKind::ShellCommand(_) => plan.shell_commands += 1,
                OperationKind::ConfigValue(_) => plan.settings += 1,
                OperationKind::ToolInvocation(_) | OperationKind::Executable(_) => {
                    plan.tools += 1;
                }
                OperationKind::Unrecognized { .. } => plan.unrecognized += 1,
            }
            if op.display_name.to_lowercase().contains(HIGH_RISK_MARKER) {
                plan.high_risk.push(op.display_name.clone());
            }
        }
        plan
    }

    /// Summary lines, skipping empty categories.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Total: {} operation(s)", self.total)];
        for (count, label) in [
            (self.installs, "application(s) to install"),
            (self.removals, "package(s) to remove"),
            (self.shell_commands, "shell command(s)"),
            (self.settings, "setting(s) to change"),
            (self.tools, "tool(s) to run"),
            (self.unrecognized, "unrecognized operation(s)"),
        ] {
            if count > 0 {
                lines.push(format!("  • {count} {label}"));
            }
        }
        lines
    }

    /// Whether the confirmation must be typed out in full.
    #[must_use]
    pub fn is_high_risk(&self) -> bool {
        !self.high_risk.is_empty()
    }

    /// Log the plan, warning once per high-risk operation.
    pub fn log(&self, log: &Logger) {
        log.stage("Plan");
        for line in self.lines() {
            log.info(&line);
        }
        if self.is_high_risk() {
            log.warn("the following operations remove or disable Windows Defender protection:");
            for name in &self.high_risk {
                log.warn(&format!("  • {name}"));
            }
            log.warn("this significantly reduces system security and is difficult to reverse");
        }
    }
}

/// Ask for confirmation on `output`, reading the answer from `input`.
///
/// Normal plans accept `y`/`yes`; high-risk plans accept only `yes`.
/// End of input counts as a refusal.
///
/// # Errors
///
/// Returns an error if the prompt cannot be written or the answer read.
pub fn confirm(plan: &Plan, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    let prompt = if plan.is_high_risk() {
        "This will make system-level changes, including the operations above. Type 'yes' to continue: "
    } else {
        "This will make system-level changes. Continue? [y/N] "
    };
    write!(output, "{prompt}").context("writing confirmation prompt")?;
    output.flush().context("writing confirmation prompt")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("reading confirmation")?;
    let answer = answer.trim().to_lowercase();
    Ok(if plan.is_high_risk() {
        answer == "yes"
    } else {
        matches!(answer.as_str(), "y" | "yes")
    })
}
