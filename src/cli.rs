//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI entry point for the post-install operation runner.
#[derive(Parser, Debug)]
#[command(
    name = "postinstall",
    about = "Run a batch of post-install operations: packages, settings, installers, tools",
    version = crate::VERSION
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Flags shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Installation root for relative installer, tool and executable paths
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Settings file (defaults to <root>/postinstall.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Treat the process as elevated without probing
    #[arg(long, global = true)]
    pub assume_elevated: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a batch of operations in order
    Run(RunOpts),
    /// Check a batch's preconditions without running anything
    Check(CheckOpts),
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// How the `run` subcommand reports engine events.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventFormat {
    /// Human-readable console output with a progress line.
    #[default]
    Text,
    /// One JSON object per event on stdout.
    Json,
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunOpts {
    /// Batch file (.toml or .json), or `-` for JSON on stdin
    pub batch: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Event output format
    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    pub events: EventFormat,
}

/// Options for the `check` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CheckOpts {
    /// Batch file (.toml or .json), or `-` for JSON on stdin
    pub batch: PathBuf,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

impl Command {
    /// Name used for the log file of this command.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Check(_) => "check",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["postinstall", "run", "batch.toml"]);
        let Command::Run(opts) = cli.command else {
            unreachable!("expected run");
        };
        assert_eq!(opts.batch, PathBuf::from("batch.toml"));
        assert!(!opts.yes);
        assert_eq!(opts.events, EventFormat::Text);
        assert!(!cli.global.dry_run);
    }

    #[test]
    fn parse_run_with_flags() {
        let cli = Cli::parse_from([
            "postinstall",
            "-d",
            "--root",
            "C:/Setup",
            "run",
            "-",
            "--yes",
            "--events",
            "json",
        ]);
        assert!(cli.global.dry_run);
        assert_eq!(cli.global.root, Some(PathBuf::from("C:/Setup")));
        assert!(
            matches!(&cli.command, Command::Run(o) if o.yes && o.events == EventFormat::Json)
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "postinstall",
            "check",
            "b.json",
            "--assume-elevated",
            "--config",
            "alt.toml",
            "-v",
        ]);
        assert!(cli.global.assume_elevated);
        assert!(cli.verbose);
        assert_eq!(cli.global.config, Some(PathBuf::from("alt.toml")));
        assert_eq!(cli.command.log_name(), "check");
    }

    #[test]
    fn run_requires_batch() {
        assert!(Cli::try_parse_from(["postinstall", "run"]).is_err());
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["postinstall", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Command::Completions(CompletionsOpts {
                shell: clap_complete::Shell::Bash
            })
        ));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["postinstall", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }
}
