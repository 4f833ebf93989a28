//! `postinstall` command-line entry point.

use anyhow::Result;
use clap::Parser;

use postinstall_cli::cli::{self, Command, EventFormat};
use postinstall_cli::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let stdout_reserved = matches!(&args.command, Command::Run(o) if o.events == EventFormat::Json);
    let command = args.command.log_name();

    match &args.command {
        Command::Run(opts) => {
            logging::init_subscriber(args.verbose, command, stdout_reserved);
            let log = logging::Logger::new(command);
            commands::run::run(&args.global, opts, &log)
        }
        Command::Check(opts) => {
            logging::init_subscriber(args.verbose, command, stdout_reserved);
            let log = logging::Logger::new(command);
            commands::check::run(&args.global, opts, &log)
        }
        Command::Completions(opts) => {
            commands::completions::run(opts);
            Ok(())
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
