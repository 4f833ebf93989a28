//! Command: print version information.
use std::io::Write as _;

/// Print the postinstall version to stdout.
pub fn run() {
    writeln!(std::io::stdout(), "postinstall {}", crate::VERSION).ok();
}
