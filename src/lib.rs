//! Post-install operation engine.
//!
//! Runs an ordered batch of heterogeneous system-configuration operations on
//! a fresh machine: package installs and removals, shell commands, registry
//! values, local installers, tools, and arbitrary executables. Failures are
//! contained per operation, cancellation is cooperative, and every step is
//! narrated through an ordered event stream.
//!
//! The public API is organised into layers:
//!
//! - **[`operation`]**: the closed set of operation kinds and their fields
//! - **[`config`]**: settings and batch files (TOML / JSON)
//! - **[`exec`]**, **[`elevation`]**, **[`store`]**: the process, elevation and
//!   configuration-store seams
//! - **[`handlers`]**: one handler per kind, behind an exhaustive dispatcher
//! - **[`engine`]**: the sequential run loop, cancel flag, and events
//! - **[`commands`]**: top-level subcommand orchestration (`run`, `check`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod dry_run;
pub mod elevation;
pub mod engine;
pub mod error;
pub mod exec;
pub mod handlers;
pub mod logging;
pub mod operation;
pub mod operations;
pub mod platform;
pub mod store;

/// Version string: `POSTINSTALL_VERSION` at build time, else the crate version.
pub const VERSION: &str = match option_env!("POSTINSTALL_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
