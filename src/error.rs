//! Domain-specific error types for the post-install engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Handlers return [`OperationError`], which the engine folds into a failed
//! [`CommandOutcome`](crate::exec::CommandOutcome) instead of propagating.
//! Loading settings and batch files returns [`ConfigError`], which command
//! handlers at the CLI boundary convert to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! PostinstallError
//! ├── Config(ConfigError)       : settings and batch file loading
//! └── Operation(OperationError) : a single operation failed
//! ```

use thiserror::Error;

/// Message used for every insufficient-privilege failure.
pub const ADMIN_REQUIRED: &str = "administrator privileges required";

/// Top-level error type for the post-install engine.
#[derive(Error, Debug)]
pub enum PostinstallError {
    /// Settings or batch file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation failed.
    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),
}

/// Errors that arise while loading settings and batch files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a file.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML/JSON or does not match the expected shape.
    #[error("Invalid syntax in {file}: {message}")]
    InvalidSyntax {
        /// File that failed to parse.
        file: String,
        /// Parser message.
        message: String,
    },

    /// A batch entry has a field of the wrong type.
    #[error("Invalid operation #{index} in {file}: {message}")]
    InvalidOperation {
        /// File the batch was read from.
        file: String,
        /// One-based position of the entry in the batch.
        index: usize,
        /// Deserializer message.
        message: String,
    },

    /// The batch file extension is not recognised.
    #[error("Unsupported batch format '{0}': expected .toml or .json")]
    UnsupportedFormat(String),
}

/// Errors that arise while handling a single operation.
///
/// Every variant carries owned strings only so outcomes can be cloned and
/// compared in tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// A required field is missing or malformed. No process is launched.
    #[error("{0}")]
    Validation(String),

    /// The target file or program does not exist.
    #[error("{what} not found: {target}")]
    NotFound {
        /// What was looked for (e.g. `"tool"`, `"package manager"`).
        what: String,
        /// Resolved path or program name.
        target: String,
    },

    /// The process exceeded its time bound and was terminated.
    #[error("timed out after {seconds} seconds")]
    Timeout {
        /// The bound that was exceeded.
        seconds: u64,
    },

    /// Elevation was denied or the caller lacks the required rights.
    #[error("{0}")]
    Permission(String),

    /// The process ran and exited non-zero.
    #[error("process exited with code {code}")]
    Process {
        /// Exit code (`-1` when terminated by a signal).
        code: i32,
    },

    /// The process could not be started at all.
    #[error("failed to launch {program}: {reason}")]
    Launch {
        /// Program that was being started.
        program: String,
        /// Underlying OS error text.
        reason: String,
    },

    /// The configuration store rejected a write for a reason other than rights.
    #[error("failed to write {target}: {reason}")]
    Store {
        /// `scope\key\value` being written.
        target: String,
        /// Underlying OS error text.
        reason: String,
    },

    /// The operation is not available on this platform.
    #[error("{0}")]
    Unsupported(String),

    /// The operation tag is not one the engine knows.
    #[error("unknown operation kind: {0}")]
    UnknownKind(String),
}

impl OperationError {
    /// Shorthand for a [`Validation`](Self::Validation) error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a [`NotFound`](Self::NotFound) error.
    #[must_use]
    pub fn not_found(what: impl Into<String>, target: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            target: target.into(),
        }
    }

    /// The distinct insufficient-privilege failure.
    #[must_use]
    pub fn admin_required() -> Self {
        Self::Permission(ADMIN_REQUIRED.to_string())
    }

    /// Whether the failure happened before any process was launched.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound { .. } | Self::UnknownKind(_)
        )
    }
}
