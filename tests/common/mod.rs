// Shared helpers for integration tests.
//
// Provides a temporary installation root with batch files and fake
// installers, a fluent builder, and a recording configuration store so each
// integration test can run real batches without touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use postinstall_cli::config::Settings;
use postinstall_cli::config::batch;
use postinstall_cli::elevation::{PrivilegeContext, SystemLauncher};
use postinstall_cli::engine::{CancelToken, Engine, Event, ExecutionResult, LogLevel};
use postinstall_cli::error::OperationError;
use postinstall_cli::exec::{Executor, SystemExecutor};
use postinstall_cli::handlers::{Context, Handlers};
use postinstall_cli::operation::{Operation, Scope, TypedValue};
use postinstall_cli::store::ConfigStore;

/// One recorded store write: scope, key path, value name, value.
pub type Write = (Scope, String, String, TypedValue);

/// [`ConfigStore`] that keeps writes in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    writes: Mutex<Vec<Write>>,
}

impl MemoryStore {
    /// Writes seen so far, in order.
    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().expect("store lock").clone()
    }
}

impl ConfigStore for MemoryStore {
    fn write(
        &self,
        scope: Scope,
        key_path: &str,
        value_name: &str,
        value: &TypedValue,
    ) -> Result<(), OperationError> {
        self.writes.lock().expect("store lock").push((
            scope,
            key_path.to_string(),
            value_name.to_string(),
            value.clone(),
        ));
        Ok(())
    }
}

/// An isolated installation root backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory standing in for the installation root.
    pub root: tempfile::TempDir,
    /// Store the handlers write into.
    pub store: Arc<MemoryStore>,
    /// Privilege the handlers see.
    pub privilege: PrivilegeContext,
    /// Settings handed to the handlers.
    pub settings: Settings,
}

impl IntegrationTestContext {
    /// Create a context with an empty, elevated installation root.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
            store: Arc::new(MemoryStore::default()),
            privilege: PrivilegeContext::elevated(),
            settings: Settings::default(),
        }
    }

    /// Path to the installation root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Handlers wired to real processes, the memory store and this root.
    pub fn handlers(&self) -> Handlers {
        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
        let ctx = Context::new(
            executor.clone(),
            Arc::new(SystemLauncher::new(executor, self.privilege)),
            self.store.clone(),
            self.privilege,
        )
        .with_root(self.root.path())
        .with_settings(self.settings.clone());
        Handlers::new(ctx)
    }

    /// Load `name` from the root as a batch.
    pub fn load_batch(&self, name: &str) -> Vec<Operation> {
        batch::load(&self.root.path().join(name)).expect("load batch")
    }

    /// Run `batch` on the calling thread and collect every event.
    pub fn run(&self, batch: &[Operation]) -> (ExecutionResult, Vec<Event>) {
        let (tx, rx) = mpsc::channel();
        let result = Engine::new(self.handlers()).run(batch, &CancelToken::new(), &tx);
        drop(tx);
        (result, rx.iter().collect())
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Write `content` to `relative` under the root, creating parents.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.ctx.root.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write file");
        self
    }

    /// Run handlers as a standard (non-elevated) user.
    pub fn standard_user(mut self) -> Self {
        self.ctx.privilege = PrivilegeContext::standard();
        self
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.ctx.settings = settings;
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}

/// Log lines of `events`, in order.
pub fn log_lines(events: &[Event]) -> Vec<(LogLevel, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Log { level, message } => Some((*level, message.clone())),
            _ => None,
        })
        .collect()
}

/// Path to the built `postinstall` binary.
pub fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_postinstall"))
}
