//! Subcommand implementations and their shared setup.
pub mod check;
pub mod completions;
pub mod console;
pub mod plan;
pub mod run;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::config::settings::{ROOT_ENV, resolve_root, settings_path};
use crate::dry_run::{DryRunExecutor, DryRunLauncher, DryRunStore};
use crate::elevation::{PrivilegeContext, SystemLauncher};
use crate::exec::{Executor, SystemExecutor};
use crate::handlers::{Context, Handlers};
use crate::logging::Logger;
use crate::platform::{self, Platform};
use crate::store::RegistryStore;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, settings loading, root resolution and
/// the privilege probe so that each command does not repeat them.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected operating system.
    pub platform: Platform,
    /// Settings from `postinstall.toml`, or defaults.
    pub settings: Settings,
    /// Installation root relative paths resolve against.
    pub root: PathBuf,
    /// Whether the process runs elevated.
    pub privilege: PrivilegeContext,
    /// Log instead of launching or writing anything.
    pub dry_run: bool,
}

impl CommandSetup {
    /// Detect the platform, load settings, resolve the installation root,
    /// and probe for elevation.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or
    /// parsed.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let platform = Platform::detect();
        let fallback = platform::executable_dir();
        let env_root = std::env::var_os(ROOT_ENV).map(PathBuf::from);

        log.stage("Loading settings");
        let provisional = resolve_root(
            global.root.as_deref(),
            env_root.clone(),
            &Settings::default(),
            &fallback,
        );
        let path = settings_path(global.config.as_deref(), &provisional);
        let settings = Settings::load(&path)
            .with_context(|| format!("loading settings from {}", path.display()))?;
        let root = resolve_root(global.root.as_deref(), env_root, &settings, &fallback);
        log.info(&format!("install root: {}", root.display()));
        log.debug(&format!("platform: {}", platform.os));
        log.debug(&format!("package manager: {}", settings.package_manager));

        let privilege = if global.assume_elevated {
            log.debug("elevation assumed by flag");
            PrivilegeContext::elevated()
        } else {
            platform.detect_privilege(&SystemExecutor)
        };
        if !privilege.elevated {
            log.warn("not running as administrator; elevated operations will request elevation");
        }

        Ok(Self {
            platform,
            settings,
            root,
            privilege,
            dry_run: global.dry_run,
        })
    }

    /// Build the handler set: real seams, or logging fakes under `--dry-run`.
    #[must_use]
    pub fn handlers(&self) -> Handlers {
        let ctx = if self.dry_run {
            Context::new(
                Arc::new(DryRunExecutor),
                Arc::new(DryRunLauncher),
                Arc::new(DryRunStore),
                self.privilege,
            )
        } else {
            let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
            Context::new(
                executor.clone(),
                Arc::new(SystemLauncher::new(executor, self.privilege)),
                Arc::new(RegistryStore),
                self.privilege,
            )
        };
        Handlers::new(
            ctx.with_platform(self.platform)
                .with_root(self.root.clone())
                .with_settings(self.settings.clone()),
        )
    }
}
