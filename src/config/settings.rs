//! Engine settings (`postinstall.toml`).
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::toml_loader;
use crate::error::ConfigError;

/// File name looked up in the installation root when `--config` is absent.
pub const SETTINGS_FILE: &str = "postinstall.toml";

/// Environment variable overriding the installation root.
pub const ROOT_ENV: &str = "POSTINSTALL_ROOT";

/// Tunables for a run. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base directory for relative installer, tool and executable paths.
    pub install_root: Option<PathBuf>,
    /// Package manager program.
    pub package_manager: String,
    /// Maximum length of the diagnostic in a failure log line.
    pub max_error_chars: usize,
    /// Maximum length of each stream excerpt in a tool failure.
    pub stream_excerpt_chars: usize,
    /// Process time bounds.
    pub timeouts: Timeouts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_root: None,
            package_manager: "winget".to_string(),
            max_error_chars: 300,
            stream_excerpt_chars: 500,
            timeouts: Timeouts::default(),
        }
    }
}

/// Process time bounds, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Shell commands.
    pub command_secs: u64,
    /// Package manager, installers, tools and executables.
    pub install_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_secs: 300,
            install_secs: 600,
        }
    }
}

impl Timeouts {
    /// Bound for lightweight commands.
    #[must_use]
    pub const fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    /// Bound for installs and tools.
    #[must_use]
    pub const fn install(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if it is absent.
    ///
    /// A relative `install_root` is taken relative to the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings: Self = toml_loader::load_or_default(path)?;
        if let Some(root) = settings.install_root.take() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            settings.install_root = Some(crate::operations::resolve_under(base, &root));
        }
        tracing::debug!("settings from {}: {settings:?}", path.display());
        Ok(settings)
    }
}

/// Pick the installation root: flag, then environment, then settings, then fallback.
#[must_use]
pub fn resolve_root(
    flag: Option<&Path>,
    env: Option<PathBuf>,
    settings: &Settings,
    fallback: &Path,
) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or(env)
        .or_else(|| settings.install_root.clone())
        .unwrap_or_else(|| fallback.to_path_buf())
}

/// Where to read settings from: the explicit path, else `<root>/postinstall.toml`.
#[must_use]
pub fn settings_path(explicit: Option<&Path>, root: &Path) -> PathBuf {
    explicit.map_or_else(|| root.join(SETTINGS_FILE), Path::to_path_buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.package_manager, "winget");
        assert_eq!(s.max_error_chars, 300);
        assert_eq!(s.stream_excerpt_chars, 500);
        assert_eq!(s.timeouts.command(), Duration::from_secs(300));
        assert_eq!(s.timeouts.install(), Duration::from_secs(600));
        assert!(s.install_root.is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "max_error_chars = 80\n\n[timeouts]\ncommand_secs = 5\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.max_error_chars, 80);
        assert_eq!(s.timeouts.command_secs, 5);
        assert_eq!(s.timeouts.install_secs, 600);
        assert_eq!(s.package_manager, "winget");
    }

    #[test]
    fn relative_install_root_is_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "install_root = \"Setup\"\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.install_root, Some(dir.path().join("Setup")));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "max_eror_chars = 10\n").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSyntax { .. }), "{err}");
    }

    #[test]
    fn root_resolution_order() {
        let mut settings = Settings::default();
        let fallback = Path::new("/exe");
        assert_eq!(resolve_root(None, None, &settings, fallback), PathBuf::from("/exe"));

        settings.install_root = Some(PathBuf::from("/from-settings"));
        assert_eq!(
            resolve_root(None, None, &settings, fallback),
            PathBuf::from("/from-settings")
        );
        assert_eq!(
            resolve_root(None, Some(PathBuf::from("/from-env")), &settings, fallback),
            PathBuf::from("/from-env")
        );
        assert_eq!(
            resolve_root(
                Some(Path::new("/from-flag")),
                Some(PathBuf::from("/from-env")),
                &settings,
                fallback
            ),
            PathBuf::from("/from-flag")
        );
    }

    #[test]
    fn settings_path_prefers_explicit() {
        assert_eq!(
            settings_path(Some(Path::new("/etc/p.toml")), Path::new("/root")),
            PathBuf::from("/etc/p.toml")
        );
        assert_eq!(
            settings_path(None, Path::new("/root")),
            PathBuf::from("/root").join(SETTINGS_FILE)
        );
    }
}
