//! Filesystem queries behind a trait for dependency injection.
//!
//! Installer, tool and executable handlers check that their target file exists
//! before launching anything. [`FileSystemOps`] keeps that check swappable so
//! handler tests never need real installer files. Production code uses
//! [`SystemFileSystemOps`]; tests use `MockFileSystemOps`.

use std::path::{Path, PathBuf};

/// Abstraction over the filesystem queries handlers make.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a regular file (not a directory or broken symlink).
    fn is_file(&self, path: &Path) -> bool;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Resolve `path` against `root` unless it is already absolute.
#[must_use]
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// ```ignore
/// use postinstall_cli::operations::MockFileSystemOps;
///
/// let fs = MockFileSystemOps::new().with_file("/setup/Installers/app.msi");
/// ```
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    existing: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as existing without making it a regular file.
    #[must_use]
    pub fn with_existing(mut self, path: impl Into<PathBuf>) -> Self {
        let p = path.into();
        if !self.existing.contains(&p) {
            self.existing.push(p);
        }
        self
    }

    /// Mark `path` as a regular file (also marks it as existing).
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        let p = path.into();
        if !self.existing.contains(&p) {
            self.existing.push(p.clone());
        }
        if !self.files.contains(&p) {
            self.files.push(p);
        }
        self
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.existing.iter().any(|p| p == path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.iter().any(|p| p == path)
    }
}
