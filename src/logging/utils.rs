//! Utility functions for path resolution, ANSI stripping, and time formatting.
use std::fs;
use std::path::PathBuf;

/// Strip ANSI escape sequences from a string.
///
/// Handles SGR sequences (ending in `m`) and other CSI sequences (ending
/// in any letter in the `@`..`~` range), so cursor movement, erase, etc.
/// are also stripped without consuming unrelated text.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(next) = chars.next()
                && next == '['
            {
                for inner in chars.by_ref() {
                    if ('@'..='~').contains(&inner) {
                        break;
                    }
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Return the terminal width in columns.
///
/// Asks the attached terminal first, then the `COLUMNS` environment
/// variable, falling back to 80.
pub(super) fn terminal_columns() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w))
        .filter(|&n| n > 0)
        .or_else(|| {
            std::env::var("COLUMNS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&n| n > 0)
        })
        .unwrap_or(80)
}

/// Base cache directory: `XDG_CACHE_HOME`, then `LOCALAPPDATA`, then `~/.cache`.
fn cache_root() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .or_else(|| std::env::var_os("LOCALAPPDATA"))
        .map_or_else(
            || {
                std::env::var_os("HOME")
                    .or_else(|| std::env::var_os("USERPROFILE"))
                    .map_or_else(|| PathBuf::from("."), PathBuf::from)
                    .join(".cache")
            },
            PathBuf::from,
        )
}

/// Return the `<cache>/postinstall/` directory, creating it if needed.
pub(super) fn postinstall_cache_dir() -> Option<PathBuf> {
    let dir = cache_root().join("postinstall");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Return the log file path under `<cache>/postinstall/`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(postinstall_cache_dir()?.join(format!("{command}.log")))
}

/// Format the current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format the current UTC time as `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::TEST_ENV_MUTEX;

    #[test]
    fn strip_ansi_removes_colors() {
        assert_eq!(strip_ansi("\x1b[31mERROR\x1b[0m hello"), "ERROR hello");
        assert_eq!(strip_ansi("no codes here"), "no codes here");
        assert_eq!(
            strip_ansi("\x1b[1;34m==>\x1b[0m \x1b[1mstage\x1b[0m"),
            "==> stage"
        );
    }

    #[test]
    fn strip_ansi_handles_csi_sequences() {
        assert_eq!(strip_ansi("\x1b[2;5Htext"), "text");
        assert_eq!(strip_ansi("\r\x1b[Kworld"), "\rworld");
        assert_eq!(strip_ansi("\x1b[31m\x1b[2JERROR\x1b[0m"), "ERROR");
        assert_eq!(strip_ansi("\x1bMtext"), "text");
    }

    #[test]
    fn strip_ansi_keeps_unicode_marks() {
        assert_eq!(strip_ansi("\x1b[32m✓\x1b[0m done"), "✓ done");
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    fn terminal_columns_returns_positive() {
        assert!(terminal_columns() > 0);
    }

    #[test]
    #[allow(unsafe_code)]
    fn cache_dir_prefers_xdg() {
        let _lock = TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let tmp = tempfile::tempdir().unwrap();
        // SAFETY: Protected by TEST_ENV_MUTEX; restored before lock is released.
        unsafe {
            std::env::set_var("XDG_CACHE_HOME", tmp.path());
        }
        let path = log_file_path("run");
        // SAFETY: Still holding TEST_ENV_MUTEX.
        unsafe {
            std::env::remove_var("XDG_CACHE_HOME");
        }
        let path = path.expect("cache dir should be creatable");
        assert_eq!(path, tmp.path().join("postinstall").join("run.log"));
        assert!(tmp.path().join("postinstall").is_dir());
    }

    #[test]
    fn format_utc_time_has_correct_format() {
        let s = format_utc_time();
        assert_eq!(s.len(), 8, "HH:MM:SS should be 8 chars");
        assert_eq!(&s[2..3], ":");
        assert_eq!(&s[5..6], ":");
    }

    #[test]
    fn format_utc_datetime_has_correct_format() {
        let s = format_utc_datetime();
        assert_eq!(s.len(), 19, "YYYY-MM-DD HH:MM:SS should be 19 chars");
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[10..11], " ");
    }
}
