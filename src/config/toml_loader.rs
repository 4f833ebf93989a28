//! TOML file loading shared by settings and batch files.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Deserialize a TOML file, or `T::default()` when the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read and
/// [`ConfigError::InvalidSyntax`] if it does not parse into `T`.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = read(path)?;
    parse(&content, &path.display().to_string())
}

/// Read a whole file as UTF-8 text.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] naming `path` on failure.
pub fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Deserialize TOML text; `file` names the source in error messages.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSyntax`] with the parser message.
pub fn parse<T: DeserializeOwned>(content: &str, file: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::InvalidSyntax {
        file: file.to_string(),
        message: e.message().to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq, Eq)]
    #[serde(default, deny_unknown_fields)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Sample = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn existing_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.toml");
        std::fs::write(&path, "name = \"x\"\ncount = 3\n").unwrap();
        let loaded: Sample = load_or_default(&path).unwrap();
        assert_eq!(
            loaded,
            Sample {
                name: "x".into(),
                count: 3
            }
        );
    }

    #[test]
    fn unknown_key_is_invalid_syntax() {
        let err = parse::<Sample>("nmae = \"typo\"", "s.toml").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidSyntax { ref file, .. } if file == "s.toml"),
            "unexpected error: {err}"
        );
        assert!(err.to_string().contains("nmae"));
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
