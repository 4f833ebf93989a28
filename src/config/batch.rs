//! Batch files: an ordered list of operations in TOML or JSON.
//!
//! ```toml
//! [[operation]]
//! kind = "package_install"
//! name = "Install Firefox"
//! package_id = "Mozilla.Firefox"
//!
//! [[operation]]
//! kind = "config_value"
//! key_path = 'SOFTWARE\Policies\Microsoft\Windows\DataCollection'
//! value_name = "AllowTelemetry"
//! value = 0
//! ```
//!
//! JSON batches are a top-level array of the same entries. Missing fields
//! load as empty values and fail at dispatch; a field of the wrong type
//! rejects the whole batch.
use serde::Deserialize;
use std::io::Read as _;
use std::path::Path;

use super::toml_loader;
use crate::error::ConfigError;
use crate::operation::{Operation, OperationKind};

/// Path that means "read the batch from standard input" (as JSON).
pub const STDIN_PATH: &str = "-";

/// Supported batch encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    /// `[[operation]]` tables.
    Toml,
    /// A top-level array.
    Json,
}

impl BatchFormat {
    /// Pick the format from the file extension (`-` means JSON on stdin).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if path.as_os_str() == STDIN_PATH {
            return Ok(Self::Json);
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(ext)),
        }
    }
}

/// One batch entry before its kind-specific fields are interpreted.
#[derive(Debug, Deserialize)]
struct RawOperation {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlBatch {
    operation: Vec<RawOperation>,
}

/// Load a batch from `path` (or standard input for `-`).
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML/JSON, or
/// an entry has a field of the wrong type.
pub fn load(path: &Path) -> Result<Vec<Operation>, ConfigError> {
    let format = BatchFormat::from_path(path)?;
    let content = if path.as_os_str() == STDIN_PATH {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| ConfigError::Io {
                path: "<stdin>".to_string(),
                source,
            })?;
        buf
    } else {
        toml_loader::read(path)?
    };
    let operations = parse(&content, format, &path.display().to_string())?;
    tracing::debug!(
        "loaded {} operation(s) from {}",
        operations.len(),
        path.display()
    );
    Ok(operations)
}

/// Parse batch text; `file` names the source in error messages.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSyntax`] for malformed documents and
/// [`ConfigError::InvalidOperation`] for entries with mistyped fields.
pub fn parse(content: &str, format: BatchFormat, file: &str) -> Result<Vec<Operation>, ConfigError> {
    let raw = match format {
        BatchFormat::Toml => toml_loader::parse::<TomlBatch>(content, file)?.operation,
        BatchFormat::Json => {
            serde_json::from_str::<Vec<RawOperation>>(content).map_err(|e| {
                ConfigError::InvalidSyntax {
                    file: file.to_string(),
                    message: e.to_string(),
                }
            })?
        }
    };
    raw.into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let kind = OperationKind::from_parts(entry.kind.trim(), entry.fields).map_err(|e| {
                ConfigError::InvalidOperation {
                    file: file.to_string(),
                    index: i + 1,
                    message: e.to_string(),
                }
            })?;
            Ok(match entry.name.filter(|n| !n.trim().is_empty()) {
                Some(name) => Operation::new(name, kind),
                None => Operation::unnamed(kind),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::unreachable)]
mod tests {
    use super::*;
    use crate::operation::{ConfigData, Scope};
    use std::path::PathBuf;

    #[test]
    fn format_from_extension() {
        assert_eq!(BatchFormat::from_path(Path::new("b.toml")).unwrap(), BatchFormat::Toml);
        assert_eq!(BatchFormat::from_path(Path::new("b.JSON")).unwrap(), BatchFormat::Json);
        assert_eq!(BatchFormat::from_path(Path::new("-")).unwrap(), BatchFormat::Json);
        let err = BatchFormat::from_path(Path::new("b.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref e) if e == "yaml"));
    }

    #[test]
    fn toml_batch_keeps_order_and_names() {
        let ops = parse(
            r#"
[[operation]]
kind = "package_install"
name = "Install Firefox"
package_id = "Mozilla.Firefox"

[[operation]]
kind = "config_value"
key_path = 'SOFTWARE\Policies\Microsoft\Windows\DataCollection'
value_name = "AllowTelemetry"
value = 0

[[operation]]
kind = "package_install"
package_id = "Mozilla.Firefox"
"#,
            BatchFormat::Toml,
            "b.toml",
        )
        .unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].display_name, "Install Firefox");
        assert_eq!(ops[0].kind, OperationKind::package_install("Mozilla.Firefox"));
        assert_eq!(
            ops[1].kind,
            OperationKind::config_value(
                r"SOFTWARE\Policies\Microsoft\Windows\DataCollection",
                "AllowTelemetry",
                ConfigData::Integer(0),
                Scope::Machine,
            )
        );
        assert_eq!(ops[2].display_name, "Install Mozilla.Firefox");
        assert_eq!(ops[0].kind, ops[2].kind, "duplicates are kept");
    }

    #[test]
    fn json_batch_with_aliases() {
        let ops = parse(
            r#"[
                {"kind": "tool", "name": "Debloat", "path": "Tools/debloat.ps1"},
                {"kind": "executable", "exe_path": "bin/x.exe", "args": ["/quiet"], "as_admin": false}
            ]"#,
            BatchFormat::Json,
            "b.json",
        )
        .unwrap();
        assert_eq!(ops[0].kind, OperationKind::tool("Tools/debloat.ps1"));
        let OperationKind::Executable(spec) = &ops[1].kind else {
            unreachable!("second entry is an executable");
        };
        assert_eq!(spec.file_path, PathBuf::from("bin/x.exe"));
        assert_eq!(spec.args, vec!["/quiet".to_string()]);
        assert!(!spec.elevated);
    }

    #[test]
    fn empty_documents_are_empty_batches() {
        assert!(parse("", BatchFormat::Toml, "b.toml").unwrap().is_empty());
        assert!(parse("[]", BatchFormat::Json, "b.json").unwrap().is_empty());
    }

    #[test]
    fn unknown_kind_loads_as_unrecognized() {
        let ops = parse(
            "[[operation]]\nkind = \"defrag\"\ndrive = \"C:\"\n",
            BatchFormat::Toml,
            "b.toml",
        )
        .unwrap();
        assert_eq!(
            ops[0].kind,
            OperationKind::Unrecognized {
                kind: "defrag".into()
            }
        );
    }

    #[test]
    fn missing_kind_loads_as_unrecognized() {
        let ops = parse(r#"[{"package_id": "X"}]"#, BatchFormat::Json, "b.json").unwrap();
        assert!(matches!(ops[0].kind, OperationKind::Unrecognized { .. }));
    }

    #[test]
    fn missing_fields_still_load() {
        let ops = parse(
            "[[operation]]\nkind = \"config_value\"\nkey_path = \"K\"\n",
            BatchFormat::Toml,
            "b.toml",
        )
        .unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn wrong_field_type_names_the_entry() {
        let err = parse(
            "[[operation]]\nkind = \"shell_command\"\ncommand_text = \"echo\"\n\n\
             [[operation]]\nkind = \"package_install\"\npackage_id = { a = 1 }\n",
            BatchFormat::Toml,
            "b.toml",
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidOperation { index: 2, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn misspelled_table_is_invalid_syntax() {
        let err = parse("[[operations]]\nkind = \"x\"\n", BatchFormat::Toml, "b.toml").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSyntax { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, r#"[{"kind": "shell_command", "command_text": "echo hi"}]"#).unwrap();
        let ops = load(&path).unwrap();
        assert_eq!(ops[0].kind, OperationKind::shell("echo hi"));
        assert_eq!(ops[0].display_name, "Run shell command");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
