//! Operation descriptors: one closed variant per kind of work.
//!
//! An [`Operation`] pairs a display name with an [`OperationKind`]. Each
//! kind carries its own field struct; missing fields deserialize to empty
//! values so the handler can reject them at dispatch time instead of the
//! whole batch failing to load.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::OperationError;

/// Canonical kind tags, in dispatch order.
pub const KNOWN_KINDS: &[&str] = &[
    "package_install",
    "package_uninstall",
    "shell_command",
    "config_value",
    "local_installer",
    "tool_invocation",
    "executable",
];

/// One unit of work in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Human-readable name, used only for logging.
    pub display_name: String,
    /// What to do.
    pub kind: OperationKind,
}

impl Operation {
    /// Create an operation with an explicit display name.
    #[must_use]
    pub fn new(display_name: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            display_name: display_name.into(),
            kind,
        }
    }

    /// Create an operation named after its kind and target.
    #[must_use]
    pub fn unnamed(kind: OperationKind) -> Self {
        Self {
            display_name: kind.default_display_name(),
            kind,
        }
    }
}

/// The closed set of operation kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Install a package through the package manager.
    PackageInstall(PackageSpec),
    /// Remove a package through the package manager.
    PackageUninstall(PackageSpec),
    /// Run a shell command without elevation.
    ShellCommand(ShellSpec),
    /// Write a persistent configuration (registry) value.
    ConfigValue(ConfigValueSpec),
    /// Run a local installer file silently, elevated.
    LocalInstaller(InstallerSpec),
    /// Run a tool file (exe, script, batch), elevated.
    ToolInvocation(ToolSpec),
    /// Run an executable with arguments.
    Executable(ExecutableSpec),
    /// A tag the engine does not know; always fails at dispatch.
    Unrecognized {
        /// The tag as written in the batch.
        kind: String,
    },
}

impl OperationKind {
    /// Build a kind from its tag and the remaining descriptor fields.
    ///
    /// Unknown tags produce [`Unrecognized`](Self::Unrecognized) regardless of
    /// the fields. Tags used by older catalog files are accepted as aliases.
    ///
    /// # Errors
    ///
    /// Returns an error if a known field has the wrong type or an unknown
    /// field is present.
    pub fn from_parts(
        tag: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let fields = serde_json::Value::Object(fields);
        Ok(match tag {
            "package_install" | "winget_install" => {
                Self::PackageInstall(serde_json::from_value(fields)?)
            }
            "package_uninstall" | "winget_uninstall" => {
                Self::PackageUninstall(serde_json::from_value(fields)?)
            }
            "shell_command" | "powershell" => Self::ShellCommand(serde_json::from_value(fields)?),
            "config_value" | "registry" => Self::ConfigValue(serde_json::from_value(fields)?),
            "local_installer" => Self::LocalInstaller(serde_json::from_value(fields)?),
            "tool_invocation" | "tool" => Self::ToolInvocation(serde_json::from_value(fields)?),
            "executable" => Self::Executable(serde_json::from_value(fields)?),
            other => Self::Unrecognized {
                kind: other.to_string(),
            },
        })
    }

    /// Canonical tag of this kind (the raw tag for unrecognized kinds).
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::PackageInstall(_) => "package_install",
            Self::PackageUninstall(_) => "package_uninstall",
            Self::ShellCommand(_) => "shell_command",
            Self::ConfigValue(_) => "config_value",
            Self::LocalInstaller(_) => "local_installer",
            Self::ToolInvocation(_) => "tool_invocation",
            Self::Executable(_) => "executable",
            Self::Unrecognized { kind } => kind,
        }
    }

    /// Message used when a failed outcome carries no output at all.
    #[must_use]
    pub const fn default_failure(&self) -> &'static str {
        match self {
            Self::PackageInstall(_) => "winget installation failed",
            Self::PackageUninstall(_) => "winget uninstallation failed",
            Self::ShellCommand(_) => "shell command failed",
            Self::ConfigValue(_) => "configuration write failed",
            Self::LocalInstaller(_) => "installer failed",
            Self::ToolInvocation(_) => "tool failed (check logs for details)",
            Self::Executable(_) => "executable failed",
            Self::Unrecognized { .. } => "unknown operation kind",
        }
    }

    /// Display name used when the batch entry has none.
    #[must_use]
    pub fn default_display_name(&self) -> String {
        match self {
            Self::PackageInstall(spec) => format!("Install {}", spec.package_id),
            Self::PackageUninstall(spec) => format!("Remove {}", spec.package_id),
            Self::ShellCommand(_) => "Run shell command".to_string(),
            Self::ConfigValue(spec) => format!("Set {}\\{}", spec.key_path, spec.value_name),
            Self::LocalInstaller(spec) => format!("Install {}", file_label(&spec.file_path)),
            Self::ToolInvocation(spec) => format!("Run {}", file_label(&spec.file_path)),
            Self::Executable(spec) => format!("Run {}", file_label(&spec.file_path)),
            Self::Unrecognized { .. } => "Unknown operation".to_string(),
        }
    }

    /// Convenience constructor for a package install.
    #[must_use]
    pub fn package_install(package_id: impl Into<String>) -> Self {
        Self::PackageInstall(PackageSpec {
            package_id: package_id.into(),
        })
    }

    /// Convenience constructor for a package removal.
    #[must_use]
    pub fn package_uninstall(package_id: impl Into<String>) -> Self {
        Self::PackageUninstall(PackageSpec {
            package_id: package_id.into(),
        })
    }

    /// Convenience constructor for a shell command.
    #[must_use]
    pub fn shell(command_text: impl Into<String>) -> Self {
        Self::ShellCommand(ShellSpec {
            command_text: command_text.into(),
        })
    }

    /// Convenience constructor for a configuration value write.
    #[must_use]
    pub fn config_value(
        key_path: impl Into<String>,
        value_name: impl Into<String>,
        value: ConfigData,
        scope: Scope,
    ) -> Self {
        Self::ConfigValue(ConfigValueSpec {
            key_path: key_path.into(),
            value_name: value_name.into(),
            value: Some(value),
            scope,
        })
    }

    /// Convenience constructor for a local installer with an inferred kind.
    #[must_use]
    pub fn local_installer(file_path: impl Into<PathBuf>) -> Self {
        Self::LocalInstaller(InstallerSpec {
            file_path: file_path.into(),
            installer_kind: None,
        })
    }

    /// Convenience constructor for a tool invocation with an inferred kind.
    #[must_use]
    pub fn tool(file_path: impl Into<PathBuf>) -> Self {
        Self::ToolInvocation(ToolSpec {
            file_path: file_path.into(),
            tool_kind: None,
        })
    }

    /// Convenience constructor for an elevated executable run.
    #[must_use]
    pub fn executable<I, S>(file_path: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Executable(ExecutableSpec {
            file_path: file_path.into(),
            args: args.into_iter().map(Into::into).collect(),
            elevated: true,
        })
    }
}

fn file_label(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Fields of a package install/uninstall.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSpec {
    /// Package manager identifier (e.g. `Mozilla.Firefox`).
    pub package_id: String,
}

/// Fields of a shell command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellSpec {
    /// Script text handed to the shell as a single argument.
    #[serde(alias = "command")]
    pub command_text: String,
}

/// Fields of a configuration value write.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigValueSpec {
    /// Key path below the scope root (e.g. `SOFTWARE\Policies\...`).
    pub key_path: String,
    /// Value name inside the key.
    pub value_name: String,
    /// Value data; its native type decides the stored type.
    pub value: Option<ConfigData>,
    /// Machine-wide or per-user store.
    #[serde(alias = "hive")]
    pub scope: Scope,
}

/// Fields of a local installer run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerSpec {
    /// Installer file, relative paths resolve against the installation root.
    #[serde(alias = "path")]
    pub file_path: PathBuf,
    /// Explicit installer kind; inferred from the extension when absent.
    #[serde(alias = "installer_type")]
    pub installer_kind: Option<InstallerKind>,
}

/// Fields of a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSpec {
    /// Tool file, relative paths resolve against the installation root.
    #[serde(alias = "path")]
    pub file_path: PathBuf,
    /// Explicit tool kind; inferred from the extension when absent.
    #[serde(alias = "tool_type")]
    pub tool_kind: Option<ToolKind>,
}

/// Fields of an executable run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutableSpec {
    /// Executable file, relative paths resolve against the installation root.
    #[serde(alias = "exe_path", alias = "path")]
    pub file_path: PathBuf,
    /// Arguments, passed through one by one.
    pub args: Vec<String>,
    /// Request elevation (default `true`).
    #[serde(alias = "as_admin")]
    pub elevated: bool,
}

impl Default for ExecutableSpec {
    fn default() -> Self {
        Self {
            file_path: PathBuf::new(),
            args: Vec::new(),
            elevated: true,
        }
    }
}

/// Which configuration store a value is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Machine-wide store (`HKEY_LOCAL_MACHINE`); requires elevation.
    #[default]
    #[serde(alias = "HKLM", alias = "hklm", alias = "HKEY_LOCAL_MACHINE")]
    Machine,
    /// Current user store (`HKEY_CURRENT_USER`).
    #[serde(alias = "HKCU", alias = "hkcu", alias = "HKEY_CURRENT_USER")]
    User,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine => write!(f, "HKLM"),
            Self::User => write!(f, "HKCU"),
        }
    }
}

/// A configuration value as written in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConfigData {
    /// Integer data, stored as a 32-bit DWORD.
    Integer(i64),
    /// Boolean data, stored as DWORD 1 or 0.
    Flag(bool),
    /// Text data, stored as a string value.
    Text(String),
}

/// A value with its storage type resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// 32-bit integer (`REG_DWORD`).
    Dword(u32),
    /// Text (`REG_SZ`).
    Text(String),
}

impl ConfigData {
    /// Infer the storage type from the value's native type.
    ///
    /// # Errors
    ///
    /// Returns a validation error if an integer does not fit in a DWORD.
    pub fn typed(&self) -> Result<TypedValue, OperationError> {
        match self {
            Self::Integer(i) => u32::try_from(*i).map(TypedValue::Dword).map_err(|_| {
                OperationError::validation(format!("integer value {i} is outside the DWORD range"))
            }),
            Self::Flag(b) => Ok(TypedValue::Dword(u32::from(*b))),
            Self::Text(s) => Ok(TypedValue::Text(s.clone())),
        }
    }
}

impl fmt::Display for ConfigData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Flag(b) => write!(f, "{}", u8::from(*b)),
            Self::Text(s) => write!(f, "'{s}'"),
        }
    }
}

/// Installer packaging formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerKind {
    /// Self-contained setup executable.
    Exe,
    /// Windows Installer package.
    Msi,
    /// App package.
    Msix,
}

impl InstallerKind {
    /// Infer from the file extension (`.msi`, `.msix`, anything else is exe).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("msi") => Self::Msi,
            Some("msix") => Self::Msix,
            _ => Self::Exe,
        }
    }
}

impl fmt::Display for InstallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exe => write!(f, "exe"),
            Self::Msi => write!(f, "msi"),
            Self::Msix => write!(f, "msix"),
        }
    }
}

/// Tool file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Native executable.
    Exe,
    /// `PowerShell` script.
    #[serde(alias = "ps1")]
    Script,
    /// Batch file.
    #[serde(alias = "bat", alias = "cmd")]
    Batch,
}

impl ToolKind {
    /// Infer from the file extension (`.ps1`, `.bat`/`.cmd`, anything else is exe).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("ps1") => Self::Script,
            Some("bat" | "cmd") => Self::Batch,
            _ => Self::Exe,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exe => write!(f, "exe"),
            Self::Script => write!(f, "script"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}
