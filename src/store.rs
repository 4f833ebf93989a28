//! Persistent configuration store (the Windows registry).
use std::fmt;

use crate::error::OperationError;
use crate::operation::{Scope, TypedValue};

/// Writes typed values into a scoped key-value store.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigStore: Send + Sync + fmt::Debug {
    /// Write `value` as `value_name` under `key_path`, creating the key if absent.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Permission`] when the store refuses the write
    /// for lack of rights, and another variant for any other failure.
    fn write(
        &self,
        scope: Scope,
        key_path: &str,
        value_name: &str,
        value: &TypedValue,
    ) -> Result<(), OperationError>;
}

/// Production store backed by `winreg`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryStore;

impl ConfigStore for RegistryStore {
    #[cfg(windows)]
    fn write(
        &self,
        scope: Scope,
        key_path: &str,
        value_name: &str,
        value: &TypedValue,
    ) -> Result<(), OperationError> {
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};

        let root = RegKey::predef(match scope {
            Scope::Machine => HKEY_LOCAL_MACHINE,
            Scope::User => HKEY_CURRENT_USER,
        });
        let target = format!("{scope}\\{key_path}\\{value_name}");
        let (key, _) = root
            .create_subkey(key_path)
            .map_err(|e| classify_io(&target, &e))?;
        match value {
            TypedValue::Dword(v) => key.set_value(value_name, v),
            TypedValue::Text(s) => key.set_value(value_name, s),
        }
        .map_err(|e| classify_io(&target, &e))?;
        tracing::debug!("wrote {target} = {value:?}");
        Ok(())
    }

    #[cfg(not(windows))]
    fn write(
        &self,
        scope: Scope,
        key_path: &str,
        value_name: &str,
        _value: &TypedValue,
    ) -> Result<(), OperationError> {
        Err(OperationError::Unsupported(format!(
            "cannot write {scope}\\{key_path}\\{value_name}: the registry is only available on Windows"
        )))
    }
}

/// Map a registry I/O error: access denied is the distinct privilege failure.
#[cfg_attr(not(windows), allow(dead_code))]
fn classify_io(target: &str, err: &std::io::Error) -> OperationError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        OperationError::admin_required()
    } else {
        OperationError::Store {
            target: target.to_string(),
            reason: err.to_string(),
        }
    }
}
