//! Configuration value writes.
use crate::error::OperationError;
use crate::exec::CommandOutcome;
use crate::operation::{ConfigValueSpec, Scope, TypedValue};

use super::Context;

/// A checked write, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedWrite<'a> {
    /// Target store.
    pub scope: Scope,
    /// Key path below the scope root.
    pub key_path: &'a str,
    /// Value name inside the key.
    pub value_name: &'a str,
    /// Value with its storage type resolved.
    pub value: TypedValue,
}

/// Check fields, resolve the value type, and check rights for the scope.
///
/// # Errors
///
/// Fails on a missing key path, value name or value, an integer outside the
/// DWORD range, or a machine-scope write without elevation.
pub fn prepare<'a>(
    spec: &'a ConfigValueSpec,
    ctx: &Context,
) -> Result<PreparedWrite<'a>, OperationError> {
    let key_path = spec.key_path.trim().trim_matches('\\');
    let value_name = spec.value_name.as_str();
    if key_path.is_empty() || value_name.trim().is_empty() {
        return Err(OperationError::validation(
            "configuration key path or value name is missing",
        ));
    }
    let value = spec
        .value
        .as_ref()
        .ok_or_else(|| OperationError::validation("configuration value is missing"))?
        .typed()?;
    if spec.scope == Scope::Machine && !ctx.privilege.elevated {
        return Err(OperationError::admin_required());
    }
    Ok(PreparedWrite {
        scope: spec.scope,
        key_path,
        value_name,
        value,
    })
}

/// Write one configuration value.
#[must_use]
pub fn run(spec: &ConfigValueSpec, ctx: &Context) -> CommandOutcome {
    let write = match prepare(spec, ctx) {
        Ok(write) => write,
        Err(e) => return CommandOutcome::failed(e),
    };
    tracing::debug!(
        "writing {}\\{}\\{} = {:?}",
        write.scope,
        write.key_path,
        write.value_name,
        write.value
    );
    match ctx
        .store
        .write(write.scope, write.key_path, write.value_name, &write.value)
    {
        Ok(()) => CommandOutcome::ok(""),
        Err(e) => CommandOutcome::failed(e),
    }
}
