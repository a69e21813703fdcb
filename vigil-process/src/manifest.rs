//! Workspace manifest inspection.
//!
//! After a successful build, the entry point comes from the workspace's
//! `package.json` `"main"` field; absent a manifest (or the field), the
//! configured default applies.

use std::path::Path;

use vigil_core::types::EntryPoint;

use crate::error::BuildError;

const MANIFEST_FILE: &str = "package.json";

/// The entry point declared by the workspace manifest, if any.
///
/// A missing manifest or missing `"main"` field is not an error; a manifest
/// that exists but does not parse is.
pub fn declared_entry_point(workspace: &Path) -> Result<Option<EntryPoint>, BuildError> {
    let path = workspace.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| crate::error::io_err(&path, e))?;
    let manifest: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| BuildError::Manifest {
            path: path.clone(),
            message: e.to_string(),
        })?;

    Ok(manifest
        .get("main")
        .and_then(|main| main.as_str())
        .map(EntryPoint::from))
}

/// Declared entry point, or the configured default.
pub fn entry_point_or(workspace: &Path, default: &str) -> Result<EntryPoint, BuildError> {
    Ok(declared_entry_point(workspace)?.unwrap_or_else(|| EntryPoint::from(default)))
}
