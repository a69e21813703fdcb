//! Supervisor configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.vigil/
//!   config.yaml   (recognized options — mode 0600)
//!   workspace/    (default sync target, overridable via `workspace:`)
//! ```
//!
//! # API pattern
//!
//! Every function touching the config file has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.
//!
//! The API credential is deliberately NOT a config key: it is read from the
//! `GITHUB_TOKEN` environment variable so the YAML file never holds a secret.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding the remote provider credential.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

// ---------------------------------------------------------------------------
// 1. Config shape
// ---------------------------------------------------------------------------

/// Recognized supervisor options, loaded from `~/.vigil/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Remote repository owner (user or organization).
    pub owner: String,
    /// Remote repository name.
    pub repo: String,
    /// Remote reference to follow.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Poll cadence in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Entry point used when the workspace manifest declares none.
    #[serde(default = "default_entry_point")]
    pub entry_point_default: String,
    /// Build command run with the workspace as working directory.
    #[serde(default = "default_build_command")]
    pub build_command: String,
    /// Program used to run the built entry point.
    #[serde(default = "default_run_command")]
    pub run_command: String,
    /// Environment passed to the managed process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Workspace-relative paths that synchronization must never delete.
    #[serde(default)]
    pub protected_paths: BTreeSet<PathBuf>,
    /// Workspace root; `~/.vigil/workspace` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_entry_point() -> String {
    "index".to_string()
}

fn default_build_command() -> String {
    "npm run build".to_string()
}

fn default_run_command() -> String {
    "node".to_string()
}

impl SupervisorConfig {
    /// A starter config for `vigil init`, with placeholder remote coordinates.
    pub fn template() -> Self {
        Self {
            owner: "OWNER".to_string(),
            repo: "REPO".to_string(),
            branch: default_branch(),
            poll_interval_ms: default_poll_interval_ms(),
            entry_point_default: default_entry_point(),
            build_command: default_build_command(),
            run_command: default_run_command(),
            env: BTreeMap::new(),
            protected_paths: BTreeSet::new(),
            workspace: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolved workspace root: the `workspace:` key, or `<home>/.vigil/workspace`.
    pub fn workspace_root_at(&self, home: &Path) -> PathBuf {
        self.workspace
            .clone()
            .unwrap_or_else(|| vigil_root(home).join("workspace"))
    }
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.vigil/` — pure, no I/O.
pub fn vigil_root(home: &Path) -> PathBuf {
    home.join(".vigil")
}

/// `<home>/.vigil/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    vigil_root(home).join("config.yaml")
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// Load the config from `<home>/.vigil/config.yaml`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<SupervisorConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SupervisorConfig, ConfigError> {
    load_at(&home()?)
}

/// Write the config to `<home>/.vigil/config.yaml` (mode `0600`), creating
/// `~/.vigil/` as needed.
pub fn save_at(home: &Path, config: &SupervisorConfig) -> Result<PathBuf, ConfigError> {
    let root = vigil_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root)?;
        set_dir_permissions(&root)?;
    }
    let path = config_path_at(home);
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&path, yaml)?;
    set_file_permissions(&path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &SupervisorConfig) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// 4. Credential
// ---------------------------------------------------------------------------

/// Read the provider credential from the environment.
///
/// Absence is a fatal configuration error: the supervisor exits with code 1
/// at startup rather than polling unauthenticated.
pub fn token_from_env() -> Result<String, ConfigError> {
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ConfigError::MissingToken { var: TOKEN_ENV_VAR }),
    }
}

// ---------------------------------------------------------------------------
// Permissions (unix: config may sit next to credentials on shared machines)
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
