//! Config load/save tests for `vigil-core`.
//!
//! Each case uses its own `TempDir` home — no shared state, and never the
//! real `~/.vigil/`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use rstest::rstest;
use tempfile::TempDir;

use vigil_core::config::{self, SupervisorConfig};
use vigil_core::ConfigError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn minimal_config() -> SupervisorConfig {
    let mut config = SupervisorConfig::template();
    config.owner = "lux-jsx".to_string();
    config.repo = "kiwi".to_string();
    config
}

fn full_config() -> SupervisorConfig {
    let mut config = minimal_config();
    config.branch = "release".to_string();
    config.poll_interval_ms = 5_000;
    config.entry_point_default = "server".to_string();
    config.build_command = "make build".to_string();
    config.run_command = "python3".to_string();
    config.env = BTreeMap::from([
        ("PORT".to_string(), "8080".to_string()),
        ("NODE_ENV".to_string(), "production".to_string()),
    ]);
    config.protected_paths = BTreeSet::from([PathBuf::from("data"), PathBuf::from(".env")]);
    config.workspace = Some(PathBuf::from("/srv/kiwi"));
    config
}

// ---------------------------------------------------------------------------
// Save / load roundtrip
// ---------------------------------------------------------------------------

#[rstest]
#[case("minimal", minimal_config())]
#[case("all_fields", full_config())]
fn save_then_load_roundtrips(#[case] label: &str, #[case] config: SupervisorConfig) {
    let home = TempDir::new().expect("home");
    let path = config::save_at(home.path(), &config)
        .unwrap_or_else(|e| panic!("[{label}] save failed: {e}"));
    assert!(path.exists(), "[{label}] config file on disk");

    let back = config::load_at(home.path())
        .unwrap_or_else(|e| panic!("[{label}] load failed: {e}"));
    assert_eq!(config, back, "[{label}] roundtrip equality");
}

#[test]
fn load_without_file_reports_not_found() {
    let home = TempDir::new().expect("home");
    match config::load_at(home.path()) {
        Err(ConfigError::ConfigNotFound { path }) => {
            assert_eq!(path, config::config_path_at(home.path()));
        }
        other => panic!("expected ConfigNotFound, got {other:?}"),
    }
}

#[test]
fn malformed_yaml_reports_parse_error_with_path() {
    let home = TempDir::new().expect("home");
    let root = config::vigil_root(home.path());
    std::fs::create_dir_all(&root).expect("mkdir");
    std::fs::write(config::config_path_at(home.path()), "owner: [unclosed").expect("write");

    match config::load_at(home.path()) {
        Err(ConfigError::Parse { path, .. }) => {
            assert_eq!(path, config::config_path_at(home.path()));
        }
        other => panic!("expected Parse error, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn saved_config_is_owner_readable_only() {
    use std::os::unix::fs::PermissionsExt;

    let home = TempDir::new().expect("home");
    let path = config::save_at(home.path(), &minimal_config()).expect("save");
    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600, "config file should be mode 0600");
}
