//! Tests for config file resolution and graceful degradation
//!
//! Covers:
//! - Priority order: explicit path, then TGBRIDGE_CONFIG
//! - Missing config file → defaults, not an error
//! - Malformed config file → error
//!
//! Note: uses serial_test because several tests manipulate TGBRIDGE_CONFIG.
//! Tests touching the variable are marked #[serial] so they never interleave.

use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;
use tgbridge_common::config::{load_or_default, resolve_config_path, CONFIG_ENV_VAR};
use tgbridge_common::Error;

#[test]
#[serial]
fn test_explicit_path_wins_over_env() {
    let dir = TempDir::new().unwrap();
    let explicit = dir.path().join("explicit.toml");
    let from_env = dir.path().join("env.toml");

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let resolved = resolve_config_path(Some(&explicit));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(explicit));
}

#[test]
#[serial]
fn test_env_var_used_without_explicit_path() {
    let dir = TempDir::new().unwrap();
    let from_env = dir.path().join("env.toml");

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(from_env));
}

#[test]
#[serial]
fn test_missing_explicit_file_degrades_to_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    env::remove_var(CONFIG_ENV_VAR);
    let config = load_or_default(Some(&missing)).expect("missing file must not be fatal");

    assert!(config.server.port.is_none());
    assert!(config.telegram.api_hash.is_none());
}

#[test]
#[serial]
fn test_config_loaded_from_env_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server]\nport = 4100\n\n[telegram]\napi_id = 777\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let config = load_or_default(None);
    env::remove_var(CONFIG_ENV_VAR);

    let config = config.unwrap();
    assert_eq!(config.server.port, Some(4100));
    assert_eq!(config.telegram.api_id, Some(777));
}

#[test]
#[serial]
fn test_malformed_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server\nport = ").unwrap();

    env::remove_var(CONFIG_ENV_VAR);
    let err = load_or_default(Some(&path)).unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("config.toml"));
}
