//! Configuration loading tests
//!
//! - missing config file degrades to defaults
//! - resolution priority: CLI argument, then ROLLCALL_CONFIG, then config dir
//! - command-line overrides win over file values
//! - invalid files are rejected
//!
//! Tests touching ROLLCALL_CONFIG are #[serial] so they never race on the
//! process environment.

use rollcall_common::config::{resolve_config_path, ConfigOverrides, ServiceConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let overrides = ConfigOverrides {
        config_path: Some(PathBuf::from("/nonexistent/rollcall/config.toml")),
        ..Default::default()
    };
    let config = ServiceConfig::load(overrides).unwrap();
    assert_eq!(config.port, 5000);
    assert_eq!(config.campus.latitude, 17.409954);
}

#[test]
#[serial]
fn test_cli_path_beats_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    let cli = PathBuf::from("/tmp/from-cli.toml");
    assert_eq!(resolve_config_path(Some(&cli)), Some(cli.clone()));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    assert_eq!(resolve_config_path(None), Some(PathBuf::from("/tmp/from-env.toml")));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_config_dir_fallback() {
    env::remove_var(CONFIG_ENV_VAR);
    if let Some(path) = resolve_config_path(None) {
        assert!(path.ends_with("rollcall/config.toml"));
    }
}

#[test]
#[serial]
fn test_file_loaded_through_env_var() {
    let file = write_config(
        r#"
        port = 7000
        token_ttl_hours = 12

        [campus]
        latitude = 12.5
        longitude = 77.25
        radius_km = 1.0

        [logging]
        level = "debug"
        "#,
    );
    env::set_var(CONFIG_ENV_VAR, file.path());
    let config = ServiceConfig::load(ConfigOverrides::default()).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.port, 7000);
    assert_eq!(config.token_ttl_hours, 12);
    assert_eq!(config.campus.latitude, 12.5);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_overrides_win() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("port = 7000\nhost = \"127.0.0.1\"\n");
    let config = ServiceConfig::load(ConfigOverrides {
        config_path: Some(file.path().to_path_buf()),
        database_path: Some(PathBuf::from("/tmp/override.db")),
        host: None,
        port: Some(9000),
    })
    .unwrap();

    assert_eq!(config.port, 9000);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.database_path, PathBuf::from("/tmp/override.db"));
}

#[test]
#[serial]
fn test_invalid_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("[slots]\nmorning_start = 600\nmorning_end = 500\n");
    let result = ServiceConfig::load(ConfigOverrides {
        config_path: Some(file.path().to_path_buf()),
        ..Default::default()
    });
    assert!(result.is_err());

    let garbage = write_config("this is not = = toml");
    assert!(ServiceConfig::from_file(garbage.path()).is_err());
}
