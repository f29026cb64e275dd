// tests/error_handling.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use update_executor::config::load_and_validate;
use update_executor::errors::UpdateError;

#[test]
fn test_partial_settings_use_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[install]
dir = "/srv/client"
executable = "agent"
staging_dir = "/srv/staging"

[poll]
interval_ms = 250
"#
    )
    .unwrap();

    let settings = load_and_validate(file.path()).unwrap();

    assert_eq!(settings.live_executable().to_str(), Some("/srv/client/agent"));
    assert_eq!(settings.backup_dir.to_str(), Some("/srv/client/backup"));
    assert_eq!(settings.start_poll.attempts, 10);
    assert_eq!(settings.stop_poll.interval, Duration::from_millis(250));
    assert_eq!(settings.health_command, "device-client-cli");
}

#[test]
fn test_zero_interval_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[poll]
interval_ms = 0
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(UpdateError::ConfigError(msg)) => assert!(msg.contains("interval_ms")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_malformed_toml_returns_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[install\ndir = 3").unwrap();

    match load_and_validate(file.path()) {
        Err(UpdateError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_missing_settings_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    match load_and_validate(dir.path().join("executor.toml")) {
        Err(UpdateError::IoError(_)) => {}
        Err(e) => panic!("Expected IoError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}
