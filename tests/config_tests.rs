// Config loading and validation tests

use dockdash::config::AppConfig;
use std::path::Path;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[docker]
socket = "/var/run/docker.sock"
timeout_secs = 30

[dashboard]
publish_interval_ms = 250
redraw_interval_ms = 2000
channel_capacity = 64

[logging]
file = "logs/dockdash.log"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.docker.socket.as_deref(), Some("/var/run/docker.sock"));
    assert_eq!(config.docker.timeout_secs, 30);
    assert_eq!(config.dashboard.publish_interval_ms, 250);
    assert_eq!(config.dashboard.redraw_interval_ms, 2000);
    assert_eq!(config.dashboard.channel_capacity, 64);
    assert_eq!(config.logging.file, Path::new("logs/dockdash.log"));
}

#[test]
fn test_config_defaults_when_sections_omitted() {
    let config = AppConfig::load_from_str("").expect("empty config is valid");
    assert_eq!(config.docker.socket, None);
    assert_eq!(config.docker.timeout_secs, 120);
    assert_eq!(config.dashboard.publish_interval_ms, 500);
    assert_eq!(config.dashboard.redraw_interval_ms, 1000);
    assert_eq!(config.dashboard.channel_capacity, 256);
    assert_eq!(config.logging.file, Path::new("dockdash.log"));
}

#[test]
fn test_config_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[dashboard]\npublish_interval_ms = 100\n").expect("valid");
    assert_eq!(config.dashboard.publish_interval_ms, 100);
    assert_eq!(config.dashboard.redraw_interval_ms, 1000);
}

#[test]
fn test_config_builds_engine_config() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    let engine = config.engine();
    assert_eq!(engine.publish_interval, Duration::from_millis(250));
    assert_eq!(engine.channel_capacity, 64);
    assert_eq!(config.redraw_interval(), Duration::from_secs(2));
}

#[test]
fn test_config_validation_rejects_timeout_zero() {
    let bad = VALID_CONFIG.replace("timeout_secs = 30", "timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("docker.timeout_secs"));
}

#[test]
fn test_config_validation_rejects_empty_socket() {
    let bad = VALID_CONFIG.replace("socket = \"/var/run/docker.sock\"", "socket = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("docker.socket"));
}

#[test]
fn test_config_validation_rejects_publish_interval_zero() {
    let bad = VALID_CONFIG.replace("publish_interval_ms = 250", "publish_interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("publish_interval_ms"));
}

#[test]
fn test_config_validation_rejects_redraw_interval_zero() {
    let bad = VALID_CONFIG.replace("redraw_interval_ms = 2000", "redraw_interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("redraw_interval_ms"));
}

#[test]
fn test_config_validation_rejects_channel_capacity_zero() {
    let bad = VALID_CONFIG.replace("channel_capacity = 64", "channel_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("channel_capacity"));
}

#[test]
fn test_config_validation_rejects_empty_log_file() {
    let bad = VALID_CONFIG.replace("file = \"logs/dockdash.log\"", "file = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("logging.file"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_explicit_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("dockdash.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    let config = AppConfig::load(Some(&path)).expect("load from path");
    assert_eq!(config.dashboard.channel_capacity, 64);
}

#[test]
fn test_config_load_missing_file_names_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");
    let err = AppConfig::load(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("missing.toml"));
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load(None);
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.docker.timeout_secs, 30);
    assert_eq!(config.logging.file, Path::new("logs/dockdash.log"));
}
