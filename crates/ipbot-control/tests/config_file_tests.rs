//! 配置文件读写测试

use ipbot_control::{ConfigError, ControlConfig, ControlCore, TiltBand};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ipbot.toml");

    let mut config = ControlConfig::default();
    config.pid.kp = 60.0;
    config.pid.integral_limit = Some(400.0);
    config.safety.recover_band = TiltBand::new(172.0, 188.0);
    config.save(&path).unwrap();

    let loaded = ControlConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(ControlCore::new(loaded).is_ok());
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = ControlConfig::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[steering]\nposition_scale_a = 0.0\n").unwrap();

    match ControlConfig::load(&path) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "steering.position_scale_a"),
        other => panic!("Expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_empty_file_is_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();
    assert_eq!(ControlConfig::load(&path).unwrap(), ControlConfig::default());
}
