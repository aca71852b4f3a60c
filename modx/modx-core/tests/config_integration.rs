//! Integration tests for configuration file handling

use modx_core::config::{ModxConfig, DEFAULT_TIMEOUT_MS};
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_temp_env() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    (temp_dir, config_path)
}

#[tokio::test]
async fn test_load_or_create_writes_defaults() {
    let (_temp_dir, config_path) = setup_temp_env();
    assert!(!config_path.exists());

    let config = ModxConfig::load_or_create(&config_path).await.unwrap();
    assert!(config_path.exists());
    assert_eq!(config.http.timeout_ms, DEFAULT_TIMEOUT_MS);

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[general]"));
    assert!(content.contains("timeout_ms"));
}

#[tokio::test]
async fn test_save_and_reload() {
    let (_temp_dir, config_path) = setup_temp_env();

    let mut config = ModxConfig::default();
    config.general.log_level = "warn".to_string();
    config.http.timeout_ms = 1500;
    config.http.user_agent = Some("modx-test".to_string());
    config.storage.sites_file = Some(PathBuf::from("/srv/modx/sites.json"));
    config.save_to_path(&config_path).await.unwrap();

    let loaded = ModxConfig::load_from_path(&config_path).await.unwrap();
    assert_eq!(loaded.http.timeout_ms, 1500);
    assert_eq!(loaded.http.user_agent.as_deref(), Some("modx-test"));
    assert_eq!(
        loaded.sites_path().unwrap(),
        PathBuf::from("/srv/modx/sites.json")
    );
    assert!(!config_path.with_extension("toml.tmp").exists());
}

#[tokio::test]
async fn test_partial_file_uses_defaults() {
    let (_temp_dir, config_path) = setup_temp_env();
    std::fs::write(&config_path, "[http]\ntimeout_ms = 3000\n").unwrap();

    let loaded = ModxConfig::load_from_path(&config_path).await.unwrap();
    assert_eq!(loaded.http.timeout_ms, 3000);
    assert_eq!(loaded.general.log_level, "info");
}

#[tokio::test]
async fn test_invalid_file_is_a_config_error() {
    let (_temp_dir, config_path) = setup_temp_env();
    std::fs::write(&config_path, "[general]\nlog_level = \"chatty\"\n").unwrap();

    let err = ModxConfig::load_from_path(&config_path).await.unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));
}

#[tokio::test]
async fn test_missing_file_is_a_config_error() {
    let (_temp_dir, config_path) = setup_temp_env();
    assert!(ModxConfig::load_from_path(&config_path).await.is_err());
}
