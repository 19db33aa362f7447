/*!
 * Tests for application configuration functionality
 */

use persdeck::app_config::{Config, DeckRoute, LogLevel, ServiceConfig};
use persdeck::language_utils::TargetLanguage;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.service.base_url, "http://localhost:8000/api");
    assert_eq!(config.service.deck_route, DeckRoute::Global);
    assert_eq!(config.service.build_version, "v1");
    assert_eq!(config.service.output_format, "quizlet");
    assert!(config.service.auth_token.is_empty());
    assert_eq!(config.default_target_language, "EN-US");
    assert_eq!(config.target_language().unwrap(), TargetLanguage::EnUs);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.service.base_url = "ftp://example.com".to_string();
    assert!(config.validate().is_err());
    config.service.base_url = "not a url".to_string();
    assert!(config.validate().is_err());
    config.service.base_url = "https://decks.example.com/api/".to_string();
    assert!(config.validate().is_ok());

    config.default_target_language = "xx".to_string();
    assert!(config.validate().is_err());
    config.default_target_language = "de".to_string();
    assert!(config.validate().is_ok());

    config.service.build_version = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_fromJson_withPartialFile_shouldFillDefaults() {
    let json = r#"{
        "service": { "base_url": "http://decks.local", "deck_route": "per_job" },
        "log_level": "debug"
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.service.base_url, "http://decks.local");
    assert_eq!(config.service.deck_route, DeckRoute::PerJob);
    assert_eq!(config.service.output_format, "quizlet");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.default_target_language, "EN-US");
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let created = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(created.service.base_url, ServiceConfig::default().base_url);

    let reloaded = Config::from_file(&path).unwrap();
    assert_eq!(reloaded.default_target_language, created.default_target_language);
}

#[test]
fn test_fromFile_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();
    assert!(Config::from_file(&path).is_err());
}
