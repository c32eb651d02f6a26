/*!
 * Tests for application configuration functionality
 */

use dataset_translator::app_config::{
    Config, FailurePolicy, LogLevel, ProviderConfig, TranslationCommonConfig, TranslationProvider,
};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.database_path, "");
    assert_eq!(config.storage_dir, "datasets");
    assert_eq!(config.log_level, LogLevel::Info);

    let common = &config.translation.common;
    assert_eq!(common.temperature, 0.7);
    assert_eq!(common.max_tokens, 4096);
    assert_eq!(common.top_p, 1.0);
    assert_eq!(common.failure_policy, FailurePolicy::Abort);

    let openai = config.translation.get_provider_config(&TranslationProvider::OpenAI)
        .expect("OpenAI provider config should exist");
    assert_eq!(openai.endpoint, "https://api.openai.com/v1");
    assert_eq!(openai.timeout_secs, 60);
    assert!(openai.api_key.is_empty());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.translation.common.temperature = 3.0;
    assert!(config.validate().is_err());
    config.translation.common.temperature = 0.7;

    config.translation.common.top_p = 1.5;
    assert!(config.validate().is_err());
    config.translation.common.top_p = 1.0;

    config.translation.common.system_prompt = "Translate this".to_string();
    assert!(config.validate().is_err());
    config.translation.common = TranslationCommonConfig::default();

    config.translation.available_providers[0].endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
    config.translation.available_providers[0].endpoint = String::new();
    assert!(config.validate().is_ok());

    config.translation.available_providers.push(ProviderConfig {
        provider_type: "ollama".to_string(),
        model: String::new(),
        api_key: String::new(),
        endpoint: String::new(),
        timeout_secs: 30,
    });
    assert!(config.validate().is_err());
}

/// Test that a partial config file is completed with defaults
#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "translation": {
            "available_providers": [{ "type": "anthropic", "api_key": "sk-ant" }],
            "common": { "failure_policy": "mark-invalid" }
        },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.translation.common.failure_policy, FailurePolicy::MarkInvalid);
    assert_eq!(config.translation.common.max_tokens, 4096);
    assert_eq!(config.translation.get_api_key(&TranslationProvider::Anthropic), "sk-ant");
    assert_eq!(config.translation.get_model(&TranslationProvider::Anthropic), "claude-3-haiku-20240307");
    assert_eq!(config.translation.get_endpoint(&TranslationProvider::Anthropic), "https://api.anthropic.com");
    // Providers missing from the file still resolve to defaults
    assert_eq!(config.translation.get_api_key(&TranslationProvider::OpenAI), "");
    assert_eq!(config.translation.get_model(&TranslationProvider::OpenAI), "gpt-4o-mini");
}

/// Test config file creation when missing
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let created = Config::load_or_create(&path).unwrap();
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.storage_dir, created.storage_dir);
    assert_eq!(reloaded.translation.available_providers.len(), 2);
}

/// Test that a broken config file is reported
#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

/// Test the database path fallback
#[test]
fn test_resolveDatabasePath_shouldPreferConfiguredPath() {
    let mut config = Config::default();
    config.database_path = "/tmp/custom.db".to_string();
    assert_eq!(config.resolve_database_path().unwrap().to_string_lossy(), "/tmp/custom.db");

    config.database_path = String::new();
    let default_path = config.resolve_database_path().unwrap();
    assert!(default_path.ends_with("dataset-translator/dataset-translator.db"));
}

/// Test provider display helpers
#[test]
fn test_translationProvider_displayHelpers_shouldBeConsistent() {
    for provider in TranslationProvider::ALL {
        let parsed: TranslationProvider = provider.to_string().parse().unwrap();
        assert_eq!(parsed, provider);
        assert_eq!(provider.display_name().to_lowercase(), provider.to_lowercase_string());
    }
}
