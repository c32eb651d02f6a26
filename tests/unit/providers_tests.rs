/*!
 * Tests for provider request builders and the mock translator
 */

use dataset_translator::app_config::{TranslationConfig, TranslationProvider};
use dataset_translator::errors::TranslationError;
use dataset_translator::providers::anthropic::{Anthropic, AnthropicRequest, AnthropicResponse};
use dataset_translator::providers::mock::MockTranslator;
use dataset_translator::providers::openai::{OpenAI, OpenAIMessage, OpenAIRequest, OpenAIResponse};
use dataset_translator::providers::Provider;
use dataset_translator::translation::{build_translator, TextTranslator};

#[test]
fn test_openaiRequest_chained_shouldSerializeAllSettings() {
    let request = OpenAIRequest::new("gpt-4o-mini")
        .add_message("system", "Translate")
        .add_message("user", "Hello")
        .temperature(0.3)
        .max_tokens(500)
        .top_p(0.9);

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    assert_eq!(json["max_tokens"], 500);
    assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    assert!((json["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
}

#[test]
fn test_openaiRequest_default_shouldOmitSampling() {
    let json = serde_json::to_value(OpenAIRequest::default()).unwrap();

    assert!(json.get("temperature").is_none());
    assert!(json.get("max_tokens").is_none());
}

#[test]
fn test_openaiMessage_withUnicode_shouldRoundTrip() {
    let message = OpenAIMessage {
        role: "user".to_string(),
        content: "Très bien: こんにちは".to_string(),
    };

    let json = serde_json::to_string(&message).unwrap();
    let back: OpenAIMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(back.content, message.content);
}

#[test]
fn test_openaiResponse_withNullContent_shouldExtractEmptyText() {
    let response: OpenAIResponse = serde_json::from_str(
        r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
    ).unwrap();

    assert_eq!(OpenAI::extract_text(&response), "");
}

#[test]
fn test_anthropicRequest_shouldCarrySystemPrompt() {
    let request = AnthropicRequest::new("claude-3-haiku-20240307", 4096)
        .system("You will be provided with a sentence in English")
        .add_message("user", "Hello")
        .temperature(0.7);

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["system"], "You will be provided with a sentence in English");
    assert_eq!(json["messages"][0]["role"], "user");
}

#[test]
fn test_anthropicResponse_withoutUsage_shouldParse() {
    let response: AnthropicResponse = serde_json::from_str(
        r#"{"content":[{"type":"text","text":"Bonjour"}]}"#,
    ).unwrap();

    assert_eq!(Anthropic::extract_text(&response), "Bonjour");
}

#[test]
fn test_buildTranslator_forEveryProvider_shouldRequireApiKey() {
    let mut config = TranslationConfig::default();

    for provider in TranslationProvider::ALL {
        assert!(matches!(
            build_translator(provider, &config),
            Err(TranslationError::Configuration(_))
        ));

        config.set_api_key(&provider, "test-key");
        let translator = build_translator(provider, &config).unwrap();
        assert_eq!(translator.name(), provider.to_lowercase_string());
    }
}

#[test]
fn test_mockTranslator_empty_shouldReturnEmptyText() {
    let translator = MockTranslator::empty();

    let text = tokio_test::block_on(translator.translate("Hello", "English", "French")).unwrap();

    assert_eq!(text, "");
    assert_eq!(translator.call_count(), 1);
}
