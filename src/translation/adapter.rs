/*!
 * Translation provider adapter.
 *
 * Binds a provider's client, model and prompt settings into a single
 * `TextTranslator` that turns one field value into its translation.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Instant;

use crate::app_config::{TranslationCommonConfig, TranslationConfig, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;

/// Translates a single piece of text between two languages
///
/// Languages are passed by display name ("English"), as they appear in prompts.
#[async_trait]
pub trait TextTranslator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Translate `text`; returns the original text when the provider yields nothing
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;
}

/// Provider-backed translator
#[derive(Debug)]
pub enum ProviderTranslator {
    /// OpenAI chat completions
    OpenAI {
        /// Client instance
        client: OpenAI,
        /// Model name
        model: String,
        /// Prompt and sampling settings
        common: TranslationCommonConfig,
    },

    /// Anthropic messages
    Anthropic {
        /// Client instance
        client: Anthropic,
        /// Model name
        model: String,
        /// Prompt and sampling settings
        common: TranslationCommonConfig,
    },
}

/// Build the translator for `provider` from the translation configuration
///
/// Fails with a configuration error when the provider has no API key.
pub fn build_translator(
    provider: TranslationProvider,
    config: &TranslationConfig,
) -> Result<Box<dyn TextTranslator>, TranslationError> {
    Ok(Box::new(ProviderTranslator::from_config(provider, config)?))
}

/// Send a minimal request through the provider a translator name selects
///
/// Returns the provider on success.
pub async fn test_translator_connection(
    translator_name: &str,
    config: &TranslationConfig,
) -> Result<TranslationProvider, TranslationError> {
    let provider = TranslationProvider::from_translator_name(translator_name)?;
    let translator = ProviderTranslator::from_config(provider, config)?;

    info!("Testing connection to {} ({})", provider.display_name(), translator.model());
    translator.test_connection().await?;
    Ok(provider)
}

impl ProviderTranslator {
    /// Bind `provider`'s credentials, model and prompt settings
    pub fn from_config(provider: TranslationProvider, config: &TranslationConfig) -> Result<Self, TranslationError> {
        let api_key = config.get_api_key(&provider);
        if api_key.trim().is_empty() {
            return Err(TranslationError::Configuration(format!(
                "No API key configured for provider {}",
                provider.display_name()
            )));
        }

        let model = config.get_model(&provider);
        let endpoint = config.get_endpoint(&provider);
        let timeout_secs = config.get_timeout_secs(&provider);
        let common = config.common.clone();

        Ok(match provider {
            TranslationProvider::OpenAI => Self::OpenAI {
                client: OpenAI::new(api_key, endpoint, model.clone(), timeout_secs),
                model,
                common,
            },
            TranslationProvider::Anthropic => Self::Anthropic {
                client: Anthropic::new(api_key, endpoint, model.clone(), timeout_secs),
                model,
                common,
            },
        })
    }

    /// Model used for completions
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Anthropic { model, .. } => model,
        }
    }

    /// Check that the provider accepts our credentials
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match self {
            Self::OpenAI { client, .. } => client.test_connection().await,
            Self::Anthropic { client, .. } => client.test_connection().await,
        }
    }
}

#[async_trait]
impl TextTranslator for ProviderTranslator {
    fn name(&self) -> &str {
        match self {
            Self::OpenAI { .. } => "openai",
            Self::Anthropic { .. } => "anthropic",
        }
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let start_time = Instant::now();

        let translated = match self {
            Self::OpenAI { client, model, common } => {
                let system_prompt = common.render_system_prompt(source_language, target_language);
                let request = OpenAIRequest::new(model.clone())
                    .add_message("system", system_prompt)
                    .add_message("user", text)
                    .temperature(common.temperature)
                    .max_tokens(common.max_tokens)
                    .top_p(common.top_p);

                let response = client.complete(request).await?;
                OpenAI::extract_text(&response)
            }
            Self::Anthropic { client, model, common } => {
                let system_prompt = common.render_system_prompt(source_language, target_language);
                let request = AnthropicRequest::new(model.clone(), common.max_tokens)
                    .system(system_prompt)
                    .add_message("user", text)
                    .temperature(common.temperature)
                    .top_p(common.top_p);

                let response = client.complete(request).await?;
                Anthropic::extract_text(&response)
            }
        };

        debug!(
            "{} answered in {:?} ({} chars)",
            self.name(),
            start_time.elapsed(),
            translated.len()
        );

        Ok(fallback_to_original(translated, text))
    }
}

/// Use the original text when the provider returned no content
fn fallback_to_original(translated: String, original: &str) -> String {
    if translated.trim().is_empty() {
        warn!("Provider returned no text, keeping the original value");
        original.to_string()
    } else {
        translated
    }
}
