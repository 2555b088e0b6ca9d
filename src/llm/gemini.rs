//! Gemini client over the OpenAI-compatible chat endpoint.

use super::{CompletionRequest, LanguageModel};
use crate::config::LlmSettings;
use crate::error::{Result, StudyflowError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Create an OpenAI-protocol client pointed at the configured endpoint.
pub fn create_client(settings: &LlmSettings, api_key: &str) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    let config = OpenAIConfig::new()
        .with_api_base(settings.api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Gemini chat-completion client.
pub struct GeminiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GeminiClient {
    /// Create a client from settings. Fails if no API key is configured.
    pub fn from_settings(settings: &LlmSettings, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            StudyflowError::Config(format!(
                "No LLM API key configured. Set {} or llm.api_key in the config file.",
                settings.api_key_env
            ))
        })?;

        Ok(Self {
            client: create_client(settings, &api_key)?,
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, json = request.json))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| StudyflowError::Provider(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| StudyflowError::Provider(e.to_string()))?
                .into(),
        ];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(request.temperature);
        if request.json {
            args.response_format(ResponseFormat::JsonObject);
        }
        let chat_request = args
            .build()
            .map_err(|e| StudyflowError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| StudyflowError::Provider(format!("Chat completion failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| StudyflowError::SchemaParse("Empty response from model".to_string()))?;

        debug!("Model response: {}", preview(&content, 300));
        Ok(content)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
