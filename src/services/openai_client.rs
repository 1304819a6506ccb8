use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, ScoutError};

/// Text in, text out. The classifier owns prompt building and parsing.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct OpenaiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenaiClient {
    pub fn new(
        api_key: &SecretString,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(OpenaiClient {
            client: Client::with_config(config).with_http_client(http_client),
            model: model.into(),
            temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenaiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .temperature(self.temperature)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .max_tokens(500_u32)
            .build()?;

        let response = self.client.chat().create(request).await?;
        log::debug!("Response: {:?}", response);

        response
            .choices
            .first()
            .ok_or_else(|| ScoutError::api("openai", "No choices in Openai response"))?
            .message
            .content
            .clone()
            .ok_or_else(|| ScoutError::api("openai", "No content"))
    }
}

/// Stands in when no OpenAI key is configured, so single classification
/// reports the missing key instead of failing at startup.
pub struct UnconfiguredModel;

#[async_trait]
impl LanguageModel for UnconfiguredModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(ScoutError::Configuration(
            "OpenAI API key is not set".to_string(),
        ))
    }
}
