use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Configuration for a completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for API requests
    pub api_base: Option<String>,

    /// API key for authentication
    pub api_key: String,
}

/// One message in a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Per-call generation settings, taken from the persona that is speaking.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A chat-completion backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(
        &self,
        params: &GenerationParams,
        messages: Vec<PromptMessage>,
    ) -> anyhow::Result<String>;
}

/// OpenAI provider implementation
pub struct OpenAiProvider {
    config: ProviderConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::new();
        Self { config, client }
    }

    fn api_base(&self) -> String {
        self.config
            .api_base
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(
        &self,
        params: &GenerationParams,
        messages: Vec<PromptMessage>,
    ) -> anyhow::Result<String> {
        let formatted_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role,
                    "content": msg.content
                })
            })
            .collect();

        let request_payload = json!({
            "model": params.model,
            "messages": formatted_messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        tracing::debug!("chat completion request: model={}", params.model);

        let response = self.client
            .post(format!("{}/chat/completions", self.api_base()))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("chat completion HTTP {status}: {text}"));
        }

        let data = response.json::<serde_json::Value>().await?;

        let choices = data["choices"].as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format"))?;

        if choices.is_empty() {
            return Err(anyhow::anyhow!("No completions returned"));
        }

        let text = choices[0]["message"]["content"].as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format"))?
            .trim()
            .to_string();

        Ok(text)
    }
}
