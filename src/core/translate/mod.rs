use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("invalid translator config: {0}")]
    InvalidConfig(&'static str),
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("translation endpoint returned {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("translation response had no content")]
    EmptyResponse,
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslateError>;

    fn name(&self) -> &'static str;
}

/// Returns the input untouched. Used when no translation backend is configured.
#[derive(Debug, Clone, Default)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

pub fn validate_config(config: &LlmConfig) -> Result<(), TranslateError> {
    if config.base_url.trim().is_empty() {
        return Err(TranslateError::InvalidConfig("base_url is empty"));
    }
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return Err(TranslateError::InvalidConfig("base_url must be http(s)"));
    }
    if config.api_key.trim().is_empty() {
        return Err(TranslateError::InvalidConfig("api_key is empty"));
    }
    if config.model.trim().is_empty() {
        return Err(TranslateError::InvalidConfig("model is empty"));
    }
    if config.timeout_secs == 0 {
        return Err(TranslateError::InvalidConfig("timeout_secs must be positive"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

pub async fn call_chat_completion(
    client: &reqwest::Client,
    config: &LlmConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String, TranslateError> {
    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
    let request = ChatRequest {
        model: &config.model,
        messages: [
            ChatMessage {
                role: "system",
                content: system_prompt,
            },
            ChatMessage {
                role: "user",
                content: user_prompt,
            },
        ],
        temperature: 0.0,
    };

    let response = client
        .post(&url)
        .bearer_auth(&config.api_key)
        .timeout(Duration::from_secs(config.timeout_secs))
        .json(&request)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TranslateError::HttpStatus {
            status: status.as_u16(),
            body: body.chars().take(512).collect(),
        });
    }

    let payload: ChatResponse = response.json().await?;
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(TranslateError::EmptyResponse)
}

/// Machine translation through an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionTranslator {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatCompletionTranslator {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Result<Self, TranslateError> {
        validate_config(&config)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Translator for ChatCompletionTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslateError> {
        let system_prompt = format!(
            "You are a professional technical translator. Translate the user's text from \
             {source_language} to {target_language}. Reply with the translation only."
        );
        call_chat_completion(&self.client, &self.config, &system_prompt, text).await
    }

    fn name(&self) -> &'static str {
        "chat-completion"
    }
}
