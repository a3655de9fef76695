//! LLM API client abstraction for OpenAI, Anthropic, and Gemini.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client as OpenAIClient,
};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI (GPT models).
    OpenAI,
    /// Anthropic (Claude models).
    Anthropic,
    /// Google (Gemini models).
    Gemini,
}

impl LlmProvider {
    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Configuration for LLM client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    provider: LlmProvider,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmConfig {
    /// Creates a new LLM configuration.
    #[instrument(skip(api_key), fields(provider = ?provider, model = %model))]
    pub fn new(provider: LlmProvider, api_key: String, model: String, max_tokens: u32) -> Self {
        debug!("Creating LLM config");
        Self {
            provider,
            api_key,
            model,
            max_tokens,
        }
    }

    /// Gets the provider.
    #[instrument(skip(self))]
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Gets the API key.
    #[instrument(skip(self))]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Gets the model name.
    #[instrument(skip(self))]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Gets the max tokens.
    #[instrument(skip(self))]
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// LLM client that abstracts over multiple providers.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = ?config.provider()))]
    pub fn new(config: LlmConfig) -> Self {
        info!("Creating LLM client");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Generates a completion from a system prompt and user message.
    #[instrument(skip(self, system_prompt, user_message), fields(provider = ?self.config.provider, model = %self.config.model))]
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        debug!("Generating completion");
        match self.config.provider {
            LlmProvider::OpenAI => self.generate_openai(system_prompt, user_message).await,
            LlmProvider::Anthropic => self.generate_anthropic(system_prompt, user_message).await,
            LlmProvider::Gemini => self.generate_gemini(system_prompt, user_message).await,
        }
    }

    /// Generates a completion using Anthropic Claude.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_anthropic(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        let request = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", self.config.api_key.as_str())
            .header("anthropic-version", "2023-06-01")
            .json(&serde_json::json!({
                "model": self.config.model,
                "max_tokens": self.config.max_tokens,
                "system": system_prompt,
                "messages": [{ "role": "user", "content": user_message }]
            }));

        let body = Self::send_json("Anthropic", request).await?;
        Self::text_at(&body, "/content/0/text", "Anthropic")
    }

    /// Generates a completion using Google Gemini.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_gemini(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.config.model
        );
        let request = self
            .http
            .post(url)
            .header("x-goog-api-key", self.config.api_key.as_str())
            .json(&serde_json::json!({
                "systemInstruction": { "parts": [{ "text": system_prompt }] },
                "contents": [{ "role": "user", "parts": [{ "text": user_message }] }],
                "generationConfig": { "maxOutputTokens": self.config.max_tokens }
            }));

        let body = Self::send_json("Gemini", request).await?;
        Self::text_at(&body, "/candidates/0/content/parts/0/text", "Gemini")
    }

    /// Sends a JSON request and returns the decoded body of a 2xx response.
    async fn send_json(
        vendor: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, LlmError> {
        debug!(vendor, "Sending request");
        let response = request.send().await.map_err(|e| {
            error!(vendor, error = ?e, "API request failed");
            LlmError::new(format!("{} API request failed: {}", vendor, e))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(vendor, error = ?e, "Failed to read response");
            LlmError::new(format!("Failed to read {} response: {}", vendor, e))
        })?;

        if !status.is_success() {
            error!(vendor, status = %status, response = %text, "API error");
            return Err(LlmError::new(format!(
                "{} API error {}: {}",
                vendor, status, text
            )));
        }

        debug!(vendor, response_length = text.len(), "Parsing response");
        serde_json::from_str(&text).map_err(|e| {
            error!(vendor, error = ?e, response = %text, "Failed to parse response");
            LlmError::new(format!("Failed to parse {} response: {}", vendor, e))
        })
    }

    /// Text found at `pointer` in a response body.
    fn text_at(body: &serde_json::Value, pointer: &str, vendor: &str) -> Result<String, LlmError> {
        let content = body
            .pointer(pointer)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                error!(vendor, response = %body, "No text content in response");
                LlmError::new(format!("No text content in {} response", vendor))
            })?
            .to_string();

        info!(vendor, content_length = content.len(), "Generated completion");
        Ok(content)
    }

    /// Generates a completion using OpenAI.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_openai(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        debug!("Creating OpenAI client");

        let client = OpenAIClient::with_config(
            OpenAIConfig::new().with_api_key(self.config.api_key.clone()),
        );

        debug!("Building chat completion request");
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|e| {
                        error!(error = ?e, "Failed to build system message");
                        LlmError::new(format!("Failed to build system message: {}", e))
                    })?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()
                    .map_err(|e| {
                        error!(error = ?e, "Failed to build user message");
                        LlmError::new(format!("Failed to build user message: {}", e))
                    })?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build request");
                LlmError::new(format!("Failed to build request: {}", e))
            })?;

        debug!("Sending request to OpenAI");
        let response = client.chat().create(request).await.map_err(|e| {
            error!(error = ?e, "OpenAI API error");
            LlmError::new(format!("OpenAI API error: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                error!("No content in OpenAI response");
                LlmError::new("No content in OpenAI response".to_string())
            })?;

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error: {} at {}:{}", message, file, line)]
pub struct LlmError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "LLM error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
