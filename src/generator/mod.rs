//! Text generation abstraction and the two-stage story generation components.
//!
//! The generation service is consumed through the `TextGenerator` trait so
//! the controller can be exercised with mocks. `OutlineRequester` and
//! `ChapterExpander` implement the two stages of story generation on top of
//! it.

mod chapter;
mod outline;

pub use chapter::ChapterExpander;
pub use outline::OutlineRequester;

use crate::error::{LullError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A text generation service: prompt in, free-form text out.
///
/// The text is expected to contain a structured payload; coercion and
/// validation are the sanitizer's job, not the generator's.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI-backed text generator.
pub struct OpenAiGenerator {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Build a generator with a per-request timeout so a hung chapter call
    /// surfaces as a transient failure instead of stalling the run.
    pub fn new(model: &str, temperature: f32, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client: async_openai::Client::with_config(OpenAIConfig::default())
                .with_http_client(http_client),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| LullError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| LullError::OpenAI(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| LullError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| LullError::MalformedResponse("Empty response from LLM".to_string()))?;

        debug!(
            "Generation response ({} chars): {}",
            content.chars().count(),
            content.chars().take(200).collect::<String>()
        );

        Ok(content.clone())
    }
}

/// Map API failures into the retry taxonomy: timeouts, rate limits, and
/// server overloads are transient; everything else is not retried.
fn classify_openai_error(e: OpenAIError) -> LullError {
    match e {
        OpenAIError::Reqwest(inner) => {
            if inner.is_timeout() || inner.is_connect() {
                LullError::TransientService(format!("Request failed: {}", inner))
            } else {
                LullError::Http(inner)
            }
        }
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.clone().unwrap_or_default();
            let message = api.message.to_lowercase();
            let transient = kind == "rate_limit_error"
                || kind == "server_error"
                || message.contains("rate limit")
                || message.contains("overloaded")
                || message.contains("try again");
            if transient {
                LullError::TransientService(api.message)
            } else {
                LullError::OpenAI(api.message)
            }
        }
        other => LullError::OpenAI(other.to_string()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_rate_limit_is_transient() {
        let err = classify_openai_error(OpenAIError::ApiError(async_openai::error::ApiError {
            message: "Rate limit reached for requests".to_string(),
            r#type: Some("rate_limit_error".to_string()),
            param: None,
            code: None,
        }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_api_invalid_request_is_not_transient() {
        let err = classify_openai_error(OpenAIError::ApiError(async_openai::error::ApiError {
            message: "Invalid model specified".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: Some("model".to_string()),
            code: None,
        }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_stream_error_is_not_transient() {
        let err = classify_openai_error(OpenAIError::StreamError("boom".to_string()));
        assert!(!err.is_transient());
    }
}
