//! OpenAI-compatible chat model backend.
//!
//! Talks to any endpoint that speaks the `/v1/chat/completions` protocol, so
//! the same code serves OpenAI itself and self-hosted gateways. Point it
//! elsewhere through [`OpenAIConfig::with_api_base`].

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, ChatCompletionResponseFormat,
    ChatCompletionResponseFormatType, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use aurindex_core::domain::{InsightRequest, InsightResponse};
use tracing::debug;

use crate::error::InsightError;
use crate::model::InsightModel;
use crate::parse::parse_insight_response;
use crate::prompt::build_prompt;

/// Deadline applied to one chat completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_COMPLETION_TOKENS: u16 = 1000;
const TEMPERATURE: f32 = 0.1;

/// [`InsightModel`] backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiInsightModel {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiInsightModel {
    /// Connect to the default OpenAI endpoint. The API key is taken from the
    /// `OPENAI_API_KEY` environment variable.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), model, DEFAULT_TIMEOUT)
    }

    /// Connect with explicit endpoint configuration and call deadline.
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl InsightModel for OpenAiInsightModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &InsightRequest) -> Result<InsightResponse, InsightError> {
        let prompt = build_prompt(request);
        debug!(
            index = %request.index_name,
            model = %self.model,
            prompt_chars = prompt.len(),
            "requesting insight"
        );

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|err| InsightError::upstream(format!("failed to build chat message: {err}")))?;
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages([message.into()])
            .max_tokens(MAX_COMPLETION_TOKENS)
            .temperature(TEMPERATURE)
            .response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
            .build()
            .map_err(|err| InsightError::upstream(format!("failed to build chat request: {err}")))?;

        let chat = self.client.chat();
        let call = chat.create(chat_request);
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|err| InsightError::upstream(err.to_string()))?,
            Err(_) => {
                return Err(InsightError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| InsightError::upstream("model reply contained no content"))?;

        parse_insight_response(&content)
    }
}
