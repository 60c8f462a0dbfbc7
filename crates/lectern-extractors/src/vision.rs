//! OpenAI-compatible vision model using async-openai.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;

use crate::error::{ExtractError, ExtractResult, TranscriptionError, TranscriptionResult};
use crate::transcriber::{TranscriptionRequest, VisionModel};

/// Configuration for the vision chat model.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Model to use (default: gpt-4o-mini).
    pub model: String,
    /// Sampling temperature (default: 0).
    pub temperature: f32,
    /// Max tokens for response (default: 4096).
    pub max_tokens: u32,
    /// Image detail level (default: High).
    pub detail: ImageDetail,
    /// API key; falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Alternative API base URL.
    pub base_url: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            detail: ImageDetail::High,
            api_key: None,
            base_url: None,
        }
    }
}

/// Vision model backed by the OpenAI chat completions API.
pub struct OpenAiVision {
    client: Client<OpenAIConfig>,
    config: VisionConfig,
}

impl OpenAiVision {
    /// Create a vision model from configuration.
    pub fn new(config: VisionConfig) -> ExtractResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ExtractError::Configuration(
                    "OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config."
                        .to_string(),
                )
            })?;

        let openai_config = if let Some(ref base_url) = config.base_url {
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }

    /// Default model, key from the environment.
    pub fn from_env() -> ExtractResult<Self> {
        Self::new(VisionConfig::default())
    }

    fn build_request(&self, request: TranscriptionRequest) -> CreateChatCompletionRequest {
        let image_part = ChatCompletionRequestMessageContentPartImage {
            image_url: ImageUrl {
                url: request.data_url(),
                detail: Some(self.config.detail.clone()),
            },
        };

        CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Array(vec![
                        ChatCompletionRequestUserMessageContentPart::Text(
                            request.instruction.into(),
                        ),
                        ChatCompletionRequestUserMessageContentPart::ImageUrl(image_part),
                    ]),
                    name: None,
                },
            )],
            temperature: Some(self.config.temperature),
            max_completion_tokens: Some(self.config.max_tokens),
            ..Default::default()
        }
    }
}

/// `Timeout` is reserved for the transcriber's own deadline; an HTTP client
/// timeout has an unrelated duration and is reported as a network failure.
fn classify(err: OpenAIError) -> TranscriptionError {
    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => {
            TranscriptionError::Network(format!("request timed out: {e}"))
        }
        OpenAIError::Reqwest(e) => TranscriptionError::Network(e.to_string()),
        OpenAIError::ApiError(e) => TranscriptionError::Rejected(e.message),
        other => TranscriptionError::Rejected(other.to_string()),
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn complete(&self, request: TranscriptionRequest) -> TranscriptionResult<String> {
        let request = self.build_request(request);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(TranscriptionError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
