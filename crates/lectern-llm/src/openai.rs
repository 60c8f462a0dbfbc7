//! OpenAI LLM provider implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use lectern_core::error::{ErrorCode, LecternError, LecternResult};
use lectern_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage, Tool, ToolCall, ToolChoice,
};
use lectern_core::types::{Message, MessageRole};

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionNamedToolChoice,
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestToolMessage,
        ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionToolType, CreateChatCompletionRequest, FunctionCall, FunctionName,
        FunctionObject,
    },
    Client,
};

/// OpenAI LLM provider.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI LLM provider.
    pub fn new(config: LlmConfig) -> LecternResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                LecternError::Configuration("OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        let openai_config = if let Some(ref base_url) = config.base_url {
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        let mut config = config;
        if config.model.is_empty() {
            config.model = LlmConfig::default().model;
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }

    /// Check if this is a reasoning model that doesn't support certain params.
    fn is_reasoning_model_internal(&self) -> bool {
        let model_lower = self.config.model.to_lowercase();
        ["o1", "o3", "o4", "gpt-5"]
            .iter()
            .any(|m| model_lower.starts_with(m))
    }

    fn tool_call_to_openai(call: &ToolCall) -> ChatCompletionMessageToolCall {
        ChatCompletionMessageToolCall {
            id: call.id.clone(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: call.name.clone(),
                arguments: serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".into()),
            },
        }
    }

    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            MessageRole::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: msg.name.clone(),
                })
            }
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: msg.name.clone(),
                })
            }
            MessageRole::Assistant => {
                let tool_calls = (!msg.tool_calls.is_empty())
                    .then(|| msg.tool_calls.iter().map(Self::tool_call_to_openai).collect());
                let content = (!msg.content.is_empty() || tool_calls.is_none()).then(|| {
                    ChatCompletionRequestAssistantMessageContent::Text(msg.content.clone())
                });
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: msg.name.clone(),
                    tool_calls,
                    ..Default::default()
                })
            }
            MessageRole::Tool => {
                ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                    content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                    tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
                })
            }
        }
    }

    fn tool_to_openai(tool: &Tool) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.parameters.clone()),
                strict: None,
            },
        }
    }

    fn tool_choice_to_openai(choice: &ToolChoice) -> ChatCompletionToolChoiceOption {
        match choice {
            ToolChoice::Auto => ChatCompletionToolChoiceOption::Auto,
            ToolChoice::None => ChatCompletionToolChoiceOption::None,
            ToolChoice::Required => ChatCompletionToolChoiceOption::Required,
            ToolChoice::Specific(name) => {
                ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionName { name: name.clone() },
                })
            }
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: &ToolChoice,
        options: Option<GenerationOptions>,
    ) -> CreateChatCompletionRequest {
        let options = options.unwrap_or_default();

        let mut request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(Self::message_to_openai).collect(),
            max_completion_tokens: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
            ..Default::default()
        };

        // Only add temperature/top_p for non-reasoning models
        if !self.is_reasoning_model_internal() {
            request.temperature = Some(options.temperature.unwrap_or(self.config.temperature));
            request.top_p = Some(options.top_p.unwrap_or(self.config.top_p));
        }

        if !tools.is_empty() {
            request.tools = Some(tools.iter().map(Self::tool_to_openai).collect());
            request.tool_choice = Some(Self::tool_choice_to_openai(tool_choice));
        }

        request
    }

    async fn send(&self, request: CreateChatCompletionRequest) -> LecternResult<LlmResponse> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LecternError::Llm {
                message: "No response choices returned".to_string(),
                code: ErrorCode::LlmInvalidResponse,
                source: None,
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(tool_call_from_openai)
            .collect::<LecternResult<Vec<_>>>()?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        debug!(
            model = %self.config.model,
            tool_calls = tool_calls.len(),
            tokens = usage.as_ref().map(|u| u.total_tokens),
            "Chat completion received"
        );

        Ok(LlmResponse {
            content: choice.message.content,
            tool_calls,
            usage,
        })
    }
}

fn tool_call_from_openai(call: ChatCompletionMessageToolCall) -> LecternResult<ToolCall> {
    let arguments = parse_arguments(&call.function.arguments)?;
    Ok(ToolCall {
        id: call.id,
        name: call.function.name,
        arguments,
    })
}

/// Parse a tool call's JSON argument string. An empty string means no arguments.
fn parse_arguments(raw: &str) -> LecternResult<HashMap<String, serde_json::Value>> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(raw).map_err(|e| LecternError::Llm {
        message: format!("Invalid tool call arguments: {e}"),
        code: ErrorCode::LlmInvalidResponse,
        source: Some(Box::new(e)),
    })
}

fn classify(err: OpenAIError) -> LecternError {
    let code = match &err {
        OpenAIError::Reqwest(_) => ErrorCode::LlmConnectionFailed,
        _ => ErrorCode::LlmGenerationFailed,
    };
    LecternError::Llm {
        message: format!("OpenAI API error: {err}"),
        code,
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl Llm for OpenAIProvider {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> LecternResult<LlmResponse> {
        let request = self.build_request(messages, &[], &ToolChoice::None, options);
        self.send(request).await
    }

    async fn generate_with_tools(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: ToolChoice,
        options: Option<GenerationOptions>,
    ) -> LecternResult<LlmResponse> {
        let request = self.build_request(messages, tools, &tool_choice, options);
        self.send(request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn is_reasoning_model(&self) -> bool {
        self.is_reasoning_model_internal()
    }
}
