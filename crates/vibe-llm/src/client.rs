//! Structured-output client for OpenAI-compatible chat completion APIs.
//!
//! The client forces the model to answer through a single function tool whose
//! parameters are the caller's JSON schema, then parses that tool call's
//! arguments into the caller's type.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vibe_llm::{code_analysis_schema, CodeAnalysisResult, StructuredOutputClient, StructuredRequest};
//!
//! # async fn example() -> vibe_llm::Result<()> {
//! let client = StructuredOutputClient::new("sk-...", "https://api.openai.com/v1", Duration::from_secs(60))?;
//! let request = StructuredRequest::new("Analyze this code", code_analysis_schema());
//! let result: CodeAnalysisResult = client.get_structured_output(&request).await?;
//! println!("{:?}", result.analysis.skill_level);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::model::OpenAiModel;

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// System prompt used when the caller does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that responds with structured JSON data according to the provided schema.";

/// Sampling temperature used when the caller does not supply one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Name of the function tool the model is forced to call.
pub const STRUCTURED_TOOL_NAME: &str = "get_structured_response";

const STRUCTURED_TOOL_DESCRIPTION: &str = "Generate a structured response based on the query";

// ============================================================================
// Wire Types
// ============================================================================

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Result of a tool invocation.
    Tool,
}

/// A single chat message, including tool calls and tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,
    /// Text content. Assistant messages that only call tools may omit it.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Identifier of the tool call a `tool` message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Creates a tool result message answering `tool_call_id`.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call identifier.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    /// The function name and its JSON-encoded arguments.
    pub function: FunctionCall,
}

/// Function name plus raw JSON arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call.
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    pub arguments: String,
}

/// A function tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The function's signature.
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Creates a function tool with a JSON schema for its parameters.
    #[must_use]
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: function_kind(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Name, description and parameter schema of a function tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: String,
    /// What the function does.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

fn function_kind() -> String {
    "function".to_string()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    pub tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessage,
}

// ============================================================================
// Structured Request
// ============================================================================

/// Parameters of a single structured-output call.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    /// The user prompt.
    pub prompt: String,
    /// JSON schema the answer must follow.
    pub schema: Value,
    /// Model to call.
    pub model: OpenAiModel,
    /// System prompt; [`DEFAULT_SYSTEM_PROMPT`] when `None`.
    pub system_prompt: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional completion token cap.
    pub max_tokens: Option<u32>,
}

impl StructuredRequest {
    /// Creates a request with the default model, system prompt and temperature.
    #[must_use]
    pub fn new(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
            model: OpenAiModel::default(),
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    /// Sets the model.
    #[must_use]
    pub const fn with_model(mut self, model: OpenAiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the completion token cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for structured-output requests.
#[derive(Clone)]
pub struct StructuredOutputClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for StructuredOutputClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredOutputClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl StructuredOutputClient {
    /// Creates a client for `base_url` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingApiKey` if the key is blank and
    /// `LlmError::Request` if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }

    /// Returns the endpoint this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests a structured answer and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Parse` if the arguments do not match `T`, plus any
    /// error from [`Self::get_structured_value`].
    pub async fn get_structured_output<T: DeserializeOwned>(
        &self,
        request: &StructuredRequest,
    ) -> Result<T> {
        let value = self.get_structured_value(request).await?;
        serde_json::from_value(value).map_err(LlmError::Parse)
    }

    /// Requests a structured answer and returns the raw JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Request` or `LlmError::Api` on transport failure,
    /// `LlmError::MalformedResponse` when the first choice carries no
    /// `get_structured_response` tool call, and `LlmError::Parse` when its
    /// arguments are not valid JSON.
    pub async fn get_structured_value(&self, request: &StructuredRequest) -> Result<Value> {
        let system_prompt = request
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(request.prompt.as_str()),
        ];
        let tools = [ToolDefinition::function(
            STRUCTURED_TOOL_NAME,
            STRUCTURED_TOOL_DESCRIPTION,
            request.schema.clone(),
        )];

        let body = ChatCompletionRequest {
            model: request.model.as_str(),
            messages: &messages,
            tools: &tools,
            tool_choice: Some(json!({
                "type": "function",
                "function": { "name": STRUCTURED_TOOL_NAME }
            })),
            response_format: Some(json!({ "type": "json_object" })),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Requesting structured output"
        );

        let response = self.chat(&body).await?;
        let call = response
            .choices
            .first()
            .and_then(|choice| choice.message.tool_calls.first())
            .ok_or_else(|| LlmError::malformed("response contained no tool call"))?;

        if call.function.name != STRUCTURED_TOOL_NAME {
            return Err(LlmError::malformed(format!(
                "unexpected tool call '{}'",
                call.function.name
            )));
        }

        serde_json::from_str(&call.function.arguments).map_err(LlmError::Parse)
    }

    /// Sends one chat completion request.
    pub(crate) async fn chat(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "LLM provider returned an error");
            return Err(LlmError::api(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LlmError::malformed(format!("unexpected response body: {e}")))
    }
}
