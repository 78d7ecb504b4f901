//! Tool-calling conversations.
//!
//! An [`AgentConversation`] sends the message history together with the
//! registered tools, executes whatever tool calls the model returns through a
//! [`ToolRegistry`], appends the results and repeats until the model answers
//! without calling a tool or the turn limit is reached.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{
    ChatCompletionRequest, ChatMessage, Role, StructuredOutputClient, ToolDefinition,
    DEFAULT_TEMPERATURE,
};
use crate::error::{LlmError, Result};
use crate::model::OpenAiModel;

/// Default turn limit for [`AgentConversation::run`].
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Prefix of the tool message written when a handler fails.
pub const TOOL_ERROR_PREFIX: &str = "Error executing tool: ";

const STRUCTURED_AGENT_TOOL: &str = "generate_structured_output";

/// Executes one tool with already-parsed JSON arguments.
pub trait ToolHandler: Send + Sync {
    /// Runs the tool. An `Err` is reported back to the model, not raised.
    fn call(&self, arguments: Value) -> std::result::Result<Value, String>;
}

impl<F> ToolHandler for F
where
    F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync,
{
    fn call(&self, arguments: Value) -> std::result::Result<Value, String> {
        self(arguments)
    }
}

/// Tool definitions offered to the model plus their implementations.
#[derive(Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, Box<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field(
                "tools",
                &self
                    .definitions
                    .iter()
                    .map(|d| d.function.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any earlier handler with the same name.
    #[must_use]
    pub fn register(mut self, definition: ToolDefinition, handler: impl ToolHandler + 'static) -> Self {
        let name = definition.function.name.clone();
        self.definitions.retain(|existing| existing.function.name != name);
        self.definitions.push(definition);
        self.handlers.insert(name, Box::new(handler));
        self
    }

    /// Returns the tool definitions sent with each request.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Runs every tool call in `message` and returns one `tool` message per call.
    ///
    /// Argument parse failures and handler errors become
    /// `"Error executing tool: ..."` messages so the model can react to them.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::UnknownTool` if a call names an unregistered tool.
    pub fn execute(&self, message: &ChatMessage) -> Result<Vec<ChatMessage>> {
        let mut responses = Vec::with_capacity(message.tool_calls.len());

        for call in &message.tool_calls {
            let handler = self
                .handlers
                .get(&call.function.name)
                .ok_or_else(|| LlmError::unknown_tool(&call.function.name))?;

            let outcome = serde_json::from_str::<Value>(&call.function.arguments)
                .map_err(|e| e.to_string())
                .and_then(|arguments| handler.call(arguments));

            let content = match outcome {
                Ok(Value::String(text)) => text,
                Ok(value) => value.to_string(),
                Err(e) => format!("{TOOL_ERROR_PREFIX}{e}"),
            };

            debug!(tool = %call.function.name, call_id = %call.id, "Executed tool call");
            responses.push(ChatMessage::tool(call.id.as_str(), content));
        }

        Ok(responses)
    }
}

/// Settings for a tool-calling conversation.
#[derive(Debug, Clone)]
pub struct AgentConversation<'a> {
    client: &'a StructuredOutputClient,
    model: OpenAiModel,
    temperature: f64,
    max_tokens: Option<u32>,
    max_turns: usize,
}

impl<'a> AgentConversation<'a> {
    /// Creates a conversation with the default model, temperature and turn limit.
    #[must_use]
    pub fn new(client: &'a StructuredOutputClient) -> Self {
        Self {
            client,
            model: OpenAiModel::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Sets the model.
    #[must_use]
    pub const fn with_model(mut self, model: OpenAiModel) -> Self {
        self.model = model;
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

    /// Sets how many tool-executing turns [`Self::run`] may take.
    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sends `messages` once and returns the assistant's reply.
    ///
    /// # Errors
    ///
    /// Returns transport errors from the client and
    /// `LlmError::MalformedResponse` if the reply has no choices.
    pub async fn respond(&self, messages: &[ChatMessage], tools: &ToolRegistry) -> Result<ChatMessage> {
        let body = ChatCompletionRequest {
            model: self.model.as_str(),
            messages,
            tools: tools.definitions(),
            tool_choice: None,
            response_format: None,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.client.chat(&body).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::malformed("response contained no choices"))
    }

    /// Runs the conversation to completion and returns the full transcript.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::respond`] or
    /// [`ToolRegistry::execute`].
    pub async fn run(
        &self,
        initial_messages: Vec<ChatMessage>,
        tools: &ToolRegistry,
    ) -> Result<Vec<ChatMessage>> {
        let mut messages = initial_messages;
        let mut turns = 0;

        while turns < self.max_turns {
            let reply = self.respond(&messages, tools).await?;
            let tool_results = tools.execute(&reply)?;
            messages.push(reply);

            if tool_results.is_empty() {
                break;
            }

            messages.extend(tool_results);
            turns += 1;
        }

        info!(
            turns,
            messages = messages.len(),
            model = %self.model,
            "Agent conversation finished"
        );
        Ok(messages)
    }
}

/// Asks the model for structured data through a single echo tool.
///
/// Runs one tool turn and returns the first tool result parsed as `T`.
///
/// # Errors
///
/// Returns `LlmError::MalformedResponse` if the model never called the tool,
/// `LlmError::Parse` if the tool output does not match `T`, and any transport
/// error from the conversation.
pub async fn structured_output_agent<T: DeserializeOwned>(
    conversation: &AgentConversation<'_>,
    system_prompt: &str,
    user_prompt: &str,
    schema: Value,
) -> Result<T> {
    let tools = ToolRegistry::new().register(
        ToolDefinition::function(
            STRUCTURED_AGENT_TOOL,
            "Generate structured data according to the specified schema",
            schema,
        ),
        |arguments: Value| -> std::result::Result<Value, String> { Ok(arguments) },
    );

    let transcript = conversation
        .clone()
        .with_max_turns(1)
        .run(
            vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            &tools,
        )
        .await?;

    let output = transcript
        .iter()
        .find(|message| message.role == Role::Tool)
        .and_then(|message| message.content.as_deref())
        .ok_or_else(|| LlmError::malformed("No structured output was generated"))?;

    serde_json::from_str(output).map_err(LlmError::Parse)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::client::{FunctionCall, ToolCall};
    use crate::mock::{spawn_mock, text_response, tool_call_response};

    fn calculator() -> ToolRegistry {
        ToolRegistry::new().register(
            ToolDefinition::function(
                "add",
                "Add two numbers",
                json!({
                    "type": "object",
                    "properties": { "a": { "type": "number" }, "b": { "type": "number" } }
                }),
            ),
            |args: Value| -> std::result::Result<Value, String> {
                let a = args["a"].as_f64().ok_or("missing a")?;
                let b = args["b"].as_f64().ok_or("missing b")?;
                Ok(json!(a + b))
            },
        )
    }

    fn assistant_calling(name: &str, arguments: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_7".to_string(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }],
            tool_call_id: None,
        }
    }

    fn client_for(base_url: String) -> StructuredOutputClient {
        StructuredOutputClient::new("sk-test", base_url, Duration::from_secs(5)).unwrap()
    }

    // ------------------------------------------------------------------------
    // Tool execution
    // ------------------------------------------------------------------------

    #[test]
    fn test_execute_runs_handler() {
        let results = calculator()
            .execute(&assistant_calling("add", r#"{"a":2,"b":3}"#))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].role, Role::Tool);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(results[0].content.as_deref(), Some("5.0"));
    }

    #[test]
    fn test_execute_reports_handler_error() {
        let results = calculator()
            .execute(&assistant_calling("add", r#"{"a":2}"#))
            .unwrap();
        assert_eq!(
            results[0].content.as_deref(),
            Some("Error executing tool: missing b")
        );
    }

    #[test]
    fn test_execute_reports_invalid_arguments() {
        let results = calculator()
            .execute(&assistant_calling("add", "{bad"))
            .unwrap();
        assert!(results[0]
            .content
            .as_deref()
            .unwrap()
            .starts_with(TOOL_ERROR_PREFIX));
    }

    #[test]
    fn test_execute_unknown_tool_is_error() {
        let err = calculator()
            .execute(&assistant_calling("multiply", "{}"))
            .unwrap_err();
        assert!(matches!(err, LlmError::UnknownTool { name } if name == "multiply"));
    }

    #[test]
    fn test_execute_without_tool_calls_is_empty() {
        let results = calculator().execute(&ChatMessage::user("hi")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = calculator().register(
            ToolDefinition::function("add", "Add again", json!({})),
            |_: Value| -> std::result::Result<Value, String> { Ok(json!("replaced")) },
        );
        assert_eq!(registry.definitions().len(), 1);
        assert_eq!(registry.definitions()[0].function.description, "Add again");
    }

    // ------------------------------------------------------------------------
    // Conversations against a mock provider
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_run_executes_tools_until_plain_reply() {
        let (base_url, captured) = spawn_mock(vec![
            tool_call_response("add", r#"{"a":1,"b":1}"#),
            text_response("The answer is 2"),
        ])
        .await;
        let client = client_for(base_url);

        let transcript = AgentConversation::new(&client)
            .with_model(OpenAiModel::Gpt4o)
            .run(vec![ChatMessage::user("What is 1 + 1?")], &calculator())
            .await
            .unwrap();

        // user, assistant(tool call), tool, assistant(text)
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[2].content.as_deref(), Some("2.0"));
        assert_eq!(transcript[3].content.as_deref(), Some("The answer is 2"));

        let requests = captured.lock().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["model"], "gpt-4o-2024-08-06");
        assert_eq!(requests[0]["tools"][0]["function"]["name"], "add");
        assert!(requests[0].get("tool_choice").is_none());
        assert_eq!(requests[1]["messages"][2]["role"], "tool");
    }

    #[tokio::test]
    async fn test_run_stops_at_max_turns() {
        let (base_url, captured) =
            spawn_mock(vec![tool_call_response("add", r#"{"a":1,"b":2}"#)]).await;
        let client = client_for(base_url);

        let transcript = AgentConversation::new(&client)
            .with_max_turns(3)
            .run(vec![ChatMessage::user("loop")], &calculator())
            .await
            .unwrap();

        assert_eq!(captured.lock().await.len(), 3);
        // user + 3 * (assistant + tool)
        assert_eq!(transcript.len(), 7);
    }

    #[tokio::test]
    async fn test_structured_output_agent_returns_echoed_arguments() {
        #[derive(Debug, Deserialize)]
        struct Answer {
            value: u32,
        }

        let (base_url, _) = spawn_mock(vec![tool_call_response(
            "generate_structured_output",
            r#"{"value":42}"#,
        )])
        .await;
        let client = client_for(base_url);

        let answer: Answer = structured_output_agent(
            &AgentConversation::new(&client),
            "system",
            "give me a number",
            json!({ "type": "object" }),
        )
        .await
        .unwrap();
        assert_eq!(answer.value, 42);
    }

    #[tokio::test]
    async fn test_structured_output_agent_without_tool_call() {
        let (base_url, _) = spawn_mock(vec![text_response("no tools today")]).await;
        let client = client_for(base_url);

        let result: Result<Value> = structured_output_agent(
            &AgentConversation::new(&client),
            "system",
            "user",
            json!({ "type": "object" }),
        )
        .await;
        assert!(matches!(result, Err(LlmError::MalformedResponse { .. })));
    }
}
