//! Error types for structured-output LLM calls.

/// A specialized `Result` type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while requesting structured output from an LLM.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    // ========================================================================
    // Client Setup Errors
    // ========================================================================
    /// No API key was supplied, so no client could be created.
    #[error("OpenAI client not initialized: no API key provided\n\nSuggestion: Please enter your OpenAI API key or set the configured environment variable")]
    MissingApiKey,

    /// The requested model is not one of the supported identifiers.
    #[error("Invalid model specified: {model}\n\nSuggestion: Use one of 'o1', 'o1-2024-12-17', 'gpt-4o-mini-2024-07-18', 'gpt-4o-2024-08-06'")]
    InvalidModel {
        /// The model identifier that was rejected.
        model: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The HTTP request could not be completed.
    #[error("Request to LLM provider failed: {0}\n\nSuggestion: Check your network connection and the configured baseUrl")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status code.
    #[error("LLM provider returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the provider.
        body: String,
    },

    // ========================================================================
    // Response Errors
    // ========================================================================
    /// The response did not contain the expected tool call.
    #[error("No valid structured response returned from OpenAI: {message}")]
    MalformedResponse {
        /// What was missing or unexpected.
        message: String,
    },

    /// The tool call arguments were not valid JSON for the requested type.
    #[error("Failed to parse structured output from OpenAI: {0}")]
    Parse(#[source] serde_json::Error),

    /// The model asked for a tool that has no registered handler.
    #[error("Tool implementation not found for: {name}")]
    UnknownTool {
        /// Name of the requested tool.
        name: String,
    },
}

impl LlmError {
    /// Creates a new `InvalidModel` error.
    #[must_use]
    pub fn invalid_model(model: impl Into<String>) -> Self {
        Self::InvalidModel {
            model: model.into(),
        }
    }

    /// Creates a new `Api` error.
    #[must_use]
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownTool` error.
    #[must_use]
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Returns `true` if retrying the same request might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the error was caused by the caller's input rather
    /// than the provider.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::InvalidModel { .. })
    }
}
