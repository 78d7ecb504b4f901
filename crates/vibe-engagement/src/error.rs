//! Error types for the engagement service.
//!
//! Variants are grouped by subsystem and carry an actionable suggestion where
//! the user can do something about the failure.

use std::path::PathBuf;

/// A specialized `Result` type for engagement service operations.
pub type Result<T> = std::result::Result<T, VibeError>;

/// Errors that can occur in the engagement service.
#[derive(Debug, thiserror::Error)]
pub enum VibeError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your vibe.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// A caller supplied an empty or malformed value.
    #[error("{0}")]
    InvalidInput(String),

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No session exists with the given id.
    #[error("Session not found: {id}")]
    SessionNotFound {
        /// The requested session id.
        id: String,
    },

    /// No task exists with the given id.
    #[error("Task not found: {id}")]
    TaskNotFound {
        /// The requested task id.
        id: String,
    },

    /// No student exists with the given id.
    #[error("Student not found: {id}")]
    StudentNotFound {
        /// The requested student id.
        id: String,
    },

    /// No snippet exists for the chapter and file name.
    #[error("Snippet not found: chapter {chapter}, '{name}'")]
    SnippetNotFound {
        /// Chapter number.
        chapter: u32,
        /// File name within the chapter's examples.
        name: String,
    },

    // ========================================================================
    // Snippet Loading Errors
    // ========================================================================
    /// Snippet file exceeds the 100KB size limit.
    #[error("Snippet exceeds size limit (100KB): '{path}' is {size_kb}KB\n\nSuggestion: Move large fixtures out of the chapter's examples directory")]
    SnippetTooLarge {
        /// Path to the oversized snippet.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    /// Snippet file contains non-UTF-8 content.
    #[error("Snippet has invalid encoding: '{path}'\n\nSuggestion: Convert the file to UTF-8 encoding")]
    SnippetEncodingError {
        /// Path to the snippet with encoding issues.
        path: PathBuf,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Stored task data contains malformed JSON.
    #[error("Corrupted storage file '{path}': {message}\n\nSuggestion: Remove the file to start with an empty list, or restore from backup")]
    StorageCorrupted {
        /// Path to the corrupted file.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    // ========================================================================
    // LLM Errors
    // ========================================================================
    /// A structured-output request failed.
    #[error(transparent)]
    Llm(#[from] vibe_llm::LlmError),

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VibeError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(id: impl std::fmt::Display) -> Self {
        Self::SessionNotFound { id: id.to_string() }
    }

    /// Creates a new `TaskNotFound` error.
    #[must_use]
    pub fn task_not_found(id: impl std::fmt::Display) -> Self {
        Self::TaskNotFound { id: id.to_string() }
    }

    /// Creates a new `StudentNotFound` error.
    #[must_use]
    pub fn student_not_found(id: impl Into<String>) -> Self {
        Self::StudentNotFound { id: id.into() }
    }

    /// Creates a new `SnippetNotFound` error.
    #[must_use]
    pub fn snippet_not_found(chapter: u32, name: impl Into<String>) -> Self {
        Self::SnippetNotFound {
            chapter,
            name: name.into(),
        }
    }

    /// Creates a new `SnippetTooLarge` error.
    #[must_use]
    pub fn snippet_too_large(path: impl Into<PathBuf>, size_kb: u64) -> Self {
        Self::SnippetTooLarge {
            path: path.into(),
            size_kb,
        }
    }

    /// Creates a new `SnippetEncodingError`.
    #[must_use]
    pub fn snippet_encoding(path: impl Into<PathBuf>) -> Self {
        Self::SnippetEncodingError { path: path.into() }
    }

    /// Creates a new `StorageCorrupted` error.
    #[must_use]
    pub fn storage_corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StorageCorrupted {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the error refers to something that does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound { .. }
                | Self::TaskNotFound { .. }
                | Self::StudentNotFound { .. }
                | Self::SnippetNotFound { .. }
        )
    }

    /// Returns `true` if this error is fatal at startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::StorageCorrupted { .. }
        )
    }
}
