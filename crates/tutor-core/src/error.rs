//! Error types for the tutor client.
//!
//! This module defines the error hierarchy for every client operation:
//! configuration loading, file selection, backend calls, batch generation
//! and session state transitions.

use std::path::PathBuf;

/// A specialized `Result` type for tutor client operations.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Errors that can occur while talking to the tutor backend or driving a session.
///
/// Error variants are organized by subsystem and include actionable suggestions
/// where possible.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your tutor.json with a JSON linter")]
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
    // Document Selection Errors
    // ========================================================================
    /// The selected document cannot be uploaded.
    #[error("Cannot upload '{path}': {reason}")]
    InvalidFile {
        /// Path of the rejected file.
        path: PathBuf,
        /// Why the file was rejected.
        reason: String,
    },

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The backend rejected an uploaded document.
    #[error("Upload rejected: {detail}")]
    UploadError {
        /// Detail string supplied by the backend.
        detail: String,
    },

    /// The backend answered a chat request with a non-success status.
    #[error("Backend returned {status}: {detail}")]
    BackendError {
        /// HTTP status code.
        status: u16,
        /// Detail string supplied by the backend, or the status reason.
        detail: String,
    },

    /// No response reached the client.
    #[error("Network error: {message}\n\nSuggestion: Check that the tutor backend is running on 127.0.0.1:8000")]
    NetworkError {
        /// Transport-level description.
        message: String,
    },

    /// An exam or flashcard payload could not be turned into a batch.
    #[error("Generation error: {kind}")]
    GenerationError {
        /// What was wrong with the payload.
        kind: GenerationErrorKind,
    },

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid state transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    /// A question or card index outside the current batch.
    #[error("Item {index} does not exist (batch has {count} items)")]
    IndexOutOfRange {
        /// Zero-based index that was addressed.
        index: usize,
        /// Number of items in the batch.
        count: usize,
    },

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

/// Categories of batch generation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The payload parsed as JSON but was not an array.
    NotAnArray,
    /// The payload was not valid JSON, or an element had the wrong shape.
    Malformed(String),
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnArray => write!(f, "payload is not a JSON array"),
            Self::Malformed(message) => write!(f, "malformed payload: {message}"),
        }
    }
}

impl TutorError {
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

    /// Creates a new `InvalidFile` error.
    #[must_use]
    pub fn invalid_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `UploadError`.
    #[must_use]
    pub fn upload(detail: impl Into<String>) -> Self {
        Self::UploadError {
            detail: detail.into(),
        }
    }

    /// Creates a new `BackendError`.
    #[must_use]
    pub fn backend(status: u16, detail: impl Into<String>) -> Self {
        Self::BackendError {
            status,
            detail: detail.into(),
        }
    }

    /// Creates a new `NetworkError`.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates a `GenerationError` for a payload that is not an array.
    #[must_use]
    pub const fn not_an_array() -> Self {
        Self::GenerationError {
            kind: GenerationErrorKind::NotAnArray,
        }
    }

    /// Creates a `GenerationError` for a payload that could not be parsed.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::GenerationError {
            kind: GenerationErrorKind::Malformed(message.into()),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns the backend-supplied detail string, if this error carries one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::UploadError { detail } | Self::BackendError { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// Returns the short text shown to the user inside chat bubbles and banners.
    ///
    /// Prefers the backend detail; otherwise falls back to the transport or
    /// parse message without the suggestion footer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UploadError { detail } | Self::BackendError { detail, .. } => detail.clone(),
            Self::NetworkError { message } => message.clone(),
            Self::GenerationError { kind } => kind.to_string(),
            other => other.to_string(),
        }
    }

    /// Returns `true` if the user may simply trigger the action again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::GenerationError { .. }
                | Self::BackendError {
                    status: 500..=599,
                    ..
                }
        )
    }

    /// Returns `true` if this error is a generation failure of the given kind.
    #[must_use]
    pub fn is_generation(&self, kind: &GenerationErrorKind) -> bool {
        matches!(self, Self::GenerationError { kind: k } if k == kind)
    }
}
