//! HTTP client for the tutor backend.
//!
//! The backend exposes three endpoints:
//!
//! - `POST /api/documents/upload` - Upload a PDF (multipart field `file`)
//! - `POST /api/chat/` - Ask a question in chat, exam or flashcard mode
//! - `GET /` - Liveness message
//!
//! # Example
//!
//! ```no_run
//! use tutor_core::{ApiClient, ChatRequest, Mode};
//!
//! # async fn example() -> tutor_core::Result<()> {
//! let client = ApiClient::new();
//! let answer = client
//!     .send_message(&ChatRequest::new("What is chapter 2 about?", Vec::new(), Mode::Chat))
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, TutorError};

/// Address of the tutor backend.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Path of the document upload endpoint.
const UPLOAD_PATH: &str = "/api/documents/upload";

/// Path of the chat endpoint. The trailing slash is part of the route.
const CHAT_PATH: &str = "/api/chat/";

// ============================================================================
// Wire Types
// ============================================================================

/// Top-level application mode, also sent as the `mode` tag of chat requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Free-form questions about the uploaded document.
    #[default]
    Chat,
    /// Timed exam generated from the document.
    Exam,
    /// Flashcards generated from the document.
    Flashcard,
}

impl Mode {
    /// All modes in menu order.
    pub const ALL: [Self; 3] = [Self::Chat, Self::Exam, Self::Flashcard];

    /// Parses a mode name, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chat" => Some(Self::Chat),
            "exam" => Some(Self::Exam),
            "flashcard" | "flashcards" | "cards" => Some(Self::Flashcard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Exam => write!(f, "exam"),
            Self::Flashcard => write!(f, "flashcard"),
        }
    }
}

/// Author of a history entry as the backend names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the client.
    User,
    /// The AI tutor.
    Assistant,
}

/// One prior turn sent along with a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who produced the turn.
    pub role: Role,
    /// Text of the turn.
    pub content: String,
}

/// Request body for `POST /api/chat/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question, or the question count for exam requests.
    pub question: String,
    /// Turns preceding the question, oldest first.
    pub chat_history: Vec<HistoryEntry>,
    /// Which generator the backend should use.
    pub mode: Mode,
}

impl ChatRequest {
    /// Creates a new chat request.
    #[must_use]
    pub fn new(question: impl Into<String>, chat_history: Vec<HistoryEntry>, mode: Mode) -> Self {
        Self {
            question: question.into(),
            chat_history,
            mode,
        }
    }
}

/// Response body for `POST /api/chat/`.
///
/// For exam and flashcard modes `answer` holds a JSON-encoded array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The backend's answer.
    pub answer: String,
}

/// Response body for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Name under which the backend stored the file.
    pub filename: String,
    /// Human-readable status message.
    pub message: String,
    /// Number of text chunks indexed, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_added: Option<u64>,
}

/// Error body returned by the backend on failure.
///
/// `detail` is usually a string; validation failures carry a structured value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Description of the failure.
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Returns the detail as display text.
    #[must_use]
    pub fn detail_text(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Response body for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Liveness message.
    pub message: String,
}

// ============================================================================
// Backend Abstraction
// ============================================================================

/// The remote operations the sessions depend on.
///
/// Implemented by [`ApiClient`]; tests substitute canned backends.
pub trait TutorBackend: Send + Sync {
    /// Uploads a document and returns the backend's acknowledgement.
    fn upload_document(&self, path: &Path) -> impl Future<Output = Result<UploadResponse>> + Send;

    /// Sends a chat-style request and returns the raw `answer` string.
    fn send_message(&self, request: &ChatRequest) -> impl Future<Output = Result<String>> + Send;
}

// ============================================================================
// Client
// ============================================================================

/// Thin wrapper over the backend's HTTP API.
///
/// Cloning is cheap; clones share one connection pool. No call is retried.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    /// Creates a client for the fixed backend address.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client for another address. Used by test harnesses.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tutor-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the backend address this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Uploads a document as multipart field `file`.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Io` if the file cannot be read,
    /// `TutorError::UploadError` if the backend rejects it, and
    /// `TutorError::NetworkError` if no response arrives.
    pub async fn upload_document(&self, path: &Path) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "document.pdf".to_string(), |n| n.to_string_lossy().to_string());

        info!(file = %file_name, size = bytes.len(), "Uploading document");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| TutorError::network(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TutorError::network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TutorError::network(e.to_string()))?;

        if !status.is_success() {
            let detail = error_detail(status, &body);
            warn!(status = status.as_u16(), detail = %detail, "Upload rejected");
            return Err(TutorError::upload(detail));
        }

        let upload: UploadResponse = serde_json::from_str(&body)?;
        info!(filename = %upload.filename, chunks = ?upload.chunks_added, "Upload accepted");
        Ok(upload)
    }

    /// Sends a chat request and returns the `answer` string.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::BackendError` on a non-success status and
    /// `TutorError::NetworkError` if no response arrives.
    pub async fn send_message(&self, request: &ChatRequest) -> Result<String> {
        debug!(
            mode = %request.mode,
            history = request.chat_history.len(),
            "Sending chat request"
        );

        let response = self
            .http
            .post(self.url(CHAT_PATH))
            .json(request)
            .send()
            .await
            .map_err(|e| TutorError::network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TutorError::network(e.to_string()))?;

        if !status.is_success() {
            let detail = error_detail(status, &body);
            warn!(status = status.as_u16(), mode = %request.mode, detail = %detail, "Chat request failed");
            return Err(TutorError::backend(status.as_u16(), detail));
        }

        let chat: ChatResponse = serde_json::from_str(&body)?;
        debug!(mode = %request.mode, answer_len = chat.answer.len(), "Chat response received");
        Ok(chat.answer)
    }

    /// Fetches the backend's liveness message.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::NetworkError` if the backend is unreachable and
    /// `TutorError::BackendError` on a non-success status.
    pub async fn health_check(&self) -> Result<String> {
        let response = self
            .http
            .get(self.url("/"))
            .send()
            .await
            .map_err(|e| TutorError::network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TutorError::network(e.to_string()))?;

        if !status.is_success() {
            return Err(TutorError::backend(status.as_u16(), error_detail(status, &body)));
        }

        let health: HealthResponse = serde_json::from_str(&body)?;
        Ok(health.message)
    }
}

impl TutorBackend for ApiClient {
    fn upload_document(&self, path: &Path) -> impl Future<Output = Result<UploadResponse>> + Send {
        Self::upload_document(self, path)
    }

    fn send_message(&self, request: &ChatRequest) -> impl Future<Output = Result<String>> + Send {
        Self::send_message(self, request)
    }
}

/// Extracts the `detail` of an error body, falling back to the raw body or
/// the status reason.
fn error_detail(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        return error.detail_text();
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status
        .canonical_reason()
        .map_or_else(|| status.as_u16().to_string(), ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Chat).unwrap(), r#""chat""#);
        assert_eq!(serde_json::to_string(&Mode::Exam).unwrap(), r#""exam""#);
        assert_eq!(
            serde_json::to_string(&Mode::Flashcard).unwrap(),
            r#""flashcard""#
        );
    }

    #[test]
    fn test_mode_from_str_case_insensitive() {
        assert_eq!(Mode::from_str_case_insensitive("EXAM"), Some(Mode::Exam));
        assert_eq!(
            Mode::from_str_case_insensitive("cards"),
            Some(Mode::Flashcard)
        );
        assert_eq!(Mode::from_str_case_insensitive("quiz"), None);
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest::new(
            "요약해줘",
            vec![
                HistoryEntry {
                    role: Role::User,
                    content: "안녕".to_string(),
                },
                HistoryEntry {
                    role: Role::Assistant,
                    content: "안녕하세요".to_string(),
                },
            ],
            Mode::Chat,
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["question"], "요약해줘");
        assert_eq!(value["mode"], "chat");
        assert_eq!(value["chat_history"][0]["role"], "user");
        assert_eq!(value["chat_history"][1]["role"], "assistant");
        assert_eq!(value["chat_history"][1]["content"], "안녕하세요");
    }

    #[test]
    fn test_upload_response_accepts_chunk_count() {
        let json = r#"{"filename":"a.pdf","message":"ok","chunks_added":12}"#;
        let upload: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(upload.chunks_added, Some(12));

        let json = r#"{"filename":"a.pdf","message":"ok"}"#;
        let upload: UploadResponse = serde_json::from_str(json).unwrap();
        assert!(upload.chunks_added.is_none());
    }

    #[test]
    fn test_error_detail_prefers_detail_field() {
        let detail = error_detail(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"detail":"PDF에서 텍스트를 추출하지 못했거나 파일이 비어있습니다."}"#,
        );
        assert_eq!(detail, "PDF에서 텍스트를 추출하지 못했거나 파일이 비어있습니다.");
    }

    #[test]
    fn test_error_detail_stringifies_structured_detail() {
        let detail = error_detail(
            reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body","question"],"msg":"field required"}]}"#,
        );
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_error_detail_falls_back_to_status_reason() {
        let detail = error_detail(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(detail, "Internal Server Error");

        let detail = error_detail(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(detail, "upstream down");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::with_base_url("http://localhost:9000/");
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(client.url(CHAT_PATH), "http://localhost:9000/api/chat/");
    }

    #[test]
    fn test_default_client_uses_fixed_address() {
        assert_eq!(ApiClient::new().base_url(), DEFAULT_BASE_URL);
    }
}
