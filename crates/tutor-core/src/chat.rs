//! Chat transcript and session.
//!
//! The transcript is append-only and owned by the mode shell; the chat
//! session borrows it mutably for the two phases of a send:
//!
//! 1. [`ChatSession::begin_send`] appends the user's turn right away and
//!    returns the request to issue.
//! 2. [`ChatSession::complete`] appends the assistant's answer, or an error
//!    turn, once the backend call settles.
//!
//! Turns are never retracted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{ChatRequest, HistoryEntry, Mode, Role, TutorBackend};
use crate::error::{Result, TutorError};

/// Prefix of the assistant turn appended when a chat request fails.
pub const CHAT_ERROR_PREFIX: &str = "오류가 발생했습니다. ";

// ============================================================================
// ChatTurn
// ============================================================================

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person using the client.
    User,
    /// The AI tutor.
    Assistant,
}

impl From<Sender> for Role {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Self::User,
            Sender::Assistant => Self::Assistant,
        }
    }
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who wrote the turn.
    pub sender: Sender,
    /// Text of the turn.
    pub text: String,
    /// Whether this assistant turn reports a failed request.
    #[serde(default)]
    pub is_error: bool,
    /// When the turn was appended.
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    /// Creates a user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into(), false)
    }

    /// Creates an assistant turn carrying an answer.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text.into(), false)
    }

    /// Creates an assistant turn describing a failed request.
    #[must_use]
    pub fn error(error: &TutorError) -> Self {
        Self::new(
            Sender::Assistant,
            format!("{CHAT_ERROR_PREFIX}{}", error.user_message()),
            true,
        )
    }

    fn new(sender: Sender, text: String, is_error: bool) -> Self {
        Self {
            sender,
            text,
            is_error,
            at: Utc::now(),
        }
    }
}

impl From<&ChatTurn> for HistoryEntry {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            role: turn.sender.into(),
            content: turn.text.clone(),
        }
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Ordered, append-only sequence of chat turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Turns in chronological order.
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if no turn has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The whole transcript as backend history entries.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.turns.iter().map(HistoryEntry::from).collect()
    }

    fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }
}

// ============================================================================
// ChatSession
// ============================================================================

/// Whether a chat request is outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    /// Ready to send.
    #[default]
    Idle,
    /// One request is in flight; sending is disabled.
    AwaitingResponse,
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingResponse => write!(f, "awaiting_response"),
        }
    }
}

/// Send/receive state of the chat view.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    status: ChatStatus,
}

impl ChatSession {
    /// Creates an idle session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: ChatStatus::Idle,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> ChatStatus {
        self.status
    }

    /// Returns `true` while a request is outstanding.
    #[must_use]
    pub const fn is_awaiting(&self) -> bool {
        matches!(self.status, ChatStatus::AwaitingResponse)
    }

    /// First phase of a send.
    ///
    /// Blank input is ignored and yields `Ok(None)`. Otherwise the user's turn
    /// is appended and the request to issue is returned; its history holds
    /// the turns that preceded the new one.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` while a request is
    /// already outstanding.
    pub fn begin_send(
        &mut self,
        transcript: &mut Transcript,
        text: &str,
    ) -> Result<Option<ChatRequest>> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(None);
        }

        if self.is_awaiting() {
            return Err(TutorError::invalid_transition(
                self.status,
                ChatStatus::AwaitingResponse,
            ));
        }

        let history = transcript.history();
        transcript.push(ChatTurn::user(question));
        self.status = ChatStatus::AwaitingResponse;

        info!(
            turns = transcript.len(),
            history = history.len(),
            "Chat question sent"
        );

        Ok(Some(ChatRequest::new(question, history, Mode::Chat)))
    }

    /// Second phase of a send: appends the answer or an error turn.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` if no request is outstanding.
    pub fn complete(&mut self, transcript: &mut Transcript, outcome: Result<String>) -> Result<()> {
        if !self.is_awaiting() {
            return Err(TutorError::invalid_transition(self.status, ChatStatus::Idle));
        }

        let turn = match outcome {
            Ok(answer) => ChatTurn::assistant(answer),
            Err(error) => {
                warn!(error = %error, "Chat request failed");
                ChatTurn::error(&error)
            }
        };
        transcript.push(turn);
        self.status = ChatStatus::Idle;
        Ok(())
    }

    /// Sends one question and waits for the answer.
    ///
    /// Returns `Ok(false)` if the input was blank and nothing was sent.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` if another request is
    /// outstanding. Backend failures become error turns, not errors.
    pub async fn send<B: TutorBackend>(
        &mut self,
        transcript: &mut Transcript,
        backend: &B,
        text: &str,
    ) -> Result<bool> {
        let Some(request) = self.begin_send(transcript, text)? else {
            return Ok(false);
        };
        let outcome = backend.send_message(&request).await;
        self.complete(transcript, outcome)?;
        Ok(true)
    }
}
