//! AI Tutor client core
//!
//! Backend client, chat/exam/flashcard sessions, and the driver that ties
//! them to a single event stream.

pub mod api;
pub mod app;
pub mod batch;
pub mod chat;
pub mod config;
pub mod countdown;
pub mod error;
pub mod exam;
pub mod flashcard;
pub mod shell;
pub mod uploader;

#[cfg(test)]
mod testing;

pub use api::{
    ApiClient, ChatRequest, ChatResponse, ErrorBody, HealthResponse, HistoryEntry, Mode, Role,
    TutorBackend, UploadResponse, DEFAULT_BASE_URL,
};
pub use app::{AppEvent, Command, Notice, TutorApp, BUSY, NOT_NOW, NO_SUCH_ITEM};
pub use batch::parse_batch;
pub use chat::{ChatSession, ChatStatus, ChatTurn, Sender, Transcript, CHAT_ERROR_PREFIX};
pub use config::{Config, DEFAULT_FLASHCARD_PROMPT};
pub use countdown::{Countdown, CountdownTick, TICK_PERIOD};
pub use error::{GenerationErrorKind, Result, TutorError};
pub use exam::{
    alert_for, ExamEvent, ExamOutcome, ExamQuestion, ExamSession, ExamSettings, ExamStep,
    GradedAnswer, QuestionCount, SubmitReason, Submission, TimeLimit, EXAM_FAILURE_ALERT,
    EXAM_FORMAT_ALERT, UNANSWERED,
};
pub use flashcard::{
    CardFace, DeckStatus, Flashcard, FlashcardDeck, DECK_FAILURE_ERROR, DECK_FORMAT_ERROR,
};
pub use shell::{ModeShell, ModeView};
pub use uploader::{FileUploader, UploadStatus, NO_FILE_SELECTED, UPLOADING};
