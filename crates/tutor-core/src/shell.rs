//! Top-level mode shell.
//!
//! The shell owns everything that outlives a mode switch (the chat transcript,
//! the chat session and the uploader) plus the view of the active mode. Exam
//! and flashcard views are created fresh on entry and dropped on exit.

use tracing::info;

use crate::api::Mode;
use crate::chat::{ChatSession, Transcript};
use crate::config::Config;
use crate::exam::{ExamSession, ExamSettings};
use crate::flashcard::FlashcardDeck;
use crate::uploader::FileUploader;

/// State of the active mode's view.
#[derive(Debug, Clone)]
pub enum ModeView {
    /// The chat view keeps its state in the shell.
    Chat,
    /// A running or finished exam.
    Exam(ExamSession),
    /// A flashcard deck.
    Flashcard(FlashcardDeck),
}

impl ModeView {
    /// The mode this view belongs to.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Chat => Mode::Chat,
            Self::Exam(_) => Mode::Exam,
            Self::Flashcard(_) => Mode::Flashcard,
        }
    }
}

/// Mode selector and the state shared across modes.
#[derive(Debug, Clone)]
pub struct ModeShell {
    transcript: Transcript,
    chat: ChatSession,
    uploader: FileUploader,
    view: ModeView,
    exam_settings: ExamSettings,
    flashcard_prompt: String,
}

impl ModeShell {
    /// Creates a shell in chat mode. New exams start from the configured
    /// settings; decks request cards with the configured prompt.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            transcript: Transcript::new(),
            chat: ChatSession::new(),
            uploader: FileUploader::new(),
            view: ModeView::Chat,
            exam_settings: config.exam_settings(),
            flashcard_prompt: config.flashcard_prompt.clone(),
        }
    }

    /// The active mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.view.mode()
    }

    /// The active view.
    #[must_use]
    pub const fn view(&self) -> &ModeView {
        &self.view
    }

    /// Switches modes, replacing the active view.
    ///
    /// Returns `false` if `mode` is already active, in which case the view is
    /// kept as is.
    pub fn switch_mode(&mut self, mode: Mode) -> bool {
        if mode == self.mode() {
            return false;
        }

        let from = self.mode();
        self.view = match mode {
            Mode::Chat => ModeView::Chat,
            Mode::Exam => ModeView::Exam(ExamSession::new(self.exam_settings)),
            Mode::Flashcard => ModeView::Flashcard(FlashcardDeck::new(self.flashcard_prompt.clone())),
        };
        info!(%from, to = %mode, "Mode switched");
        true
    }

    /// The chat transcript.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The chat session.
    #[must_use]
    pub const fn chat(&self) -> &ChatSession {
        &self.chat
    }

    /// Lends the chat session and the transcript it appends to.
    pub fn chat_mut(&mut self) -> (&mut ChatSession, &mut Transcript) {
        (&mut self.chat, &mut self.transcript)
    }

    /// The document uploader.
    #[must_use]
    pub const fn uploader(&self) -> &FileUploader {
        &self.uploader
    }

    /// The document uploader, mutably.
    pub fn uploader_mut(&mut self) -> &mut FileUploader {
        &mut self.uploader
    }

    /// The exam, if exam mode is active.
    #[must_use]
    pub const fn exam(&self) -> Option<&ExamSession> {
        match &self.view {
            ModeView::Exam(exam) => Some(exam),
            _ => None,
        }
    }

    /// The exam, mutably, if exam mode is active.
    pub fn exam_mut(&mut self) -> Option<&mut ExamSession> {
        match &mut self.view {
            ModeView::Exam(exam) => Some(exam),
            _ => None,
        }
    }

    /// The deck, if flashcard mode is active.
    #[must_use]
    pub const fn deck(&self) -> Option<&FlashcardDeck> {
        match &self.view {
            ModeView::Flashcard(deck) => Some(deck),
            _ => None,
        }
    }

    /// The deck, mutably, if flashcard mode is active.
    pub fn deck_mut(&mut self) -> Option<&mut FlashcardDeck> {
        match &mut self.view {
            ModeView::Flashcard(deck) => Some(deck),
            _ => None,
        }
    }
}
