//! Application driver.
//!
//! [`TutorApp`] owns the [`ModeShell`] and applies one input at a time:
//!
//! - [`Command`]s issued by the user, via [`TutorApp::execute`]
//! - [`AppEvent`]s produced by spawned backend calls and the exam countdown,
//!   via [`TutorApp::handle`]
//!
//! Backend calls run as spawned tasks that report back through the event
//! channel returned by [`TutorApp::new`]. Exam and flashcard calls belong to
//! the view that issued them: leaving the view cancels the call, and a result
//! that was already queued is dropped because it carries a stale view id.
//! Chat and upload results belong to the shell and are always applied.
//!
//! Every outcome the user should see comes back as a list of [`Notice`]s;
//! no error escapes the driver.
//!
//! # Example
//!
//! ```no_run
//! use tutor_core::{ApiClient, Command, Config, TutorApp};
//!
//! # async fn example() {
//! let (mut app, mut events) = TutorApp::new(ApiClient::new(), &Config::default());
//!
//! app.execute(Command::Send("1장 요약해줘".to_string()));
//! while let Some(event) = events.recv().await {
//!     for notice in app.handle(event) {
//!         println!("{notice:?}");
//!     }
//! }
//! # }
//! ```

use std::future::Future;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::api::{Mode, TutorBackend, UploadResponse};
use crate::config::Config;
use crate::countdown::{Countdown, CountdownTick, TICK_PERIOD};
use crate::error::{Result, TutorError};
use crate::exam::{alert_for, ExamEvent, ExamOutcome, ExamSession, ExamSettings};
use crate::flashcard::FlashcardDeck;
use crate::shell::ModeShell;

// ============================================================================
// Inputs and Outputs
// ============================================================================

/// A user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Choose the document to upload.
    SelectFile(PathBuf),
    /// Upload the selected document.
    Upload,
    /// Switch to another mode.
    SwitchMode(Mode),
    /// Send a chat question.
    Send(String),
    /// Change the exam settings while in setup.
    ConfigureExam(ExamSettings),
    /// Request an exam batch.
    StartExam,
    /// Type the answer to a question (zero-based index).
    Answer {
        /// Question index.
        index: usize,
        /// Answer text.
        text: String,
    },
    /// Submit the running exam.
    SubmitExam,
    /// Leave the result view for a new setup.
    RestartExam,
    /// Request a new flashcard batch.
    RefreshDeck,
    /// Flip one card (zero-based index).
    Flip(usize),
}

/// Completion of a spawned call, or a countdown tick.
#[derive(Debug)]
pub enum AppEvent {
    /// An upload finished.
    Uploaded(Result<UploadResponse>),
    /// A chat request finished.
    ChatAnswered(Result<String>),
    /// An exam generation request finished.
    ExamLoaded {
        /// View that issued the request.
        view_id: u64,
        /// Raw answer or failure.
        outcome: Result<String>,
    },
    /// A flashcard request finished.
    DeckLoaded {
        /// View that issued the request.
        view_id: u64,
        /// Raw answer or failure.
        outcome: Result<String>,
    },
    /// One second of the exam countdown elapsed.
    Tick(CountdownTick),
}

impl From<CountdownTick> for AppEvent {
    fn from(tick: CountdownTick) -> Self {
        Self::Tick(tick)
    }
}

/// Something the renderer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A blocking alert.
    Alert(String),
    /// A status line.
    Status(String),
    /// The transcript changed.
    ChatUpdated,
    /// The active view changed.
    ViewChanged,
    /// The exam countdown moved.
    Countdown {
        /// Seconds left.
        remaining_secs: u32,
    },
}

// ============================================================================
// Driver
// ============================================================================

/// Drives the mode shell from commands and backend events.
#[derive(Debug)]
pub struct TutorApp<B> {
    backend: B,
    shell: ModeShell,
    events: mpsc::UnboundedSender<AppEvent>,
    view_id: u64,
    view_request: Option<DropGuard>,
    countdown: Option<Countdown>,
}

impl<B> TutorApp<B>
where
    B: TutorBackend + Clone + 'static,
{
    /// Creates a driver in chat mode and the channel its events arrive on.
    ///
    /// Commands and events must be applied from within a tokio runtime.
    #[must_use]
    pub fn new(backend: B, config: &Config) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let app = Self {
            backend,
            shell: ModeShell::new(config),
            events,
            view_id: 0,
            view_request: None,
            countdown: None,
        };
        (app, receiver)
    }

    /// The state to render.
    #[must_use]
    pub const fn shell(&self) -> &ModeShell {
        &self.shell
    }

    /// Returns `true` while a countdown is running.
    #[must_use]
    pub const fn has_countdown(&self) -> bool {
        self.countdown.is_some()
    }

    /// Applies a user command.
    pub fn execute(&mut self, command: Command) -> Vec<Notice> {
        debug!(?command, mode = %self.shell.mode(), "Executing command");
        let notices = match command {
            Command::SelectFile(path) => self.select_file(path),
            Command::Upload => self.upload(),
            Command::SwitchMode(mode) => self.switch_mode(mode),
            Command::Send(text) => self.send(&text),
            Command::ConfigureExam(settings) => {
                self.with_exam(|exam| exam.configure(settings).map(|()| vec![Notice::ViewChanged]))
            }
            Command::StartExam => self.start_exam(),
            Command::Answer { index, text } => {
                self.with_exam(|exam| exam.set_answer(index, text).map(|()| Vec::new()))
            }
            Command::SubmitExam => self.apply_exam_event(ExamEvent::Submit),
            Command::RestartExam => {
                self.with_exam(|exam| exam.restart().map(|()| vec![Notice::ViewChanged]))
            }
            Command::RefreshDeck => self.refresh_deck(),
            Command::Flip(index) => match self.shell.deck_mut() {
                Some(deck) => match deck.flip(index) {
                    Ok(_) => vec![Notice::ViewChanged],
                    Err(error) => vec![refusal(&error)],
                },
                None => vec![wrong_mode(Mode::Flashcard)],
            },
        };
        self.sync_countdown();
        notices
    }

    /// Applies the completion of a spawned call or a countdown tick.
    pub fn handle(&mut self, event: AppEvent) -> Vec<Notice> {
        let notices = match event {
            AppEvent::Uploaded(outcome) => self.finish_upload(outcome),
            AppEvent::ChatAnswered(outcome) => {
                let (chat, transcript) = self.shell.chat_mut();
                match chat.complete(transcript, outcome) {
                    Ok(()) => vec![Notice::ChatUpdated],
                    Err(error) => {
                        debug!(error = %error, "Chat answer dropped");
                        Vec::new()
                    }
                }
            }
            AppEvent::ExamLoaded { view_id, outcome } => {
                if self.is_stale(view_id) {
                    return Vec::new();
                }
                self.finish_exam(outcome)
            }
            AppEvent::DeckLoaded { view_id, outcome } => {
                if self.is_stale(view_id) {
                    return Vec::new();
                }
                self.finish_deck(outcome)
            }
            AppEvent::Tick(tick) => {
                if self.countdown.as_ref().map(Countdown::id) != Some(tick.countdown_id) {
                    debug!(countdown_id = tick.countdown_id, "Stale tick ignored");
                    return Vec::new();
                }
                self.apply_exam_event(ExamEvent::Tick)
            }
        };
        self.sync_countdown();
        notices
    }

    // ------------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------------

    fn select_file(&mut self, path: PathBuf) -> Vec<Notice> {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        self.shell.uploader_mut().select(path);
        vec![Notice::Status(format!("선택된 파일: {name}"))]
    }

    fn upload(&mut self) -> Vec<Notice> {
        let uploader = self.shell.uploader_mut();
        let path = match uploader.begin_upload() {
            Ok(path) => path,
            Err(error) => {
                let message = uploader
                    .message()
                    .map_or_else(|| error.user_message(), ToString::to_string);
                return vec![Notice::Status(message)];
            }
        };
        let status = self.upload_status();

        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = backend.upload_document(&path).await;
            if events.send(AppEvent::Uploaded(outcome)).is_err() {
                debug!("Upload finished after shutdown");
            }
        });

        status
    }

    fn finish_upload(&mut self, outcome: Result<UploadResponse>) -> Vec<Notice> {
        if let Err(error) = self.shell.uploader_mut().finish_upload(outcome) {
            debug!(error = %error, "Upload result dropped");
            return Vec::new();
        }
        self.upload_status()
    }

    fn upload_status(&self) -> Vec<Notice> {
        self.shell
            .uploader()
            .message()
            .map(|m| Notice::Status(m.to_string()))
            .into_iter()
            .collect()
    }

    // ------------------------------------------------------------------------
    // Modes and chat
    // ------------------------------------------------------------------------

    fn switch_mode(&mut self, mode: Mode) -> Vec<Notice> {
        if !self.shell.switch_mode(mode) {
            return Vec::new();
        }

        // The old view is gone; its pending call and countdown go with it.
        self.view_id += 1;
        self.view_request = None;
        self.countdown = None;

        let mut notices = vec![Notice::ViewChanged];
        if mode == Mode::Flashcard {
            notices.extend(self.refresh_deck());
        }
        notices
    }

    fn send(&mut self, text: &str) -> Vec<Notice> {
        if self.shell.mode() != Mode::Chat {
            return vec![wrong_mode(Mode::Chat)];
        }

        let (chat, transcript) = self.shell.chat_mut();
        let request = match chat.begin_send(transcript, text) {
            Ok(Some(request)) => request,
            Ok(None) => return Vec::new(),
            Err(error) => return vec![refusal(&error)],
        };

        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = backend.send_message(&request).await;
            if events.send(AppEvent::ChatAnswered(outcome)).is_err() {
                debug!("Chat answer arrived after shutdown");
            }
        });

        vec![Notice::ChatUpdated]
    }

    // ------------------------------------------------------------------------
    // Exam
    // ------------------------------------------------------------------------

    fn with_exam<F>(&mut self, f: F) -> Vec<Notice>
    where
        F: FnOnce(&mut ExamSession) -> Result<Vec<Notice>>,
    {
        match self.shell.exam_mut() {
            Some(exam) => f(exam).unwrap_or_else(|error| vec![refusal(&error)]),
            None => vec![wrong_mode(Mode::Exam)],
        }
    }

    fn start_exam(&mut self) -> Vec<Notice> {
        let request = match self.shell.exam_mut().map(ExamSession::start) {
            Some(Ok(request)) => request,
            Some(Err(error)) => return vec![refusal(&error)],
            None => return vec![wrong_mode(Mode::Exam)],
        };

        let backend = self.backend.clone();
        self.spawn_view_request(
            async move { backend.send_message(&request).await },
            |view_id, outcome| AppEvent::ExamLoaded { view_id, outcome },
        );
        vec![Notice::ViewChanged]
    }

    fn finish_exam(&mut self, outcome: Result<String>) -> Vec<Notice> {
        self.view_request = None;
        let Some(exam) = self.shell.exam_mut() else {
            return Vec::new();
        };

        match exam.finish_loading(outcome) {
            Ok(_) => vec![
                Notice::ViewChanged,
                Notice::Countdown {
                    remaining_secs: exam.remaining_secs(),
                },
            ],
            Err(error @ TutorError::InvalidStateTransition { .. }) => {
                debug!(error = %error, "Exam batch dropped");
                Vec::new()
            }
            Err(error) => vec![
                Notice::Alert(alert_for(&error).to_string()),
                Notice::ViewChanged,
            ],
        }
    }

    fn apply_exam_event(&mut self, event: ExamEvent) -> Vec<Notice> {
        let Some(exam) = self.shell.exam_mut() else {
            return vec![wrong_mode(Mode::Exam)];
        };

        match exam.handle(event) {
            ExamOutcome::Ticked { remaining } => vec![Notice::Countdown {
                remaining_secs: remaining,
            }],
            ExamOutcome::Submitted(reason) => {
                info!(?reason, "Exam finished");
                vec![Notice::ViewChanged]
            }
            ExamOutcome::Ignored => Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Flashcards
    // ------------------------------------------------------------------------

    fn refresh_deck(&mut self) -> Vec<Notice> {
        let request = match self.shell.deck_mut().map(FlashcardDeck::begin_fetch) {
            Some(Ok(request)) => request,
            Some(Err(error)) => return vec![refusal(&error)],
            None => return vec![wrong_mode(Mode::Flashcard)],
        };

        let backend = self.backend.clone();
        self.spawn_view_request(
            async move { backend.send_message(&request).await },
            |view_id, outcome| AppEvent::DeckLoaded { view_id, outcome },
        );
        vec![Notice::ViewChanged]
    }

    fn finish_deck(&mut self, outcome: Result<String>) -> Vec<Notice> {
        self.view_request = None;
        let Some(deck) = self.shell.deck_mut() else {
            return Vec::new();
        };

        match deck.finish_fetch(outcome) {
            Ok(_) => vec![Notice::ViewChanged],
            Err(error @ TutorError::InvalidStateTransition { .. }) => {
                debug!(error = %error, "Flashcard batch dropped");
                Vec::new()
            }
            Err(_) => {
                let mut notices: Vec<Notice> = deck
                    .banner()
                    .map(|b| Notice::Status(b.to_string()))
                    .into_iter()
                    .collect();
                notices.push(Notice::ViewChanged);
                notices
            }
        }
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    /// Spawns a call owned by the active view. Replacing or dropping the
    /// stored guard cancels it.
    fn spawn_view_request<F>(&mut self, call: F, wrap: fn(u64, Result<String>) -> AppEvent)
    where
        F: Future<Output = Result<String>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();
        let view_id = self.view_id;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => {
                    debug!(view_id, "View request cancelled");
                }
                outcome = call => {
                    if events.send(wrap(view_id, outcome)).is_err() {
                        debug!(view_id, "View request finished after shutdown");
                    }
                }
            }
        });

        self.view_request = Some(token.drop_guard());
    }

    fn is_stale(&self, view_id: u64) -> bool {
        let stale = view_id != self.view_id;
        if stale {
            debug!(view_id, current = self.view_id, "Response for dismissed view ignored");
        }
        stale
    }

    /// Runs the countdown exactly while the exam is taking.
    fn sync_countdown(&mut self) {
        let needed = self
            .shell
            .exam()
            .is_some_and(ExamSession::needs_countdown);

        match (needed, self.countdown.is_some()) {
            (true, false) => {
                self.countdown = Some(Countdown::start(TICK_PERIOD, self.events.clone()));
            }
            (false, true) => self.countdown = None,
            _ => {}
        }
    }
}

/// Shown when a command is refused because a request is still pending.
pub const BUSY: &str = "이미 요청을 처리 중입니다.";

/// Shown when a command does not apply to the current step.
pub const NOT_NOW: &str = "지금은 사용할 수 없는 명령입니다.";

/// Shown when a question or card number does not exist.
pub const NO_SUCH_ITEM: &str = "해당 번호의 항목이 없습니다.";

/// Status line for a command the current state refuses.
fn refusal(error: &TutorError) -> Notice {
    debug!(error = %error, "Command refused");
    let message = match error {
        TutorError::InvalidStateTransition { from, .. }
            if matches!(from.as_str(), "loading" | "awaiting_response" | "uploading") =>
        {
            BUSY
        }
        TutorError::InvalidStateTransition { .. } => NOT_NOW,
        TutorError::IndexOutOfRange { .. } => NO_SUCH_ITEM,
        other => return Notice::Status(other.user_message()),
    };
    Notice::Status(message.to_string())
}

fn wrong_mode(expected: Mode) -> Notice {
    let name = match expected {
        Mode::Chat => "채팅",
        Mode::Exam => "시험",
        Mode::Flashcard => "암기 카드",
    };
    Notice::Status(format!("{name} 모드에서만 사용할 수 있습니다."))
}
