//! Timed exam state machine.
//!
//! The exam moves through four steps:
//! - `Setup` -> `Loading` (user starts the exam)
//! - `Loading` -> `Taking` (a question batch arrived)
//! - `Loading` -> `Setup` (generation failed; nothing is kept)
//! - `Taking` -> `Result` (manual submit or countdown expiry)
//! - `Result` -> `Setup` (new exam)
//!
//! Countdown ticks and manual submissions both enter through
//! [`ExamSession::handle`], so the move into `Result` happens once no matter
//! which trigger arrives first.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{ChatRequest, Mode};
use crate::batch::parse_batch;
use crate::error::{GenerationErrorKind, Result, TutorError};

/// Placeholder shown in the result view for a question left blank.
pub const UNANSWERED: &str = "(미입력)";

/// Alert raised when the backend answered with something other than an array.
pub const EXAM_FORMAT_ALERT: &str = "문제 생성 형식이 올바르지 않습니다. 다시 시도해주세요.";

/// Alert raised for every other generation failure.
pub const EXAM_FAILURE_ALERT: &str = "문제 생성 중 오류가 발생했습니다. (PDF 내용을 확인해주세요)";

/// Remaining seconds under which the countdown is shown as urgent.
const URGENT_BELOW_SECS: u32 = 10;

// ============================================================================
// Settings
// ============================================================================

/// Number of questions the exam asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum QuestionCount {
    /// Three questions.
    #[default]
    Three,
    /// Five questions.
    Five,
    /// Ten questions.
    Ten,
}

impl QuestionCount {
    /// Choices offered on the setup screen.
    pub const ALL: [Self; 3] = [Self::Three, Self::Five, Self::Ten];

    /// Number of questions.
    #[must_use]
    pub const fn get(self) -> u32 {
        match self {
            Self::Three => 3,
            Self::Five => 5,
            Self::Ten => 10,
        }
    }
}

impl TryFrom<u32> for QuestionCount {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.get() == value)
            .ok_or_else(|| format!("unsupported question count {value}: expected 3, 5 or 10"))
    }
}

impl From<QuestionCount> for u32 {
    fn from(count: QuestionCount) -> Self {
        count.get()
    }
}

impl std::fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}문제", self.get())
    }
}

/// Time allowed for the whole exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum TimeLimit {
    /// 60 seconds.
    #[default]
    OneMinute,
    /// 180 seconds.
    ThreeMinutes,
    /// 300 seconds.
    FiveMinutes,
    /// 600 seconds.
    TenMinutes,
}

impl TimeLimit {
    /// Choices offered on the setup screen.
    pub const ALL: [Self; 4] = [
        Self::OneMinute,
        Self::ThreeMinutes,
        Self::FiveMinutes,
        Self::TenMinutes,
    ];

    /// Limit in seconds.
    #[must_use]
    pub const fn secs(self) -> u32 {
        match self {
            Self::OneMinute => 60,
            Self::ThreeMinutes => 180,
            Self::FiveMinutes => 300,
            Self::TenMinutes => 600,
        }
    }
}

impl TryFrom<u32> for TimeLimit {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|l| l.secs() == value)
            .ok_or_else(|| {
                format!("unsupported time limit {value}s: expected 60, 180, 300 or 600")
            })
    }
}

impl From<TimeLimit> for u32 {
    fn from(limit: TimeLimit) -> Self {
        limit.secs()
    }
}

impl std::fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}분", self.secs() / 60)
    }
}

/// Choices made on the setup screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSettings {
    /// How many questions to request.
    pub question_count: QuestionCount,
    /// How long the exam may run.
    pub time_limit: TimeLimit,
}

// ============================================================================
// Questions and results
// ============================================================================

/// One generated question with its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    /// Question text.
    pub question: String,
    /// Reference answer produced by the backend.
    pub answer: String,
}

/// Why the exam ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// The user submitted.
    Manual,
    /// The countdown reached zero.
    TimeExpired,
}

/// Record of the move into `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// What triggered the submission.
    pub reason: SubmitReason,
    /// Seconds of the limit that were used.
    pub used_secs: u32,
    /// When the submission happened.
    pub at: DateTime<Utc>,
}

/// One row of the result view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer<'a> {
    /// One-based question number.
    pub number: usize,
    /// Question text.
    pub question: &'a str,
    /// What the user typed, if anything.
    pub user_answer: Option<&'a str>,
    /// Reference answer.
    pub reference: &'a str,
}

impl<'a> GradedAnswer<'a> {
    /// The user's answer, or [`UNANSWERED`] when blank.
    #[must_use]
    pub fn user_answer_or_placeholder(&self) -> &'a str {
        self.user_answer.unwrap_or(UNANSWERED)
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Current step of the exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStep {
    /// Choosing question count and time limit.
    #[default]
    Setup,
    /// Waiting for the question batch.
    Loading,
    /// Answering under the countdown.
    Taking,
    /// Comparing answers with the reference answers.
    Result,
}

impl std::fmt::Display for ExamStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Loading => write!(f, "loading"),
            Self::Taking => write!(f, "taking"),
            Self::Result => write!(f, "result"),
        }
    }
}

/// Inputs of the `Taking` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamEvent {
    /// One second of the countdown elapsed.
    Tick,
    /// The user pressed submit.
    Submit,
}

/// What [`ExamSession::handle`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamOutcome {
    /// The event does not apply to the current step.
    Ignored,
    /// The countdown moved; the exam is still running.
    Ticked {
        /// Seconds left.
        remaining: u32,
    },
    /// The exam moved into `Result`.
    Submitted(SubmitReason),
}

/// One exam attempt.
#[derive(Debug, Clone, Default)]
pub struct ExamSession {
    step: ExamStep,
    settings: ExamSettings,
    questions: Vec<ExamQuestion>,
    answers: BTreeMap<usize, String>,
    remaining_secs: u32,
    submission: Option<Submission>,
}

impl ExamSession {
    /// Creates an exam in `Setup` with the given preselection.
    #[must_use]
    pub fn new(settings: ExamSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> ExamStep {
        self.step
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> ExamSettings {
        self.settings
    }

    /// Questions of the running or finished exam.
    #[must_use]
    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    /// The answer typed for question `index`, if any.
    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    /// Seconds left on the countdown.
    #[must_use]
    pub const fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// How the exam ended, once it has.
    #[must_use]
    pub const fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    /// Returns `true` while the countdown should be running.
    #[must_use]
    pub const fn needs_countdown(&self) -> bool {
        matches!(self.step, ExamStep::Taking)
    }

    /// Returns `true` when the countdown is in its final seconds.
    #[must_use]
    pub const fn is_urgent(&self) -> bool {
        self.needs_countdown() && self.remaining_secs < URGENT_BELOW_SECS
    }

    /// Remaining time as shown above the questions.
    #[must_use]
    pub fn countdown_label(&self) -> String {
        format!(
            "남은 시간: {}분 {}초",
            self.remaining_secs / 60,
            self.remaining_secs % 60
        )
    }

    /// Changes the settings.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` outside `Setup`.
    pub fn configure(&mut self, settings: ExamSettings) -> Result<()> {
        if self.step != ExamStep::Setup {
            return Err(TutorError::invalid_transition(self.step, "setup (configure)"));
        }
        self.settings = settings;
        Ok(())
    }

    /// Moves `Setup` -> `Loading` and returns the generation request.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` outside `Setup`, which
    /// also guards against starting twice.
    pub fn start(&mut self) -> Result<ChatRequest> {
        if self.step != ExamStep::Setup {
            return Err(TutorError::invalid_transition(self.step, ExamStep::Loading));
        }

        self.step = ExamStep::Loading;
        info!(
            questions = self.settings.question_count.get(),
            time_limit = self.settings.time_limit.secs(),
            "Exam generation requested"
        );

        Ok(ChatRequest::new(
            self.settings.question_count.get().to_string(),
            Vec::new(),
            Mode::Exam,
        ))
    }

    /// Applies the generation outcome while `Loading`.
    ///
    /// On success the batch is stored, answers are cleared, the countdown is
    /// set to the time limit and the exam enters `Taking`; the question count
    /// is returned. On any failure the exam returns to `Setup` holding no
    /// questions and the failure is returned for the caller to alert with.
    ///
    /// # Errors
    ///
    /// Returns the generation or transport error, or
    /// `TutorError::InvalidStateTransition` if the exam is not `Loading`.
    pub fn finish_loading(&mut self, outcome: Result<String>) -> Result<usize> {
        if self.step != ExamStep::Loading {
            return Err(TutorError::invalid_transition(self.step, ExamStep::Taking));
        }

        let batch = outcome.and_then(|payload| parse_batch::<ExamQuestion>(&payload));
        let questions = match batch {
            Ok(questions) if questions.is_empty() => {
                Err(TutorError::malformed("batch contained no questions"))
            }
            other => other,
        };

        match questions {
            Ok(questions) => {
                let count = questions.len();
                self.questions = questions;
                self.answers.clear();
                self.submission = None;
                self.remaining_secs = self.settings.time_limit.secs();
                self.step = ExamStep::Taking;
                info!(
                    questions = count,
                    time_limit = self.remaining_secs,
                    "Exam started"
                );
                Ok(count)
            }
            Err(error) => {
                warn!(error = %error, "Exam generation failed");
                self.questions.clear();
                self.answers.clear();
                self.step = ExamStep::Setup;
                Err(error)
            }
        }
    }

    /// Records the answer for question `index`.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` outside `Taking` and
    /// `TutorError::IndexOutOfRange` for an index with no question.
    pub fn set_answer(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        if self.step != ExamStep::Taking {
            return Err(TutorError::invalid_transition(self.step, "taking (answer)"));
        }
        if index >= self.questions.len() {
            return Err(TutorError::IndexOutOfRange {
                index,
                count: self.questions.len(),
            });
        }

        self.answers.insert(index, text.into());
        Ok(())
    }

    /// Single transition function for countdown ticks and manual submits.
    pub fn handle(&mut self, event: ExamEvent) -> ExamOutcome {
        if self.step != ExamStep::Taking {
            debug!(step = %self.step, ?event, "Exam event ignored");
            return ExamOutcome::Ignored;
        }

        match event {
            ExamEvent::Tick => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.submit(SubmitReason::TimeExpired)
                } else {
                    debug!(remaining = self.remaining_secs, "Countdown tick");
                    ExamOutcome::Ticked {
                        remaining: self.remaining_secs,
                    }
                }
            }
            ExamEvent::Submit => self.submit(SubmitReason::Manual),
        }
    }

    fn submit(&mut self, reason: SubmitReason) -> ExamOutcome {
        let used_secs = self
            .settings
            .time_limit
            .secs()
            .saturating_sub(self.remaining_secs);
        self.step = ExamStep::Result;
        self.submission = Some(Submission {
            reason,
            used_secs,
            at: Utc::now(),
        });
        info!(
            ?reason,
            used_secs,
            answered = self.answered_count(),
            questions = self.questions.len(),
            "Exam submitted"
        );
        ExamOutcome::Submitted(reason)
    }

    /// Number of questions with a non-blank answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.trim().is_empty()).count()
    }

    /// Rows of the result view, in question order.
    #[must_use]
    pub fn graded(&self) -> Vec<GradedAnswer<'_>> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, q)| GradedAnswer {
                number: index + 1,
                question: &q.question,
                user_answer: self
                    .answer(index)
                    .filter(|a| !a.trim().is_empty()),
                reference: &q.answer,
            })
            .collect()
    }

    /// Moves `Result` -> `Setup`, discarding questions, answers and countdown.
    ///
    /// Settings are kept.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` outside `Result`.
    pub fn restart(&mut self) -> Result<()> {
        if self.step != ExamStep::Result {
            return Err(TutorError::invalid_transition(self.step, ExamStep::Setup));
        }

        *self = Self::new(self.settings);
        info!("Exam reset");
        Ok(())
    }
}

/// Alert text for a failed exam generation.
#[must_use]
pub fn alert_for(error: &TutorError) -> &'static str {
    if error.is_generation(&GenerationErrorKind::NotAnArray) {
        EXAM_FORMAT_ALERT
    } else {
        EXAM_FAILURE_ALERT
    }
}
