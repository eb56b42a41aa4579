//! Plain-text rendering of the shell state.

use tutor_core::{
    CardFace, ChatTurn, DeckStatus, ExamSession, ExamStep, FlashcardDeck, Mode, ModeShell,
    ModeView, Sender, SubmitReason, Transcript,
};

const fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Chat => "💬 대화 모드",
        Mode::Exam => "📝 실전 시험",
        Mode::Flashcard => "🃏 암기 카드",
    }
}

/// Mode selector with the active mode bracketed.
pub fn mode_tabs(active: Mode) -> String {
    Mode::ALL
        .iter()
        .map(|&mode| {
            if mode == active {
                format!("[{}]", mode_label(mode))
            } else {
                mode_label(mode).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// The active view.
pub fn view(shell: &ModeShell) -> String {
    match shell.view() {
        ModeView::Chat => transcript(shell.transcript(), shell.chat().is_awaiting()),
        ModeView::Exam(exam) => exam_view(exam),
        ModeView::Flashcard(deck) => deck_view(deck),
    }
}

/// One chat bubble.
pub fn chat_turn(turn: &ChatTurn) -> String {
    match turn.sender {
        Sender::User => format!("나: {}", turn.text),
        Sender::Assistant if turn.is_error => format!("🤖 ⚠ {}", turn.text),
        Sender::Assistant => format!("🤖 {}", turn.text),
    }
}

/// The whole chat transcript.
pub fn transcript(transcript: &Transcript, awaiting: bool) -> String {
    let mut lines = vec!["🎓 대화 모드".to_string()];
    if transcript.is_empty() {
        lines.push("PDF 내용에 대해 질문하세요...".to_string());
    }
    lines.extend(transcript.turns().iter().map(chat_turn));
    if awaiting {
        lines.push(thinking().to_string());
    }
    lines.join("\n")
}

/// Indicator shown while a chat answer is pending.
pub const fn thinking() -> &'static str {
    "AI가 생각 중..."
}

/// Countdown line, flagged when time is nearly up.
pub fn countdown_line(exam: &ExamSession) -> String {
    if exam.is_urgent() {
        format!("⏰ {}", exam.countdown_label())
    } else {
        exam.countdown_label()
    }
}

/// The exam in its current step.
pub fn exam_view(exam: &ExamSession) -> String {
    let mut lines = Vec::new();

    match exam.step() {
        ExamStep::Setup => {
            let settings = exam.settings();
            lines.push("📝 모의고사".to_string());
            lines.push(format!("문제 개수: {}", settings.question_count));
            lines.push(format!("제한 시간: {}", settings.time_limit));
            lines.push("/start 로 시험을 시작합니다.".to_string());
        }
        ExamStep::Loading => {
            lines.push("AI가 PDF 내용을 분석하여 문제를 출제하고 있습니다...".to_string());
        }
        ExamStep::Taking => {
            lines.push(countdown_line(exam));
            for (index, question) in exam.questions().iter().enumerate() {
                lines.push(format!("Q{}. {}", index + 1, question.question));
                let answer = exam
                    .answer(index)
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or("(답안을 입력하세요)");
                lines.push(format!("    답안: {answer}"));
            }
        }
        ExamStep::Result => {
            let summary = exam.submission().map_or_else(String::new, |submission| {
                let reason = match submission.reason {
                    SubmitReason::Manual => "직접 제출",
                    SubmitReason::TimeExpired => "시간 종료",
                };
                format!(
                    " ({reason}, {}분 {}초 사용)",
                    submission.used_secs / 60,
                    submission.used_secs % 60
                )
            });
            lines.push(format!("채점 결과{summary}"));
            for row in exam.graded() {
                lines.push(format!("Q{}. {}", row.number, row.question));
                lines.push(format!("    내 답안: {}", row.user_answer_or_placeholder()));
                lines.push(format!("    AI 모범 답안: {}", row.reference));
            }
            lines.push("/new 로 새 시험을 시작합니다.".to_string());
        }
    }

    lines.join("\n")
}

/// The flashcard deck.
pub fn deck_view(deck: &FlashcardDeck) -> String {
    let mut lines = vec!["🃏 AI 암기 카드".to_string()];

    match deck.status() {
        DeckStatus::Empty => lines.push("/refresh 로 카드를 생성합니다.".to_string()),
        DeckStatus::Loading => lines.push(
            "AI가 핵심 내용을 요약하여 새로운 카드를 만들고 있습니다...".to_string(),
        ),
        DeckStatus::Failed(banner) => lines.push(banner.clone()),
        DeckStatus::Ready => {
            lines.extend(deck.visible().map(|(index, card, face)| match face {
                CardFace::Front => format!("[{}] 앞면: {}", index + 1, card.front),
                CardFace::Back => format!("[{}] 뒷면: {}", index + 1, card.back),
            }));
        }
    }

    lines.join("\n")
}
