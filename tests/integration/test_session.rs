//! End-to-end tests of the application driver against the mock backend.
//!
//! These use real time: the driver's calls go over loopback HTTP.

mod mock_backend;

use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tutor_core::{
    ApiClient, AppEvent, CardFace, Command, Config, DeckStatus, ExamSettings, ExamStep, Mode,
    Notice, QuestionCount, SubmitReason, TimeLimit, TutorApp, UNANSWERED,
};

use mock_backend::{spawn_mock_backend, EXAM_DELAY};

async fn next_event(events: &mut UnboundedReceiver<AppEvent>) -> AppEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Event channel closed")
}

#[tokio::test]
async fn test_three_question_exam_scenario() {
    let (base_url, recorded, handle) = spawn_mock_backend().await;
    let (mut app, mut events) =
        TutorApp::new(ApiClient::with_base_url(&base_url), &Config::default());

    app.execute(Command::SwitchMode(Mode::Exam));
    app.execute(Command::ConfigureExam(ExamSettings {
        question_count: QuestionCount::Three,
        time_limit: TimeLimit::OneMinute,
    }));
    app.execute(Command::StartExam);
    assert_eq!(app.shell().exam().expect("exam view").step(), ExamStep::Loading);

    let event = next_event(&mut events).await;
    assert!(matches!(event, AppEvent::ExamLoaded { .. }));
    let notices = app.handle(event);
    assert!(notices.contains(&Notice::Countdown { remaining_secs: 60 }));

    let exam = app.shell().exam().expect("exam view");
    assert_eq!(exam.step(), ExamStep::Taking);
    assert_eq!(exam.questions().len(), 3);
    assert_eq!(exam.countdown_label(), "남은 시간: 1분 0초");
    assert!(app.has_countdown());

    app.execute(Command::Answer {
        index: 1,
        text: "A2".to_string(),
    });
    app.execute(Command::SubmitExam);
    assert!(!app.has_countdown());

    let exam = app.shell().exam().expect("exam view");
    assert_eq!(exam.step(), ExamStep::Result);
    assert_eq!(
        exam.submission().expect("submitted").reason,
        SubmitReason::Manual
    );

    let rows = exam.graded();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].question, "Q1");
    assert_eq!(rows[0].user_answer_or_placeholder(), UNANSWERED);
    assert_eq!(rows[0].reference, "A1");
    assert_eq!(rows[1].user_answer_or_placeholder(), "A2");
    assert_eq!(rows[2].user_answer_or_placeholder(), UNANSWERED);

    let chats = recorded.chats();
    assert_eq!(chats[0]["question"], "3");
    assert_eq!(chats[0]["mode"], "exam");
    assert_eq!(chats[0]["chat_history"], serde_json::json!([]));

    handle.abort();
}

#[tokio::test]
async fn test_exam_response_after_leaving_is_not_applied() {
    let (base_url, recorded, handle) = spawn_mock_backend().await;
    let (mut app, mut events) =
        TutorApp::new(ApiClient::with_base_url(&base_url), &Config::default());

    app.execute(Command::SwitchMode(Mode::Exam));
    app.execute(Command::StartExam);

    // Let the request reach the backend, then leave before it answers.
    tokio::time::sleep(EXAM_DELAY / 4).await;
    assert_eq!(recorded.chats().len(), 1);
    app.execute(Command::SwitchMode(Mode::Chat));
    app.execute(Command::SwitchMode(Mode::Exam));

    let late = timeout(EXAM_DELAY * 3, events.recv()).await;
    assert!(late.is_err(), "Cancelled request still reported back");
    assert_eq!(app.shell().exam().expect("exam view").step(), ExamStep::Setup);
    assert!(!app.has_countdown());

    handle.abort();
}

#[tokio::test]
async fn test_chat_answer_survives_switch_to_flashcards() {
    let (base_url, _recorded, handle) = spawn_mock_backend().await;
    let (mut app, mut events) =
        TutorApp::new(ApiClient::with_base_url(&base_url), &Config::default());

    app.execute(Command::Send("RAG가 뭐야?".to_string()));
    app.execute(Command::SwitchMode(Mode::Flashcard));

    for _ in 0..2 {
        let event = next_event(&mut events).await;
        app.handle(event);
    }

    let turns = app.shell().transcript().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].text, "답변(0): RAG가 뭐야?");

    let deck = app.shell().deck().expect("deck view");
    assert_eq!(deck.status(), &DeckStatus::Ready);
    assert_eq!(deck.len(), 2);

    app.execute(Command::Flip(0));
    let deck = app.shell().deck().expect("deck view");
    assert_eq!(deck.face(0), Some(CardFace::Back));
    assert_eq!(deck.face(1), Some(CardFace::Front));

    handle.abort();
}

#[tokio::test]
async fn test_chat_failure_becomes_error_turn() {
    let (base_url, _recorded, handle) = spawn_mock_backend().await;
    let (mut app, mut events) =
        TutorApp::new(ApiClient::with_base_url(&base_url), &Config::default());

    app.execute(Command::Send(mock_backend::FAILING_QUESTION.to_string()));
    let event = next_event(&mut events).await;
    app.handle(event);

    let turns = app.shell().transcript().turns();
    assert!(turns[1].is_error);
    assert_eq!(turns[1].text, "오류가 발생했습니다. Vector DB 연결 실패");

    handle.abort();
}

#[tokio::test]
async fn test_upload_through_driver() {
    let (base_url, recorded, handle) = spawn_mock_backend().await;
    let (mut app, mut events) =
        TutorApp::new(ApiClient::with_base_url(&base_url), &Config::default());
    let dir = TempDir::new().expect("Failed to create temp dir");

    let empty = dir.path().join("blank.pdf");
    std::fs::write(&empty, b"").expect("Failed to write fixture");
    app.execute(Command::SelectFile(empty));
    app.execute(Command::Upload);
    let event = next_event(&mut events).await;
    assert_eq!(
        app.handle(event),
        vec![Notice::Status(format!(
            "오류: {}",
            mock_backend::EMPTY_PDF_DETAIL
        ))]
    );

    let pdf = dir.path().join("ch3.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n").expect("Failed to write fixture");
    app.execute(Command::SelectFile(pdf));
    app.execute(Command::Upload);
    let event = next_event(&mut events).await;
    assert_eq!(
        app.handle(event),
        vec![Notice::Status(
            "성공: 문서가 성공적으로 처리되었습니다. (ch3.pdf)".to_string()
        )]
    );
    assert_eq!(recorded.uploads().len(), 2);

    handle.abort();
}
