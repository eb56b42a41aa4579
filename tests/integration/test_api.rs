//! Integration tests for the backend client.
//!
//! Each test runs the client against an in-process mock of the tutor backend.

mod mock_backend;

use tempfile::TempDir;
use tutor_core::{ApiClient, ChatRequest, HistoryEntry, Mode, Role, TutorError};

use mock_backend::{
    find_available_port, spawn_mock_backend, EMPTY_PDF_DETAIL, FAILING_QUESTION, FAILURE_DETAIL,
};

fn write_pdf(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

#[tokio::test]
async fn test_health_check() {
    let (base_url, _recorded, handle) = spawn_mock_backend().await;
    let client = ApiClient::with_base_url(&base_url);

    let message = client.health_check().await.expect("Health check failed");
    assert_eq!(message, "AI Tutor Backend is running!");

    handle.abort();
}

#[tokio::test]
async fn test_upload_sends_multipart_file_field() {
    let (base_url, recorded, handle) = spawn_mock_backend().await;
    let client = ApiClient::with_base_url(&base_url);
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_pdf(&dir, "lecture-01.pdf", b"%PDF-1.4\n1 0 obj\n");

    let upload = client
        .upload_document(&path)
        .await
        .expect("Upload failed");

    assert_eq!(upload.filename, "lecture-01.pdf");
    assert_eq!(upload.message, "문서가 성공적으로 처리되었습니다.");
    assert_eq!(upload.chunks_added, Some(4));

    let uploads = recorded.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].field, "file");
    assert_eq!(uploads[0].file_name.as_deref(), Some("lecture-01.pdf"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("application/pdf"));
    assert_eq!(uploads[0].size, 17);

    handle.abort();
}

#[tokio::test]
async fn test_upload_rejection_carries_detail() {
    let (base_url, _recorded, handle) = spawn_mock_backend().await;
    let client = ApiClient::with_base_url(&base_url);
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_pdf(&dir, "empty.pdf", b"");

    let err = client
        .upload_document(&path)
        .await
        .expect_err("Empty upload should be rejected");

    match err {
        TutorError::UploadError { detail } => assert_eq!(detail, EMPTY_PDF_DETAIL),
        other => panic!("Expected UploadError, got {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn test_chat_request_body() {
    let (base_url, recorded, handle) = spawn_mock_backend().await;
    let client = ApiClient::with_base_url(&base_url);

    let history = vec![
        HistoryEntry {
            role: Role::User,
            content: "안녕".to_string(),
        },
        HistoryEntry {
            role: Role::Assistant,
            content: "안녕하세요".to_string(),
        },
    ];
    let answer = client
        .send_message(&ChatRequest::new("요약해줘", history, Mode::Chat))
        .await
        .expect("Chat failed");

    assert_eq!(answer, "답변(2): 요약해줘");

    let chats = recorded.chats();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["question"], "요약해줘");
    assert_eq!(chats[0]["mode"], "chat");
    assert_eq!(chats[0]["chat_history"][0]["role"], "user");
    assert_eq!(chats[0]["chat_history"][1]["content"], "안녕하세요");

    handle.abort();
}

#[tokio::test]
async fn test_chat_failure_maps_to_backend_error() {
    let (base_url, _recorded, handle) = spawn_mock_backend().await;
    let client = ApiClient::with_base_url(&base_url);

    let err = client
        .send_message(&ChatRequest::new(FAILING_QUESTION, Vec::new(), Mode::Chat))
        .await
        .expect_err("Chat should fail");

    assert!(matches!(err, TutorError::BackendError { status: 500, .. }));
    assert_eq!(err.detail(), Some(FAILURE_DETAIL));
    assert!(err.is_transient());

    handle.abort();
}

#[tokio::test]
async fn test_exam_answer_is_a_json_array_string() {
    let (base_url, _recorded, handle) = spawn_mock_backend().await;
    let client = ApiClient::with_base_url(&base_url);

    let answer = client
        .send_message(&ChatRequest::new("5", Vec::new(), Mode::Exam))
        .await
        .expect("Exam request failed");

    let questions: Vec<tutor_core::ExamQuestion> =
        tutor_core::parse_batch(&answer).expect("Batch should parse");
    assert_eq!(questions.len(), 5);
    assert_eq!(questions[4].question, "Q5");

    handle.abort();
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let port = find_available_port();
    let client = ApiClient::with_base_url(format!("http://127.0.0.1:{port}"));
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_pdf(&dir, "notes.pdf", b"%PDF-1.4\n");

    let err = client
        .upload_document(&path)
        .await
        .expect_err("Nothing is listening");
    assert!(matches!(err, TutorError::NetworkError { .. }));

    let err = client
        .send_message(&ChatRequest::new("hi", Vec::new(), Mode::Chat))
        .await
        .expect_err("Nothing is listening");
    assert!(matches!(err, TutorError::NetworkError { .. }));

    assert!(client.health_check().await.is_err());
}
