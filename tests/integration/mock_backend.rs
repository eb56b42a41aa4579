//! In-process stand-in for the tutor backend.
//!
//! Serves the three routes the client uses on an ephemeral port and records
//! what it received.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Question that makes the chat route fail with a 500.
pub const FAILING_QUESTION: &str = "fail please";

/// Detail returned for [`FAILING_QUESTION`].
pub const FAILURE_DETAIL: &str = "Vector DB 연결 실패";

/// Detail returned when an uploaded file is empty.
pub const EMPTY_PDF_DETAIL: &str = "PDF에서 텍스트를 추출하지 못했거나 파일이 비어있습니다.";

/// How long exam generation takes.
pub const EXAM_DELAY: Duration = Duration::from_millis(200);

/// One received multipart upload.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

/// Everything the mock has seen.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub chats: Arc<Mutex<Vec<Value>>>,
    pub uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
}

impl Recorded {
    pub fn chats(&self) -> Vec<Value> {
        self.chats.lock().expect("chat log poisoned").clone()
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads.lock().expect("upload log poisoned").clone()
    }
}

/// Finds an available port for testing.
pub fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Spawns the mock backend and returns its base URL.
pub async fn spawn_mock_backend() -> (String, Recorded, tokio::task::JoinHandle<()>) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/", get(health))
        .route("/api/documents/upload", post(upload))
        .route("/api/chat/", post(chat))
        .with_state(recorded.clone());

    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{addr}"), recorded, handle)
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "AI Tutor Backend is running!" }))
}

async fn upload(
    State(recorded): State<Recorded>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let Ok(Some(field)) = multipart.next_field().await else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["body", "file"], "msg": "field required" }] })),
        );
    };

    let name = field.name().unwrap_or_default().to_string();
    let file_name = field.file_name().map(ToString::to_string);
    let content_type = field.content_type().map(ToString::to_string);
    let bytes = field.bytes().await.unwrap_or_default();

    recorded
        .uploads
        .lock()
        .expect("upload log poisoned")
        .push(ReceivedUpload {
            field: name,
            file_name: file_name.clone(),
            content_type,
            size: bytes.len(),
        });

    if bytes.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": EMPTY_PDF_DETAIL })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "filename": file_name.unwrap_or_default(),
            "message": "문서가 성공적으로 처리되었습니다.",
            "chunks_added": 4
        })),
    )
}

async fn chat(State(recorded): State<Recorded>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    recorded
        .chats
        .lock()
        .expect("chat log poisoned")
        .push(body.clone());

    let question = body["question"].as_str().unwrap_or_default().to_string();
    if question == FAILING_QUESTION {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": FAILURE_DETAIL })),
        );
    }

    let answer = match body["mode"].as_str() {
        Some("exam") => {
            tokio::time::sleep(EXAM_DELAY).await;
            let count: usize = question.parse().unwrap_or(3);
            let questions: Vec<Value> = (1..=count)
                .map(|i| json!({ "id": i, "question": format!("Q{i}"), "answer": format!("A{i}") }))
                .collect();
            Value::Array(questions).to_string()
        }
        Some("flashcard") => {
            let cards = json!([
                { "front": "RAG", "back": "검색 증강 생성" },
                { "front": "임베딩", "back": "텍스트의 벡터 표현" }
            ]);
            format!("```json\n{cards}\n```")
        }
        _ => {
            let turns = body["chat_history"].as_array().map_or(0, Vec::len);
            format!("답변({turns}): {question}")
        }
    };

    (StatusCode::OK, Json(json!({ "answer": answer })))
}
