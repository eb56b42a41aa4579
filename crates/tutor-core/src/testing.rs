//! Scripted backend shared by unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::api::{ChatRequest, TutorBackend, UploadResponse};
use crate::error::{Result, TutorError};

/// Backend that replays queued outcomes and records every request.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    outcomes: Arc<Mutex<VecDeque<Result<String>>>>,
    uploads: Arc<Mutex<VecDeque<Result<UploadResponse>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    uploaded: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful answer.
    pub fn answer(self, answer: impl Into<String>) -> Self {
        self.push(Ok(answer.into()));
        self
    }

    /// Queues a failure.
    pub fn fail(self, error: TutorError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queues the outcome of the next upload.
    pub fn upload(self, outcome: Result<UploadResponse>) -> Self {
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push_back(outcome);
        }
        self
    }

    fn push(&self, outcome: Result<String>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Paths uploaded so far.
    pub fn uploaded(&self) -> Vec<PathBuf> {
        self.uploaded.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

impl TutorBackend for ScriptedBackend {
    fn upload_document(&self, path: &Path) -> impl Future<Output = Result<UploadResponse>> + Send {
        if let Ok(mut uploaded) = self.uploaded.lock() {
            uploaded.push(path.to_path_buf());
        }
        let outcome = self
            .uploads
            .lock()
            .ok()
            .and_then(|mut u| u.pop_front())
            .unwrap_or_else(|| Err(TutorError::network("no scripted upload")));
        async move { outcome }
    }

    fn send_message(&self, request: &ChatRequest) -> impl Future<Output = Result<String>> + Send {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let outcome = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut o| o.pop_front())
            .unwrap_or_else(|| Err(TutorError::network("no scripted response")));
        async move { outcome }
    }
}
