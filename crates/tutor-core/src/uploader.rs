//! Document selection and upload status.
//!
//! The uploader only tracks state; the driver performs the actual request
//! between [`FileUploader::begin_upload`] and [`FileUploader::finish_upload`].

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::api::UploadResponse;
use crate::error::{Result, TutorError};

/// Message shown when upload is triggered without a selection.
pub const NO_FILE_SELECTED: &str = "먼저 파일을 선택해주세요.";

/// Message shown while the upload request is in flight.
pub const UPLOADING: &str = "업로드 중입니다...";

/// Only documents with this extension are accepted.
const PDF_EXTENSION: &str = "pdf";

/// Progress of the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadStatus {
    /// Nothing happening.
    #[default]
    Idle,
    /// An upload request is in flight.
    Uploading,
    /// The last upload was accepted.
    Succeeded,
    /// The last upload attempt failed.
    Failed,
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Uploading => write!(f, "uploading"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Selected document and the status line under the upload button.
#[derive(Debug, Clone, Default)]
pub struct FileUploader {
    selected: Option<PathBuf>,
    in_flight: Option<PathBuf>,
    status: UploadStatus,
    message: Option<String>,
}

impl FileUploader {
    /// Creates an uploader with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected document.
    #[must_use]
    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> UploadStatus {
        self.status
    }

    /// Returns `true` while an upload is in flight.
    #[must_use]
    pub const fn is_uploading(&self) -> bool {
        matches!(self.status, UploadStatus::Uploading)
    }

    /// Status line to display, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Selects a document and clears the status line.
    ///
    /// A selection made while an upload is in flight is kept for the next
    /// upload; the in-flight status line stays until that upload finishes.
    pub fn select(&mut self, path: impl Into<PathBuf>) {
        self.selected = Some(path.into());
        if !self.is_uploading() {
            self.status = UploadStatus::Idle;
            self.message = None;
        }
    }

    /// Validates the selection and marks the upload as in flight.
    ///
    /// Returns the path to upload.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` while an upload is in
    /// flight and `TutorError::InvalidFile` if nothing is selected or the
    /// selection is not an existing PDF. The status line explains the
    /// rejection.
    pub fn begin_upload(&mut self) -> Result<PathBuf> {
        if self.is_uploading() {
            return Err(TutorError::invalid_transition(
                self.status,
                UploadStatus::Uploading,
            ));
        }

        let Some(path) = self.selected.clone() else {
            self.message = Some(NO_FILE_SELECTED.to_string());
            return Err(TutorError::invalid_file(PathBuf::new(), "no file selected"));
        };

        if let Err(error) = validate_pdf(&path) {
            self.status = UploadStatus::Failed;
            self.message = Some(failure_message(&error));
            return Err(error);
        }

        self.status = UploadStatus::Uploading;
        self.message = Some(UPLOADING.to_string());
        self.in_flight = Some(path.clone());
        Ok(path)
    }

    /// Applies the upload outcome to the status line.
    ///
    /// A successful upload clears the selection, unless another document was
    /// selected in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` if no upload is in flight.
    pub fn finish_upload(&mut self, outcome: Result<UploadResponse>) -> Result<()> {
        if !self.is_uploading() {
            return Err(TutorError::invalid_transition(
                self.status,
                UploadStatus::Succeeded,
            ));
        }

        self.in_flight = None;
        match outcome {
            Ok(upload) => {
                info!(filename = %upload.filename, "Document uploaded");
                self.message = Some(format!("성공: {} ({})", upload.message, upload.filename));
                self.status = UploadStatus::Succeeded;
                if self.selected == self.in_flight {
                    self.selected = None;
                }
            }
            Err(error) => {
                warn!(error = %error, "Document upload failed");
                self.message = Some(failure_message(&error));
                self.status = UploadStatus::Failed;
            }
        }
        Ok(())
    }
}

/// Backend rejections show the backend's detail; everything else is a
/// client-side or transport failure.
fn failure_message(error: &TutorError) -> String {
    match error {
        TutorError::UploadError { detail } => format!("오류: {detail}"),
        other => format!("업로드 오류: {}", other.user_message()),
    }
}

fn validate_pdf(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TutorError::invalid_file(path, "file does not exist")
        } else {
            TutorError::Io(e)
        }
    })?;

    if !metadata.is_file() {
        return Err(TutorError::invalid_file(path, "not a regular file"));
    }

    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION));
    if !is_pdf {
        return Err(TutorError::invalid_file(path, "only PDF files can be uploaded"));
    }

    Ok(())
}
