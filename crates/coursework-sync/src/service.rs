//! Persistence service boundary
//!
//! The transport that talks to the backend lives outside this crate; it is
//! injected as an [`AssignmentService`]. Every call is idempotent per leaf.

use coursework_model::validation::FileCandidate;
use coursework_model::{AssignmentId, AssignmentSnapshot, FileMeta, TextBoxId, UploadSlotId};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which assignment, for whom
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRef {
    /// Owning course
    pub course_id: String,
    /// Assignment within the course
    pub assignment_id: AssignmentId,
    /// Submitting user, when the backend needs it explicitly
    pub user_id: Option<String>,
}

impl AssignmentRef {
    /// Reference an assignment of a course
    #[inline]
    #[must_use]
    pub fn new(course_id: impl Into<String>, assignment_id: AssignmentId) -> Self {
        Self {
            course_id: course_id.into(),
            assignment_id,
            user_id: None,
        }
    }

    /// With submitting user
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

impl fmt::Display for AssignmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.course_id, self.assignment_id)
    }
}

/// Failures reported by the service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Session expired; the embedding application must re-authenticate
    #[error("authentication expired")]
    AuthExpired,

    /// Entity does not exist on the backend
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend refused the request
    #[error("rejected: {0}")]
    Rejected(String),

    /// Network or server failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl ServiceError {
    /// Check if the caller must halt and re-authenticate
    #[inline]
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Check if retrying the same request can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original filename
    pub name: String,
    /// MIME type, when the picker reports one
    pub content_type: Option<String>,
    /// File contents
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create an upload from raw bytes
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    /// With MIME type
    #[inline]
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Size in bytes
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// View for boundary validation
    #[must_use]
    pub fn candidate(&self) -> FileCandidate<'_> {
        FileCandidate {
            name: &self.name,
            content_type: self.content_type.as_deref(),
            size: self.size(),
        }
    }
}

/// Items of an upload stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Percent transferred
    Progress(u8),
    /// Stored; terminates the stream
    Completed(FileMeta),
}

/// Progress stream of one upload; an `Err` item or an early end is a failure
pub type UploadStream = BoxStream<'static, Result<UploadEvent, ServiceError>>;

/// Assignment persistence service
#[async_trait::async_trait]
pub trait AssignmentService: Send + Sync + 'static {
    /// Load the assignment with committed text and current files
    async fn fetch_assignment(
        &self,
        target: &AssignmentRef,
    ) -> Result<AssignmentSnapshot, ServiceError>;

    /// Persist one text answer (last write wins)
    async fn save_text(
        &self,
        target: &AssignmentRef,
        text_box: TextBoxId,
        text: String,
    ) -> Result<(), ServiceError>;

    /// Start an upload; the returned stream drives it
    fn upload_file(
        &self,
        target: &AssignmentRef,
        slot: UploadSlotId,
        file: UploadFile,
    ) -> UploadStream;

    /// Remove the file in a slot
    async fn delete_file(
        &self,
        target: &AssignmentRef,
        slot: UploadSlotId,
    ) -> Result<(), ServiceError>;

    /// Hand the slot's file to the user (side effect only)
    async fn download_file(
        &self,
        target: &AssignmentRef,
        slot: UploadSlotId,
    ) -> Result<(), ServiceError>;
}
