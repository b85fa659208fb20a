//! Leaf entities and their state machines
//!
//! Leaves are the smallest independently savable units:
//! - [`TextBox`]: a free-text answer with a live draft and a committed value
//! - [`UploadSlot`]: a single-file slot whose upload/delete is atomic
//!
//! Completeness is always derived from the committed value, never the draft.

use crate::error::ModelError;
use crate::ids::{LeafId, PartId, TextBoxId, UploadSlotId};
use crate::status::SaveStatus;
use serde::{Deserialize, Serialize};

/// Operation state of a text box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextState {
    /// No save in flight; saved/unsaved is read off the texts
    #[default]
    Idle,
    /// A save request is outstanding
    Saving,
    /// The last save failed
    Error,
}

impl TextState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Error => "error",
        }
    }
}

/// Free-text answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
    /// Text box id
    pub id: TextBoxId,
    /// Owning part
    pub part: PartId,
    /// Exempt from the part's completeness
    pub optional: bool,
    /// Maximum UTF-8 byte length, if limited
    pub max_length: Option<usize>,
    /// Live draft as displayed
    pub current_text: String,
    /// Last value acknowledged by the backend
    pub saved_text: String,
    /// Save state; `Idle` may still hold an unsaved draft
    pub state: TextState,
    /// Message of the most recent failure, kept until the next attempt
    pub last_error: Option<String>,
}

impl TextBox {
    /// Create a text box seeded with committed text
    #[must_use]
    pub fn new(id: TextBoxId, part: PartId, saved_text: impl Into<String>) -> Self {
        let saved_text = saved_text.into();
        Self {
            id,
            part,
            optional: false,
            max_length: None,
            current_text: saved_text.clone(),
            saved_text,
            state: TextState::Idle,
            last_error: None,
        }
    }

    /// Leaf identifier
    #[inline]
    #[must_use]
    pub fn leaf_id(&self) -> LeafId {
        LeafId::TextBox(self.id)
    }

    /// Complete when the committed text is non-empty
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.saved_text.is_empty()
    }

    /// Check if the draft differs from the committed text
    #[inline]
    #[must_use]
    pub fn has_unsaved_draft(&self) -> bool {
        self.current_text != self.saved_text
    }

    /// Map onto the shared status vocabulary
    #[must_use]
    pub fn save_status(&self) -> SaveStatus {
        match self.state {
            TextState::Saving => SaveStatus::Saving,
            TextState::Error => SaveStatus::Error,
            TextState::Idle if self.has_unsaved_draft() => SaveStatus::Unsaved,
            TextState::Idle => SaveStatus::Saved,
        }
    }

    pub(crate) fn set_draft(&mut self, text: String) {
        self.current_text = text;
    }

    /// A new attempt supersedes whatever came before, including a failure
    pub(crate) fn begin_save(&mut self) {
        self.state = TextState::Saving;
        self.last_error = None;
    }

    pub(crate) fn finish_save(&mut self, sent: String) -> Result<(), ModelError> {
        self.expect_saving("save completed")?;
        self.saved_text = sent;
        self.state = TextState::Idle;
        Ok(())
    }

    pub(crate) fn fail_save(&mut self, message: String) -> Result<(), ModelError> {
        self.expect_saving("save failed")?;
        self.state = TextState::Error;
        self.last_error = Some(message);
        Ok(())
    }

    fn expect_saving(&self, event: &'static str) -> Result<(), ModelError> {
        if self.state == TextState::Saving {
            Ok(())
        } else {
            Err(ModelError::IllegalTransition {
                leaf: self.leaf_id(),
                from: self.state.name(),
                event,
            })
        }
    }
}

/// Operation state of an upload slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadState {
    /// No file
    #[default]
    Empty,
    /// Upload in flight
    Saving,
    /// File stored
    Saved,
    /// Upload failed; no file
    SaveError,
    /// Delete in flight; file still present
    Deleting,
    /// Delete failed; file assumed still present
    DeleteError,
}

impl UploadState {
    /// States reachable from `self`
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [UploadState] {
        match self {
            Self::Empty | Self::SaveError => &[Self::Saving],
            Self::Saving => &[Self::Saved, Self::SaveError],
            Self::Saved | Self::DeleteError => &[Self::Deleting],
            Self::Deleting => &[Self::Empty, Self::DeleteError],
        }
    }

    /// Check if `to` is reachable in one step
    #[inline]
    #[must_use]
    pub fn can_transition(self, to: UploadState) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Check if an upload or delete is in flight
    #[inline]
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Saving | Self::Deleting)
    }

    /// Check if the slot (is assumed to) hold a file
    #[inline]
    #[must_use]
    pub fn has_file(self) -> bool {
        matches!(self, Self::Saved | Self::Deleting | Self::DeleteError)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::SaveError => "save-error",
            Self::Deleting => "deleting",
            Self::DeleteError => "delete-error",
        }
    }
}

/// Metadata of a stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// Name shown to the user
    pub filename: String,
    /// Size in bytes
    pub size: u64,
}

impl FileMeta {
    /// Create file metadata
    #[inline]
    #[must_use]
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
        }
    }
}

/// Single-file upload slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    /// Slot id
    pub id: UploadSlotId,
    /// Owning part
    pub part: PartId,
    /// Exempt from the part's completeness
    pub optional: bool,
    /// Accepted extensions (`.pdf`) or MIME types (`image/*`); empty accepts anything
    pub allowed_types: Vec<String>,
    /// Stored file, if any
    pub file: Option<FileMeta>,
    /// Upload progress, 0..=100
    pub progress: u8,
    /// Operation state
    pub state: UploadState,
    /// Message from the last failed upload or delete
    pub last_error: Option<String>,
}

impl UploadSlot {
    /// Create a slot, seeded saved when a file already exists
    #[must_use]
    pub fn new(id: UploadSlotId, part: PartId, file: Option<FileMeta>) -> Self {
        let (state, progress) = if file.is_some() {
            (UploadState::Saved, 100)
        } else {
            (UploadState::Empty, 0)
        };
        Self {
            id,
            part,
            optional: false,
            allowed_types: Vec::new(),
            file,
            progress,
            state,
            last_error: None,
        }
    }

    /// Leaf identifier
    #[inline]
    #[must_use]
    pub fn leaf_id(&self) -> LeafId {
        LeafId::UploadSlot(self.id)
    }

    /// Complete when a file is present
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.has_file()
    }

    /// Map onto the shared status vocabulary
    ///
    /// Uploads are atomic, so a slot is never `Unsaved`.
    #[must_use]
    pub fn save_status(&self) -> SaveStatus {
        match self.state {
            UploadState::Saving | UploadState::Deleting => SaveStatus::Saving,
            UploadState::SaveError | UploadState::DeleteError => SaveStatus::Error,
            UploadState::Saved | UploadState::Empty => SaveStatus::Saved,
        }
    }

    pub(crate) fn begin_upload(&mut self) -> Result<(), ModelError> {
        self.transition(UploadState::Saving, "upload started")?;
        self.progress = 0;
        self.last_error = None;
        Ok(())
    }

    pub(crate) fn report_progress(&mut self, percent: u8) -> Result<(), ModelError> {
        if self.state != UploadState::Saving {
            return Err(self.illegal("upload progress"));
        }
        self.progress = percent.min(100);
        Ok(())
    }

    pub(crate) fn finish_upload(&mut self, file: FileMeta) -> Result<(), ModelError> {
        self.transition(UploadState::Saved, "upload completed")?;
        self.file = Some(file);
        self.progress = 100;
        Ok(())
    }

    pub(crate) fn fail_upload(&mut self, message: String) -> Result<(), ModelError> {
        self.transition(UploadState::SaveError, "upload failed")?;
        self.file = None;
        self.progress = 0;
        self.last_error = Some(message);
        Ok(())
    }

    pub(crate) fn begin_delete(&mut self) -> Result<(), ModelError> {
        self.transition(UploadState::Deleting, "delete started")?;
        self.last_error = None;
        Ok(())
    }

    pub(crate) fn finish_delete(&mut self) -> Result<(), ModelError> {
        self.transition(UploadState::Empty, "delete completed")?;
        self.file = None;
        self.progress = 0;
        Ok(())
    }

    /// The file is assumed to still exist
    pub(crate) fn fail_delete(&mut self, message: String) -> Result<(), ModelError> {
        self.transition(UploadState::DeleteError, "delete failed")?;
        self.last_error = Some(message);
        Ok(())
    }

    fn transition(&mut self, to: UploadState, event: &'static str) -> Result<(), ModelError> {
        if !self.state.can_transition(to) {
            return Err(self.illegal(event));
        }
        self.state = to;
        Ok(())
    }

    fn illegal(&self, event: &'static str) -> ModelError {
        ModelError::IllegalTransition {
            leaf: self.leaf_id(),
            from: self.state.name(),
            event,
        }
    }
}
