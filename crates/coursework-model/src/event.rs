//! Events applied to the tree by the dispatcher
//!
//! Local edits and channel completions are both expressed as [`TreeEvent`]s;
//! nothing else mutates a tree.

use crate::ids::{LeafId, TextBoxId, UploadSlotId};
use crate::leaf::FileMeta;
use serde::{Deserialize, Serialize};

/// A state-changing event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeEvent {
    /// User typed; applied immediately, never debounced
    DraftChanged {
        /// Target text box
        text_box: TextBoxId,
        /// Draft as typed
        text: String,
    },
    /// Debounce fired (or retry) and a save request was sent
    TextSaveStarted {
        /// Target text box
        text_box: TextBoxId,
    },
    /// Backend acknowledged `text`, the value that was sent
    TextSaved {
        /// Target text box
        text_box: TextBoxId,
        /// Text that was sent
        text: String,
    },
    /// Backend rejected the save
    TextSaveFailed {
        /// Target text box
        text_box: TextBoxId,
        /// Failure text for the user
        message: String,
    },
    /// Upload request sent
    UploadStarted {
        /// Target upload slot
        slot: UploadSlotId,
    },
    /// Intermediate upload progress
    UploadProgress {
        /// Target upload slot
        slot: UploadSlotId,
        /// Progress, 0..=100
        percent: u8,
    },
    /// Upload stored
    UploadCompleted {
        /// Target upload slot
        slot: UploadSlotId,
        /// Stored file
        file: FileMeta,
    },
    /// Upload failed
    UploadFailed {
        /// Target upload slot
        slot: UploadSlotId,
        /// Failure text for the user
        message: String,
    },
    /// Delete request sent
    DeleteStarted {
        /// Target upload slot
        slot: UploadSlotId,
    },
    /// File removed
    DeleteCompleted {
        /// Target upload slot
        slot: UploadSlotId,
    },
    /// Delete failed; file assumed present
    DeleteFailed {
        /// Target upload slot
        slot: UploadSlotId,
        /// Failure text for the user
        message: String,
    },
    /// Caller acknowledged the current state (e.g. after navigating away and back)
    MarkPristine,
}

impl TreeEvent {
    /// Leaf the event targets, if any
    #[must_use]
    pub fn leaf(&self) -> Option<LeafId> {
        match self {
            Self::DraftChanged { text_box, .. }
            | Self::TextSaveStarted { text_box }
            | Self::TextSaved { text_box, .. }
            | Self::TextSaveFailed { text_box, .. } => Some(LeafId::TextBox(*text_box)),
            Self::UploadStarted { slot }
            | Self::UploadProgress { slot, .. }
            | Self::UploadCompleted { slot, .. }
            | Self::UploadFailed { slot, .. }
            | Self::DeleteStarted { slot }
            | Self::DeleteCompleted { slot }
            | Self::DeleteFailed { slot, .. } => Some(LeafId::UploadSlot(*slot)),
            Self::MarkPristine => None,
        }
    }

    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DraftChanged { .. } => "draft_changed",
            Self::TextSaveStarted { .. } => "text_save_started",
            Self::TextSaved { .. } => "text_saved",
            Self::TextSaveFailed { .. } => "text_save_failed",
            Self::UploadStarted { .. } => "upload_started",
            Self::UploadProgress { .. } => "upload_progress",
            Self::UploadCompleted { .. } => "upload_completed",
            Self::UploadFailed { .. } => "upload_failed",
            Self::DeleteStarted { .. } => "delete_started",
            Self::DeleteCompleted { .. } => "delete_completed",
            Self::DeleteFailed { .. } => "delete_failed",
            Self::MarkPristine => "mark_pristine",
        }
    }

    /// Check if the event comes from a user action (dirties the form)
    #[inline]
    #[must_use]
    pub fn is_user_edit(&self) -> bool {
        matches!(
            self,
            Self::DraftChanged { .. } | Self::UploadStarted { .. } | Self::DeleteStarted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_name_their_leaf() {
        let slot = UploadSlotId::new();
        let event = TreeEvent::UploadProgress { slot, percent: 5 };
        assert_eq!(event.leaf(), Some(LeafId::UploadSlot(slot)));
        assert_eq!(TreeEvent::MarkPristine.leaf(), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let text_box = TextBoxId::new();
        let json = serde_json::to_value(TreeEvent::TextSaveStarted { text_box }).unwrap();
        assert_eq!(json["type"], "textSaveStarted");
    }
}
