//! Error types for the assignment model
//!
//! Two families:
//! - [`ValidationError`]: user input rejected at the edit boundary (expected, user-facing)
//! - [`ModelError`]: invariant violations (programming errors, never user-facing)

use crate::ids::{LeafId, PartId, TextBoxId, UploadSlotId};

/// Input rejected before it reaches any save channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Text exceeds the field's byte limit
    #[error("answer is too long ({actual} bytes, maximum is {max})")]
    TextTooLong {
        /// Field limit in bytes
        max: usize,
        /// Draft length in bytes
        actual: usize,
    },

    /// File exceeds the upload size cap
    #[error("file is too large ({actual} bytes, maximum is {max})")]
    FileTooLarge {
        /// Upload cap in bytes
        max: u64,
        /// File size in bytes
        actual: u64,
    },

    /// File type not accepted by the slot
    #[error("file type of '{name}' is not allowed (accepted: {})", allowed.join(", "))]
    FileTypeNotAllowed {
        /// Rejected file name
        name: String,
        /// Types the slot accepts
        allowed: Vec<String>,
    },

    /// Slot already holds a file; delete it first
    #[error("a file is already uploaded to slot {0}")]
    SlotOccupied(UploadSlotId),

    /// Slot holds no file to delete
    #[error("slot {0} has no file")]
    SlotEmpty(UploadSlotId),
}

/// Invariant violations inside the tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Part not in tree
    #[error("unknown part: {0}")]
    UnknownPart(PartId),

    /// Text box not in tree
    #[error("unknown text box: {0}")]
    UnknownTextBox(TextBoxId),

    /// Upload slot not in tree
    #[error("unknown upload slot: {0}")]
    UnknownUploadSlot(UploadSlotId),

    /// The same id appears twice in a snapshot
    #[error("duplicate id in snapshot: {0}")]
    DuplicateId(String),

    /// Leaf state machine refused the event
    #[error("illegal transition on {leaf}: {event} while {from}")]
    IllegalTransition {
        /// Leaf that refused
        leaf: LeafId,
        /// State it was in
        from: &'static str,
        /// Event it refused
        event: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        let err = ValidationError::FileTypeNotAllowed {
            name: "notes.exe".to_string(),
            allowed: vec![".pdf".to_string(), ".docx".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "file type of 'notes.exe' is not allowed (accepted: .pdf, .docx)"
        );
    }
}
