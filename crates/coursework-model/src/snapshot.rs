//! Backend snapshots used to seed the tree
//!
//! These mirror what the persistence service returns on load; field names are
//! camelCase on the wire.

use crate::ids::{AssignmentId, PartId, TextBoxId, UploadSlotId};
use crate::leaf::FileMeta;
use serde::{Deserialize, Serialize};

/// Assignment as loaded from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSnapshot {
    /// Assignment id
    pub id: AssignmentId,
    #[serde(default)]
    /// Display title
    pub title: String,
    /// Parts in display order
    pub parts: Vec<PartSnapshot>,
}

/// Part as loaded from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSnapshot {
    /// Part id
    pub id: PartId,
    #[serde(default)]
    /// Display title
    pub title: String,
    #[serde(default)]
    /// Exempt from the assignment's completeness
    pub optional: bool,
    #[serde(default)]
    /// Text boxes in display order
    pub text_boxes: Vec<TextBoxSnapshot>,
    #[serde(default)]
    /// Upload slots in display order
    pub upload_slots: Vec<UploadSlotSnapshot>,
}

/// Text box with its committed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBoxSnapshot {
    /// Text box id
    pub id: TextBoxId,
    #[serde(default)]
    /// Exempt from the part's completeness
    pub optional: bool,
    #[serde(default)]
    /// Byte limit, if any
    pub max_length: Option<usize>,
    #[serde(default)]
    /// Last saved text
    pub text: String,
}

/// Upload slot with its current file, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlotSnapshot {
    /// Slot id
    pub id: UploadSlotId,
    #[serde(default)]
    /// Exempt from the part's completeness
    pub optional: bool,
    #[serde(default)]
    /// Accepted extensions or MIME types; empty accepts all
    pub allowed_types: Vec<String>,
    #[serde(default)]
    /// Stored file, if any
    pub file: Option<FileMeta>,
}

impl AssignmentSnapshot {
    /// Create an empty snapshot
    #[must_use]
    pub fn new(id: AssignmentId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            parts: Vec::new(),
        }
    }

    /// Append a part
    #[must_use]
    pub fn with_part(mut self, part: PartSnapshot) -> Self {
        self.parts.push(part);
        self
    }
}

impl PartSnapshot {
    /// Create an empty, mandatory part
    #[must_use]
    pub fn new(id: PartId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            optional: false,
            text_boxes: Vec::new(),
            upload_slots: Vec::new(),
        }
    }

    /// Mark the part optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Append a text box
    #[must_use]
    pub fn with_text_box(mut self, text_box: TextBoxSnapshot) -> Self {
        self.text_boxes.push(text_box);
        self
    }

    /// Append an upload slot
    #[must_use]
    pub fn with_upload_slot(mut self, slot: UploadSlotSnapshot) -> Self {
        self.upload_slots.push(slot);
        self
    }
}

impl TextBoxSnapshot {
    /// Create a mandatory, unlimited text box
    #[must_use]
    pub fn new(id: TextBoxId, text: impl Into<String>) -> Self {
        Self {
            id,
            optional: false,
            max_length: None,
            text: text.into(),
        }
    }

    /// Mark optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Limit to `max` UTF-8 bytes
    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

impl UploadSlotSnapshot {
    /// Create a mandatory slot accepting any type
    #[must_use]
    pub fn new(id: UploadSlotId, file: Option<FileMeta>) -> Self {
        Self {
            id,
            optional: false,
            allowed_types: Vec::new(),
            file,
        }
    }

    /// Mark optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Restrict accepted types
    #[must_use]
    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }
}
