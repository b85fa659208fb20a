//! Coursework Model
//!
//! Pure, synchronous state for an assignment form whose fields save
//! independently:
//! - [`AssignmentTree`]: arena of parts, text boxes and upload slots
//! - [`TreeEvent`] + [`reduce`]: the only way to derive a new tree
//! - [`aggregate`]: bottom-up fold of save status and completeness
//! - [`validation`]: edit-boundary checks (byte limits, upload cap, file types)
//!
//! # Example
//!
//! ```rust,ignore
//! use coursework_model::prelude::*;
//!
//! let tree = AssignmentTree::from_snapshot(snapshot)?;
//! let tree = reduce(&tree, TreeEvent::DraftChanged { text_box, text: "hello".into() })?;
//! assert_eq!(tree.save_status(), SaveStatus::Unsaved);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod aggregate;
pub mod error;
pub mod event;
pub mod ids;
pub mod leaf;
pub mod reducer;
pub mod snapshot;
pub mod status;
pub mod tree;
pub mod validation;

// Re-exports
pub use error::{ModelError, ValidationError};
pub use event::TreeEvent;
pub use ids::{AssignmentId, LeafId, PartId, TextBoxId, UploadSlotId};
pub use leaf::{FileMeta, TextBox, TextState, UploadSlot, UploadState};
pub use reducer::{apply, reduce};
pub use snapshot::{AssignmentSnapshot, PartSnapshot, TextBoxSnapshot, UploadSlotSnapshot};
pub use status::{
    AssignmentSummary, FormState, LeaveDecision, LeaveWarning, PartSummary, SaveStatus,
};
pub use tree::{AssignmentTree, PartNode};
pub use validation::{FileCandidate, MAX_UPLOAD_BYTES};

/// Common imports
pub mod prelude {
    //! Common imports for working with the assignment model
    pub use crate::{
        reduce, AssignmentSnapshot, AssignmentTree, FileMeta, LeafId, PartId, SaveStatus,
        TextBoxId, TreeEvent, UploadSlotId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if illegal transitions panic instead of being reported
pub const fn strict_debug() -> bool {
    cfg!(feature = "strict-debug")
}
