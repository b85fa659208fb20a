//! Save status vocabulary shared by leaves, parts and the assignment
//!
//! [`SaveStatus`] is totally ordered by precedence so that folding a subtree is
//! a plain maximum: `Saving` > `Error` > `Unsaved` > `Saved`.

use crate::ids::{AssignmentId, PartId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate save status
///
/// Variant order is the fold precedence; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveStatus {
    /// Everything acknowledged by the backend
    #[default]
    Saved,
    /// A draft differs from its committed value
    Unsaved,
    /// An operation failed and awaits user action
    Error,
    /// An operation is in flight
    Saving,
}

impl SaveStatus {
    /// Fold child statuses into a parent status
    ///
    /// An empty subtree is `Saved`.
    #[inline]
    #[must_use]
    pub fn fold<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = SaveStatus>,
    {
        statuses.into_iter().max().unwrap_or_default()
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Saved => "saved",
            Self::Unsaved => "unsaved",
            Self::Error => "error",
            Self::Saving => "saving",
        };
        f.write_str(label)
    }
}

/// Whether the user has touched the form since load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormState {
    /// No edits since load (or since the caller marked it pristine)
    #[default]
    Pristine,
    /// At least one edit, upload or delete was requested
    Dirty,
}

/// Why leaving the screen deserves a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaveWarning {
    /// Some field has a draft that never reached the backend
    Unsaved,
    /// Some field failed to save, upload or delete
    Failed,
}

/// Outcome of asking to leave the assignment screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaveDecision {
    /// Nothing outstanding
    Allow,
    /// Leaving loses work; ask the user to confirm
    Warn(LeaveWarning),
    /// An operation is still in flight
    Block,
}

impl LeaveDecision {
    /// Derive the decision from the assignment-level status
    #[must_use]
    pub fn from_status(status: SaveStatus) -> Self {
        match status {
            SaveStatus::Saving => Self::Block,
            SaveStatus::Error => Self::Warn(LeaveWarning::Failed),
            SaveStatus::Unsaved => Self::Warn(LeaveWarning::Unsaved),
            SaveStatus::Saved => Self::Allow,
        }
    }

    /// Check if navigation may proceed without confirmation
    #[inline]
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Render-ready view of one part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSummary {
    /// Part id
    pub id: PartId,
    /// Display title
    pub title: String,
    /// Exempt from the assignment's completeness
    pub optional: bool,
    /// Every mandatory leaf is complete
    pub complete: bool,
    /// Folded leaf status
    pub status: SaveStatus,
}

/// Render-ready view of the whole assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    /// Assignment id
    pub id: AssignmentId,
    /// Every mandatory part is complete
    pub complete: bool,
    /// Folded part status
    pub status: SaveStatus,
    /// Pristine or dirty
    pub form_state: FormState,
    /// Navigation guard decision
    pub leave: LeaveDecision,
    /// Per-part summaries in display order
    pub parts: Vec<PartSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use SaveStatus::{Error, Saved, Saving, Unsaved};

    #[test]
    fn precedence_order() {
        assert!(Saving > Error);
        assert!(Error > Unsaved);
        assert!(Unsaved > Saved);
    }

    #[test]
    fn fold_picks_highest_precedence() {
        assert_eq!(SaveStatus::fold([Saved, Unsaved, Error]), Error);
        assert_eq!(SaveStatus::fold([Error, Saving, Saved]), Saving);
        assert_eq!(SaveStatus::fold([Saved, Unsaved]), Unsaved);
    }

    #[test]
    fn empty_fold_is_saved() {
        assert_eq!(SaveStatus::fold(std::iter::empty()), Saved);
    }

    #[test]
    fn leave_decision_follows_status() {
        assert_eq!(LeaveDecision::from_status(Saving), LeaveDecision::Block);
        assert_eq!(
            LeaveDecision::from_status(Error),
            LeaveDecision::Warn(LeaveWarning::Failed)
        );
        assert_eq!(
            LeaveDecision::from_status(Unsaved),
            LeaveDecision::Warn(LeaveWarning::Unsaved)
        );
        assert!(LeaveDecision::from_status(Saved).is_allowed());
    }
}
