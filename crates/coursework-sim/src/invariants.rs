//! Invariant checks over published trees
//!
//! - [`check_tree`]: holds for every published tree
//! - [`check_at_rest`]: holds once no work is outstanding

use crate::service::SimService;
use coursework_model::{aggregate, AssignmentTree, SaveStatus, TextState};
use serde::Serialize;

/// Named invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvariantCheck {
    /// Cached statuses equal a full refold
    IncrementalMatchesFull,
    /// Progress within 0..=100 and file presence matches slot state
    SlotConsistent,
    /// Nothing is saving once the session is idle
    NoSavingAtRest,
    /// Saved text is what the backend last acknowledged
    SavedTextAcknowledged,
    /// Slot file is what the backend stores
    FileMatchesBackend,
}

/// A failed invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Which check failed
    pub check: InvariantCheck,
    /// What was observed
    pub details: String,
}

impl InvariantViolation {
    fn new(check: InvariantCheck, details: impl Into<String>) -> Self {
        Self {
            check,
            details: details.into(),
        }
    }
}

/// Check invariants that hold for any published tree
#[must_use]
pub fn check_tree(tree: &AssignmentTree) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let mut refolded = tree.clone();
    if let Err(err) = aggregate::recompute(&mut refolded) {
        violations.push(InvariantViolation::new(
            InvariantCheck::IncrementalMatchesFull,
            format!("full refold failed: {err}"),
        ));
    } else if refolded.summary() != tree.summary() {
        violations.push(InvariantViolation::new(
            InvariantCheck::IncrementalMatchesFull,
            format!(
                "cached {} / complete={} but refold gives {} / complete={}",
                tree.save_status(),
                tree.is_complete(),
                refolded.save_status(),
                refolded.is_complete()
            ),
        ));
    }

    for slot in tree.upload_slots() {
        if slot.progress > 100 {
            violations.push(InvariantViolation::new(
                InvariantCheck::SlotConsistent,
                format!("slot {} progress {}", slot.id, slot.progress),
            ));
        }
        if slot.state.has_file() != slot.file.is_some() {
            violations.push(InvariantViolation::new(
                InvariantCheck::SlotConsistent,
                format!("slot {} is {:?} with file {:?}", slot.id, slot.state, slot.file),
            ));
        }
    }

    violations
}

/// Check invariants that hold once every channel is idle
#[must_use]
pub fn check_at_rest(tree: &AssignmentTree, backend: &SimService) -> Vec<InvariantViolation> {
    let mut violations = check_tree(tree);

    if tree.save_status() == SaveStatus::Saving {
        violations.push(InvariantViolation::new(
            InvariantCheck::NoSavingAtRest,
            "assignment still saving",
        ));
    }

    for text_box in tree.text_boxes() {
        let stored = backend.stored_text(text_box.id).unwrap_or_default();
        if text_box.saved_text != stored {
            violations.push(InvariantViolation::new(
                InvariantCheck::SavedTextAcknowledged,
                format!(
                    "text box {} saved {:?} but backend holds {:?}",
                    text_box.id, text_box.saved_text, stored
                ),
            ));
        }
    }

    for slot in tree.upload_slots() {
        let stored = backend.stored_file(slot.id);
        if slot.file != stored {
            violations.push(InvariantViolation::new(
                InvariantCheck::FileMatchesBackend,
                format!(
                    "slot {} holds {:?} but backend holds {:?}",
                    slot.id, slot.file, stored
                ),
            ));
        }
    }

    violations
}

/// Check if no channel has outstanding work visible in the tree
#[must_use]
pub fn is_at_rest(tree: &AssignmentTree) -> bool {
    let texts_idle = tree.text_boxes().all(|text_box| match text_box.state {
        TextState::Saving => false,
        TextState::Error => true,
        TextState::Idle => !text_box.has_unsaved_draft(),
    });
    let slots_idle = tree.upload_slots().all(|slot| !slot.state.is_busy());
    texts_idle && slots_idle
}
