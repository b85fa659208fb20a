//! Event application
//!
//! [`reduce`] is the only way to derive a new tree: clone (cheap, shared
//! structure), apply the event to the leaf, then refold via [`crate::aggregate`].
//! A failed event leaves the input tree untouched.

use crate::aggregate;
use crate::error::ModelError;
use crate::event::TreeEvent;
use crate::status::FormState;
use crate::tree::AssignmentTree;

/// Apply one event and return the next tree
///
/// # Errors
/// - `ModelError::Unknown*` if the event targets an entity not in the tree
/// - `ModelError::IllegalTransition` if the leaf state machine refuses it
pub fn reduce(tree: &AssignmentTree, event: TreeEvent) -> Result<AssignmentTree, ModelError> {
    let mut next = tree.clone();
    apply(&mut next, event)?;
    Ok(next)
}

/// Apply one event in place
///
/// On error `tree` may hold a partially applied leaf; use [`reduce`] when the
/// previous state must survive.
///
/// # Errors
/// See [`reduce`].
pub fn apply(tree: &mut AssignmentTree, event: TreeEvent) -> Result<(), ModelError> {
    if event.is_user_edit() {
        tree.form_state = FormState::Dirty;
    }
    let leaf = event.leaf();

    match event {
        TreeEvent::DraftChanged { text_box, text } => {
            tree.text_box_mut(text_box)?.set_draft(text);
        }
        TreeEvent::TextSaveStarted { text_box } => {
            tree.text_box_mut(text_box)?.begin_save();
        }
        TreeEvent::TextSaved { text_box, text } => {
            tree.text_box_mut(text_box)?.finish_save(text)?;
        }
        TreeEvent::TextSaveFailed { text_box, message } => {
            tree.text_box_mut(text_box)?.fail_save(message)?;
        }
        TreeEvent::UploadStarted { slot } => {
            tree.upload_slot_mut(slot)?.begin_upload()?;
        }
        TreeEvent::UploadProgress { slot, percent } => {
            tree.upload_slot_mut(slot)?.report_progress(percent)?;
        }
        TreeEvent::UploadCompleted { slot, file } => {
            tree.upload_slot_mut(slot)?.finish_upload(file)?;
        }
        TreeEvent::UploadFailed { slot, message } => {
            tree.upload_slot_mut(slot)?.fail_upload(message)?;
        }
        TreeEvent::DeleteStarted { slot } => {
            tree.upload_slot_mut(slot)?.begin_delete()?;
        }
        TreeEvent::DeleteCompleted { slot } => {
            tree.upload_slot_mut(slot)?.finish_delete()?;
        }
        TreeEvent::DeleteFailed { slot, message } => {
            tree.upload_slot_mut(slot)?.fail_delete(message)?;
        }
        TreeEvent::MarkPristine => {
            tree.form_state = FormState::Pristine;
        }
    }

    match leaf {
        Some(leaf) => aggregate::recompute_leaf(tree, leaf),
        None => aggregate::recompute(tree),
    }
}
