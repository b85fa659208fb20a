//! Status aggregation
//!
//! One fold, applied bottom-up after every event:
//! - leaf → part: status is the max of leaf statuses; complete when every leaf
//!   is optional or complete
//! - part → assignment: status is the max of part statuses; complete when every
//!   part is optional or complete
//!
//! [`recompute`] refolds the whole tree. [`recompute_leaf`] refolds only the
//! leaf's part and then the assignment; it must always agree with [`recompute`].

use crate::error::ModelError;
use crate::ids::{LeafId, PartId};
use crate::leaf::{TextBox, UploadSlot};
use crate::status::SaveStatus;
use crate::tree::{AssignmentTree, PartNode};

/// Refold every part and the assignment
///
/// # Errors
/// - `ModelError::UnknownPart` / `UnknownTextBox` / `UnknownUploadSlot` if
///   the part index names an entity the arena does not hold
pub fn recompute(tree: &mut AssignmentTree) -> Result<(), ModelError> {
    let ids: Vec<PartId> = tree.part_order.iter().copied().collect();
    for id in ids {
        refold_part(tree, id)?;
    }
    refold_assignment(tree);
    Ok(())
}

/// Refold after a change to one leaf
///
/// # Errors
/// - `ModelError::UnknownTextBox` / `UnknownUploadSlot` if the leaf is absent
/// - `ModelError::UnknownPart` if the leaf's part is absent
pub fn recompute_leaf(tree: &mut AssignmentTree, leaf: LeafId) -> Result<(), ModelError> {
    let part = tree.part_of(leaf)?;
    refold_part(tree, part)?;
    refold_assignment(tree);
    Ok(())
}

/// Fold a part's leaves into `(status, complete)` without writing anything
///
/// # Errors
/// - `ModelError::UnknownPart` if the part is absent
/// - `ModelError::UnknownTextBox` / `UnknownUploadSlot` if the index is broken
pub fn fold_part(tree: &AssignmentTree, part: PartId) -> Result<(SaveStatus, bool), ModelError> {
    let node = tree.part(part).ok_or(ModelError::UnknownPart(part))?;
    fold_leaves(tree, node)
}

fn fold_leaves(tree: &AssignmentTree, node: &PartNode) -> Result<(SaveStatus, bool), ModelError> {
    let mut status = SaveStatus::Saved;
    let mut complete = true;

    for id in &node.text_boxes {
        let tb: &TextBox = tree.text_box(*id).ok_or(ModelError::UnknownTextBox(*id))?;
        status = status.max(tb.save_status());
        complete &= tb.optional || tb.is_complete();
    }
    for id in &node.upload_slots {
        let slot: &UploadSlot = tree
            .upload_slot(*id)
            .ok_or(ModelError::UnknownUploadSlot(*id))?;
        status = status.max(slot.save_status());
        complete &= slot.optional || slot.is_complete();
    }

    Ok((status, complete))
}

fn refold_part(tree: &mut AssignmentTree, part: PartId) -> Result<(), ModelError> {
    let (status, complete) = fold_part(tree, part)?;
    let node = tree
        .parts
        .get_mut(&part)
        .ok_or(ModelError::UnknownPart(part))?;
    node.save_status = status;
    node.complete = complete;
    Ok(())
}

fn refold_assignment(tree: &mut AssignmentTree) {
    let status = SaveStatus::fold(tree.parts().map(PartNode::save_status));
    let complete = tree.parts().all(|p| p.optional || p.complete);
    tree.save_status = status;
    tree.complete = complete;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AssignmentId, TextBoxId, UploadSlotId};
    use crate::leaf::FileMeta;
    use crate::snapshot::{AssignmentSnapshot, PartSnapshot, TextBoxSnapshot, UploadSlotSnapshot};
    use crate::tree::AssignmentTree;

    struct Fixture {
        tree: AssignmentTree,
        part: PartId,
        text: TextBoxId,
        slot: UploadSlotId,
    }

    fn fixture(part_optional: bool, text: &str, file: Option<FileMeta>) -> Fixture {
        let part = PartId::new();
        let tb = TextBoxId::new();
        let slot = UploadSlotId::new();
        let mut part_snapshot = PartSnapshot::new(part, "A")
            .with_text_box(TextBoxSnapshot::new(tb, text))
            .with_upload_slot(UploadSlotSnapshot::new(slot, file));
        part_snapshot.optional = part_optional;
        let tree = AssignmentTree::from_snapshot(
            AssignmentSnapshot::new(AssignmentId::new(), "").with_part(part_snapshot),
        )
        .unwrap();
        Fixture {
            tree,
            part,
            text: tb,
            slot,
        }
    }

    #[test]
    fn incomplete_mandatory_leaf_blocks_part() {
        let f = fixture(false, "answer", None);
        let part = f.tree.part(f.part).unwrap();
        assert!(!part.is_complete());
        assert!(!f.tree.is_complete());
    }

    #[test]
    fn optional_part_exempt_for_assignment_only() {
        let f = fixture(true, "", None);
        assert!(!f.tree.part(f.part).unwrap().is_complete());
        assert!(f.tree.is_complete());
    }

    #[test]
    fn saving_dominates_error_in_part() {
        let mut f = fixture(false, "", None);
        f.tree.text_box_mut(f.text).unwrap().begin_save();
        f.tree.text_box_mut(f.text).unwrap().fail_save("x".into()).unwrap();
        f.tree.upload_slot_mut(f.slot).unwrap().begin_upload().unwrap();
        recompute(&mut f.tree).unwrap();

        assert_eq!(f.tree.part(f.part).unwrap().save_status(), SaveStatus::Saving);
        assert_eq!(f.tree.save_status(), SaveStatus::Saving);
    }

    #[test]
    fn incremental_matches_full() {
        let mut f = fixture(false, "", Some(FileMeta::new("a.pdf", 1)));
        f.tree.text_box_mut(f.text).unwrap().set_draft("typed".into());

        let mut full = f.tree.clone();
        recompute(&mut full).unwrap();
        recompute_leaf(&mut f.tree, LeafId::TextBox(f.text)).unwrap();

        assert_eq!(f.tree, full);
        assert_eq!(f.tree.save_status(), SaveStatus::Unsaved);
    }

    #[test]
    fn unknown_part_is_an_error() {
        let f = fixture(false, "", None);
        let missing = PartId::new();
        assert_eq!(
            fold_part(&f.tree, missing),
            Err(ModelError::UnknownPart(missing))
        );
    }

    #[test]
    fn broken_index_fails_full_refold() {
        let mut f = fixture(false, "", None);
        f.tree.text_boxes.remove(&f.text);

        assert_eq!(
            recompute(&mut f.tree),
            Err(ModelError::UnknownTextBox(f.text))
        );
    }
}
