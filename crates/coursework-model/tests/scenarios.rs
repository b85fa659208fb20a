//! Status scenarios driven purely through events

use coursework_model::prelude::*;
use coursework_model::{
    AssignmentId, PartSnapshot, TextBoxSnapshot, UploadSlotSnapshot, UploadState,
};

fn apply_all(tree: AssignmentTree, events: impl IntoIterator<Item = TreeEvent>) -> AssignmentTree {
    events
        .into_iter()
        .fold(tree, |tree, event| reduce(&tree, event).unwrap())
}

#[test]
fn mandatory_text_completes_assignment_once_saved() {
    let part = PartId::new();
    let text_box = TextBoxId::new();
    let slot = UploadSlotId::new();
    let tree = AssignmentTree::from_snapshot(
        AssignmentSnapshot::new(AssignmentId::new(), "Lab report").with_part(
            PartSnapshot::new(part, "Results")
                .with_text_box(TextBoxSnapshot::new(text_box, ""))
                .with_upload_slot(UploadSlotSnapshot::new(slot, None).optional()),
        ),
    )
    .unwrap();
    assert!(!tree.is_complete());

    let tree = apply_all(
        tree,
        [
            TreeEvent::DraftChanged { text_box, text: "hello".into() },
            TreeEvent::TextSaveStarted { text_box },
            TreeEvent::TextSaved { text_box, text: "hello".into() },
        ],
    );

    assert!(tree.is_complete());
    assert_eq!(tree.save_status(), SaveStatus::Saved);
    assert!(tree.leave_decision().is_allowed());
}

#[test]
fn saving_sibling_outranks_failed_sibling() {
    let part = PartId::new();
    let first = TextBoxId::new();
    let second = TextBoxId::new();
    let tree = AssignmentTree::from_snapshot(
        AssignmentSnapshot::new(AssignmentId::new(), "").with_part(
            PartSnapshot::new(part, "")
                .with_text_box(TextBoxSnapshot::new(first, ""))
                .with_text_box(TextBoxSnapshot::new(second, "")),
        ),
    )
    .unwrap();

    let tree = apply_all(
        tree,
        [
            TreeEvent::DraftChanged { text_box: first, text: "a".into() },
            TreeEvent::DraftChanged { text_box: second, text: "b".into() },
            TreeEvent::TextSaveStarted { text_box: first },
            TreeEvent::TextSaveStarted { text_box: second },
            TreeEvent::TextSaveFailed { text_box: first, message: "500".into() },
        ],
    );
    assert_eq!(tree.part(part).unwrap().save_status(), SaveStatus::Saving);
    assert_eq!(tree.save_status(), SaveStatus::Saving);

    let tree = apply_all(tree, [TreeEvent::TextSaved { text_box: second, text: "b".into() }]);
    assert_eq!(tree.part(part).unwrap().save_status(), SaveStatus::Error);
}

#[test]
fn failed_delete_keeps_filename() {
    let slot = UploadSlotId::new();
    let tree = AssignmentTree::from_snapshot(
        AssignmentSnapshot::new(AssignmentId::new(), "").with_part(
            PartSnapshot::new(PartId::new(), "").with_upload_slot(UploadSlotSnapshot::new(
                slot,
                Some(FileMeta::new("diagram.png", 2048)),
            )),
        ),
    )
    .unwrap();

    let tree = apply_all(
        tree,
        [
            TreeEvent::DeleteStarted { slot },
            TreeEvent::DeleteFailed { slot, message: "forbidden".into() },
        ],
    );

    let upload = tree.upload_slot(slot).unwrap();
    assert_eq!(upload.state, UploadState::DeleteError);
    assert_eq!(upload.file.as_ref().unwrap().filename, "diagram.png");
    assert!(tree.is_complete());
    assert_eq!(tree.save_status(), SaveStatus::Error);
}

#[test]
fn optional_part_does_not_block_assignment() {
    let required = PartId::new();
    let extra = PartId::new();
    let tree = AssignmentTree::from_snapshot(
        AssignmentSnapshot::new(AssignmentId::new(), "")
            .with_part(
                PartSnapshot::new(required, "")
                    .with_text_box(TextBoxSnapshot::new(TextBoxId::new(), "done")),
            )
            .with_part(
                PartSnapshot::new(extra, "")
                    .optional()
                    .with_text_box(TextBoxSnapshot::new(TextBoxId::new(), ""))
                    .with_text_box(TextBoxSnapshot::new(TextBoxId::new(), "").optional())
                    .with_upload_slot(UploadSlotSnapshot::new(UploadSlotId::new(), None)),
            ),
    )
    .unwrap();

    assert!(tree.part(required).unwrap().is_complete());
    assert!(!tree.part(extra).unwrap().is_complete());
    assert!(tree.is_complete());

    let summary = tree.summary();
    assert_eq!(summary.parts.len(), 2);
    assert!(!summary.parts[1].complete);
    assert!(summary.parts[1].optional);
}

#[test]
fn save_result_records_sent_text_even_if_user_kept_typing() {
    let text_box = TextBoxId::new();
    let tree = AssignmentTree::from_snapshot(
        AssignmentSnapshot::new(AssignmentId::new(), "").with_part(
            PartSnapshot::new(PartId::new(), "").with_text_box(TextBoxSnapshot::new(text_box, "")),
        ),
    )
    .unwrap();

    let tree = apply_all(
        tree,
        [
            TreeEvent::DraftChanged { text_box, text: "first".into() },
            TreeEvent::TextSaveStarted { text_box },
            TreeEvent::DraftChanged { text_box, text: "first and more".into() },
            TreeEvent::TextSaved { text_box, text: "first".into() },
        ],
    );

    let tb = tree.text_box(text_box).unwrap();
    assert_eq!(tb.saved_text, "first");
    assert_eq!(tb.current_text, "first and more");
    assert_eq!(tree.save_status(), SaveStatus::Unsaved);
}
