//! Aggregation property tests
//!
//! Random assignment shapes and random event sequences, checking that the
//! incremental refold agrees with a full refold and that precedence and
//! completeness rules hold at every step.

use coursework_model::aggregate::{fold_part, recompute};
use coursework_model::prelude::*;
use coursework_model::{PartSnapshot, TextBoxSnapshot, UploadSlotSnapshot};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct PartShape {
    optional: bool,
    texts: Vec<(bool, bool)>,
    slots: Vec<(bool, bool)>,
}

fn part_shape() -> impl Strategy<Value = PartShape> {
    (
        any::<bool>(),
        prop::collection::vec((any::<bool>(), any::<bool>()), 0..4),
        prop::collection::vec((any::<bool>(), any::<bool>()), 0..4),
    )
        .prop_map(|(optional, texts, slots)| PartShape {
            optional,
            texts,
            slots,
        })
}

struct Built {
    tree: AssignmentTree,
    texts: Vec<TextBoxId>,
    slots: Vec<UploadSlotId>,
}

fn build(shapes: &[PartShape]) -> Built {
    let mut snapshot = AssignmentSnapshot::new(coursework_model::AssignmentId::new(), "generated");
    let mut texts = Vec::new();
    let mut slots = Vec::new();

    for shape in shapes {
        let mut part = PartSnapshot::new(PartId::new(), "part");
        part.optional = shape.optional;
        for (optional, filled) in &shape.texts {
            let id = TextBoxId::new();
            let mut tb = TextBoxSnapshot::new(id, if *filled { "answer" } else { "" });
            tb.optional = *optional;
            part = part.with_text_box(tb);
            texts.push(id);
        }
        for (optional, has_file) in &shape.slots {
            let id = UploadSlotId::new();
            let file = has_file.then(|| FileMeta::new("seed.pdf", 4));
            let mut slot = UploadSlotSnapshot::new(id, file);
            slot.optional = *optional;
            part = part.with_upload_slot(slot);
            slots.push(id);
        }
        snapshot = snapshot.with_part(part);
    }

    Built {
        tree: AssignmentTree::from_snapshot(snapshot).unwrap(),
        texts,
        slots,
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Draft(usize, u8),
    SaveStart(usize),
    SaveOk(usize),
    SaveErr(usize),
    UploadStart(usize),
    Progress(usize, u8),
    UploadOk(usize),
    UploadErr(usize),
    DeleteStart(usize),
    DeleteOk(usize),
    DeleteErr(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), 0u8..4).prop_map(|(i, v)| Op::Draft(i, v)),
        any::<usize>().prop_map(Op::SaveStart),
        any::<usize>().prop_map(Op::SaveOk),
        any::<usize>().prop_map(Op::SaveErr),
        any::<usize>().prop_map(Op::UploadStart),
        (any::<usize>(), 0u8..=120).prop_map(|(i, p)| Op::Progress(i, p)),
        any::<usize>().prop_map(Op::UploadOk),
        any::<usize>().prop_map(Op::UploadErr),
        any::<usize>().prop_map(Op::DeleteStart),
        any::<usize>().prop_map(Op::DeleteOk),
        any::<usize>().prop_map(Op::DeleteErr),
    ]
}

fn to_event(built: &Built, tree: &AssignmentTree, op: Op) -> Option<TreeEvent> {
    let text = |i: usize| built.texts.get(i % built.texts.len().max(1)).copied();
    let slot = |i: usize| built.slots.get(i % built.slots.len().max(1)).copied();
    let drafts = ["", "a", "ab", "abc"];

    Some(match op {
        Op::Draft(i, v) => TreeEvent::DraftChanged {
            text_box: text(i)?,
            text: drafts[usize::from(v)].to_string(),
        },
        Op::SaveStart(i) => TreeEvent::TextSaveStarted { text_box: text(i)? },
        Op::SaveOk(i) => {
            let text_box = text(i)?;
            let sent = tree.text_box(text_box)?.current_text.clone();
            TreeEvent::TextSaved { text_box, text: sent }
        }
        Op::SaveErr(i) => TreeEvent::TextSaveFailed {
            text_box: text(i)?,
            message: "failed".to_string(),
        },
        Op::UploadStart(i) => TreeEvent::UploadStarted { slot: slot(i)? },
        Op::Progress(i, percent) => TreeEvent::UploadProgress {
            slot: slot(i)?,
            percent,
        },
        Op::UploadOk(i) => TreeEvent::UploadCompleted {
            slot: slot(i)?,
            file: FileMeta::new("up.pdf", 8),
        },
        Op::UploadErr(i) => TreeEvent::UploadFailed {
            slot: slot(i)?,
            message: "failed".to_string(),
        },
        Op::DeleteStart(i) => TreeEvent::DeleteStarted { slot: slot(i)? },
        Op::DeleteOk(i) => TreeEvent::DeleteCompleted { slot: slot(i)? },
        Op::DeleteErr(i) => TreeEvent::DeleteFailed {
            slot: slot(i)?,
            message: "failed".to_string(),
        },
    })
}

fn check_invariants(tree: &AssignmentTree) {
    // incremental refold == full refold
    let mut full = tree.clone();
    recompute(&mut full).unwrap();
    assert_eq!(&full, tree);

    for part in tree.parts() {
        let leaf_statuses: Vec<SaveStatus> = part
            .leaves()
            .map(|leaf| tree.leaf_status(leaf).unwrap())
            .collect();

        if leaf_statuses.contains(&SaveStatus::Saving) {
            assert_eq!(part.save_status(), SaveStatus::Saving);
        }
        assert_eq!(part.save_status(), SaveStatus::fold(leaf_statuses));
        assert_eq!(fold_part(tree, part.id).unwrap().0, part.save_status());

        let complete = part.text_boxes.iter().all(|id| {
            let tb = tree.text_box(*id).unwrap();
            tb.optional || !tb.saved_text.is_empty()
        }) && part.upload_slots.iter().all(|id| {
            let slot = tree.upload_slot(*id).unwrap();
            slot.optional || slot.state.has_file()
        });
        assert_eq!(part.is_complete(), complete);
    }

    if tree.parts().any(|p| p.save_status() == SaveStatus::Saving) {
        assert_eq!(tree.save_status(), SaveStatus::Saving);
    }
    assert_eq!(
        tree.is_complete(),
        tree.parts().all(|p| p.optional || p.is_complete())
    );
}

proptest! {
    #[test]
    fn prop_aggregates_stay_consistent(
        shapes in prop::collection::vec(part_shape(), 1..4),
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let built = build(&shapes);
        let mut tree = built.tree.clone();
        check_invariants(&tree);

        for op in ops {
            let Some(event) = to_event(&built, &tree, op) else { continue };
            if let Ok(next) = reduce(&tree, event) {
                tree = next;
            }
            check_invariants(&tree);
        }
    }

    #[test]
    fn prop_drafts_never_change_completeness(
        shapes in prop::collection::vec(part_shape(), 1..4),
        drafts in prop::collection::vec((any::<usize>(), "[a-z]{0,6}"), 1..20),
    ) {
        let built = build(&shapes);
        prop_assume!(!built.texts.is_empty());

        let mut tree = built.tree.clone();
        let complete = tree.is_complete();
        let part_flags: Vec<bool> = tree.parts().map(|p| p.is_complete()).collect();

        for (i, text) in drafts {
            let text_box = built.texts[i % built.texts.len()];
            tree = reduce(&tree, TreeEvent::DraftChanged { text_box, text }).unwrap();
            prop_assert_eq!(tree.is_complete(), complete);
            let now: Vec<bool> = tree.parts().map(|p| p.is_complete()).collect();
            prop_assert_eq!(&now, &part_flags);
        }
    }
}
