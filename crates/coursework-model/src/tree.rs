//! Assignment entity tree
//!
//! An arena of entities keyed by id:
//! - parts hold the ordered ids of their leaves (parent → children)
//! - leaves hold the id of their part (child → parent)
//!
//! The maps are persistent (`im`), so cloning a tree shares structure and a
//! leaf update only copies the path to that entry. Aggregates stored on parts
//! and on the tree are caches maintained by [`crate::aggregate`].

use crate::aggregate;
use crate::error::ModelError;
use crate::ids::{AssignmentId, LeafId, PartId, TextBoxId, UploadSlotId};
use crate::leaf::{TextBox, UploadSlot};
use crate::snapshot::AssignmentSnapshot;
use crate::status::{
    AssignmentSummary, FormState, LeaveDecision, PartSummary, SaveStatus,
};
use im::{HashMap, Vector};
use std::collections::HashSet;

/// A part and its cached aggregates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartNode {
    /// Part id
    pub id: PartId,
    /// Display title
    pub title: String,
    /// Exempt from the assignment's completeness
    pub optional: bool,
    /// Text box ids in display order
    pub text_boxes: Vector<TextBoxId>,
    /// Upload slot ids in display order
    pub upload_slots: Vector<UploadSlotId>,
    pub(crate) complete: bool,
    pub(crate) save_status: SaveStatus,
}

impl PartNode {
    /// Cached completeness
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Cached aggregate status
    #[inline]
    #[must_use]
    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    /// Leaves in display order, text boxes first
    pub fn leaves(&self) -> impl Iterator<Item = LeafId> + '_ {
        self.text_boxes
            .iter()
            .copied()
            .map(LeafId::TextBox)
            .chain(self.upload_slots.iter().copied().map(LeafId::UploadSlot))
    }
}

/// Immutable-by-convention snapshot of one assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentTree {
    pub(crate) id: AssignmentId,
    pub(crate) title: String,
    pub(crate) part_order: Vector<PartId>,
    pub(crate) parts: HashMap<PartId, PartNode>,
    pub(crate) text_boxes: HashMap<TextBoxId, TextBox>,
    pub(crate) upload_slots: HashMap<UploadSlotId, UploadSlot>,
    pub(crate) complete: bool,
    pub(crate) save_status: SaveStatus,
    pub(crate) form_state: FormState,
}

impl AssignmentTree {
    /// Build a tree from a backend snapshot
    ///
    /// Text boxes start with draft = committed text; slots start saved when a
    /// file exists, empty otherwise. Aggregates are computed before returning.
    ///
    /// # Errors
    /// - `ModelError::DuplicateId` if any id repeats
    pub fn from_snapshot(snapshot: AssignmentSnapshot) -> Result<Self, ModelError> {
        let mut seen = HashSet::new();
        let mut check = |id: String| {
            if seen.insert(id.clone()) {
                Ok(())
            } else {
                Err(ModelError::DuplicateId(id))
            }
        };

        let mut part_order = Vector::new();
        let mut parts = HashMap::new();
        let mut text_boxes = HashMap::new();
        let mut upload_slots = HashMap::new();

        for part in snapshot.parts {
            check(part.id.to_string())?;

            let mut tb_ids = Vector::new();
            for tb in part.text_boxes {
                check(tb.id.to_string())?;
                let mut text_box = TextBox::new(tb.id, part.id, tb.text);
                text_box.optional = tb.optional;
                text_box.max_length = tb.max_length;
                tb_ids.push_back(tb.id);
                text_boxes.insert(tb.id, text_box);
            }

            let mut slot_ids = Vector::new();
            for slot in part.upload_slots {
                check(slot.id.to_string())?;
                let mut upload = UploadSlot::new(slot.id, part.id, slot.file);
                upload.optional = slot.optional;
                upload.allowed_types = slot.allowed_types;
                slot_ids.push_back(slot.id);
                upload_slots.insert(slot.id, upload);
            }

            part_order.push_back(part.id);
            parts.insert(
                part.id,
                PartNode {
                    id: part.id,
                    title: part.title,
                    optional: part.optional,
                    text_boxes: tb_ids,
                    upload_slots: slot_ids,
                    complete: false,
                    save_status: SaveStatus::Saved,
                },
            );
        }

        let mut tree = Self {
            id: snapshot.id,
            title: snapshot.title,
            part_order,
            parts,
            text_boxes,
            upload_slots,
            complete: false,
            save_status: SaveStatus::Saved,
            form_state: FormState::Pristine,
        };
        aggregate::recompute(&mut tree)?;
        Ok(tree)
    }

    /// Assignment id
    #[inline]
    #[must_use]
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    /// Assignment title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Cached completeness
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Cached aggregate status
    #[inline]
    #[must_use]
    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    /// Pristine until the first edit
    #[inline]
    #[must_use]
    pub fn form_state(&self) -> FormState {
        self.form_state
    }

    /// Whether the user may leave without confirmation
    #[inline]
    #[must_use]
    pub fn leave_decision(&self) -> LeaveDecision {
        LeaveDecision::from_status(self.save_status)
    }

    /// Parts in display order
    pub fn parts(&self) -> impl Iterator<Item = &PartNode> + '_ {
        self.part_order.iter().filter_map(|id| self.parts.get(id))
    }

    /// Number of parts
    #[inline]
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.part_order.len()
    }

    /// Look up a part
    #[inline]
    #[must_use]
    pub fn part(&self, id: PartId) -> Option<&PartNode> {
        self.parts.get(&id)
    }

    /// Look up a text box
    #[inline]
    #[must_use]
    pub fn text_box(&self, id: TextBoxId) -> Option<&TextBox> {
        self.text_boxes.get(&id)
    }

    /// Look up an upload slot
    #[inline]
    #[must_use]
    pub fn upload_slot(&self, id: UploadSlotId) -> Option<&UploadSlot> {
        self.upload_slots.get(&id)
    }

    /// All text boxes, unordered
    pub fn text_boxes(&self) -> impl Iterator<Item = &TextBox> + '_ {
        self.text_boxes.values()
    }

    /// All upload slots, unordered
    pub fn upload_slots(&self) -> impl Iterator<Item = &UploadSlot> + '_ {
        self.upload_slots.values()
    }

    /// Part owning a leaf
    ///
    /// # Errors
    /// - `ModelError::UnknownTextBox` / `UnknownUploadSlot` if the leaf is absent
    pub fn part_of(&self, leaf: LeafId) -> Result<PartId, ModelError> {
        match leaf {
            LeafId::TextBox(id) => self
                .text_boxes
                .get(&id)
                .map(|tb| tb.part)
                .ok_or(ModelError::UnknownTextBox(id)),
            LeafId::UploadSlot(id) => self
                .upload_slots
                .get(&id)
                .map(|slot| slot.part)
                .ok_or(ModelError::UnknownUploadSlot(id)),
        }
    }

    /// Status of a single leaf
    ///
    /// # Errors
    /// - `ModelError::UnknownTextBox` / `UnknownUploadSlot` if the leaf is absent
    pub fn leaf_status(&self, leaf: LeafId) -> Result<SaveStatus, ModelError> {
        match leaf {
            LeafId::TextBox(id) => self
                .text_boxes
                .get(&id)
                .map(TextBox::save_status)
                .ok_or(ModelError::UnknownTextBox(id)),
            LeafId::UploadSlot(id) => self
                .upload_slots
                .get(&id)
                .map(UploadSlot::save_status)
                .ok_or(ModelError::UnknownUploadSlot(id)),
        }
    }

    /// Render-ready summary
    #[must_use]
    pub fn summary(&self) -> AssignmentSummary {
        AssignmentSummary {
            id: self.id,
            complete: self.complete,
            status: self.save_status,
            form_state: self.form_state,
            leave: self.leave_decision(),
            parts: self
                .parts()
                .map(|part| PartSummary {
                    id: part.id,
                    title: part.title.clone(),
                    optional: part.optional,
                    complete: part.complete,
                    status: part.save_status,
                })
                .collect(),
        }
    }

    pub(crate) fn text_box_mut(&mut self, id: TextBoxId) -> Result<&mut TextBox, ModelError> {
        self.text_boxes
            .get_mut(&id)
            .ok_or(ModelError::UnknownTextBox(id))
    }

    pub(crate) fn upload_slot_mut(
        &mut self,
        id: UploadSlotId,
    ) -> Result<&mut UploadSlot, ModelError> {
        self.upload_slots
            .get_mut(&id)
            .ok_or(ModelError::UnknownUploadSlot(id))
    }
}
