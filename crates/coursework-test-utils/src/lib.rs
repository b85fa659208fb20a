//! Testing utilities for the coursework workspace
//!
//! Shared test doubles, fixtures and waits.

#![allow(missing_docs)]

use async_trait::async_trait;
use coursework_model::{
    AssignmentId, AssignmentSnapshot, AssignmentTree, FileMeta, PartId, PartSnapshot, TextBoxId,
    TextBoxSnapshot, UploadSlotId, UploadSlotSnapshot,
};
use coursework_sync::{
    AssignmentRef, AssignmentService, ServiceError, UploadEvent, UploadFile, UploadStream,
};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

/// A call the fake received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch,
    SaveText { text_box: TextBoxId, text: String },
    Upload { slot: UploadSlotId, name: String },
    Delete { slot: UploadSlotId },
    Download { slot: UploadSlotId },
}

/// Scripted end of an upload stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Complete,
    Fail(ServiceError),
    /// Stream ends without `Completed`
    EndEarly,
}

#[derive(Default)]
struct Script {
    snapshot: Option<AssignmentSnapshot>,
    fetch_error: Option<ServiceError>,
    saves: VecDeque<Result<(), ServiceError>>,
    uploads: VecDeque<UploadOutcome>,
    deletes: VecDeque<Result<(), ServiceError>>,
    downloads: VecDeque<Result<(), ServiceError>>,
    save_gate: Option<Arc<Semaphore>>,
    latency: Duration,
    progress: Vec<u8>,
}

/// In-memory [`AssignmentService`] with scripted outcomes
///
/// Unscripted calls succeed. Every call is recorded before it resolves.
#[derive(Default)]
pub struct FakeService {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new(snapshot: AssignmentSnapshot) -> Arc<Self> {
        let fake = Self::default();
        fake.script.lock().snapshot = Some(snapshot);
        Arc::new(fake)
    }

    pub fn failing_fetch(error: ServiceError) -> Arc<Self> {
        let fake = Self::default();
        fake.script.lock().fetch_error = Some(error);
        Arc::new(fake)
    }

    /// Delay every save, upload step, delete and download
    pub fn set_latency(&self, latency: Duration) {
        self.script.lock().latency = latency;
    }

    /// Progress values reported before an upload finishes
    pub fn set_upload_progress(&self, progress: impl Into<Vec<u8>>) {
        self.script.lock().progress = progress.into();
    }

    pub fn push_save(&self, outcome: Result<(), ServiceError>) {
        self.script.lock().saves.push_back(outcome);
    }

    pub fn push_upload(&self, outcome: UploadOutcome) {
        self.script.lock().uploads.push_back(outcome);
    }

    pub fn push_delete(&self, outcome: Result<(), ServiceError>) {
        self.script.lock().deletes.push_back(outcome);
    }

    pub fn push_download(&self, outcome: Result<(), ServiceError>) {
        self.script.lock().downloads.push_back(outcome);
    }

    /// Hold every save until released
    pub fn gate_saves(&self) {
        self.script.lock().save_gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held saves through
    pub fn release_saves(&self, n: usize) {
        if let Some(gate) = &self.script.lock().save_gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Texts sent for one text box, oldest first
    pub fn saved_texts(&self, text_box: TextBoxId) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::SaveText { text_box: id, text } if *id == text_box => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn upload_count(&self, slot: UploadSlotId) -> usize {
        self.count(|call| matches!(call, Call::Upload { slot: s, .. } if *s == slot))
    }

    pub fn delete_count(&self, slot: UploadSlotId) -> usize {
        self.count(|call| matches!(call, Call::Delete { slot: s } if *s == slot))
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn latency(&self) -> Duration {
        self.script.lock().latency
    }
}

#[async_trait]
impl AssignmentService for FakeService {
    async fn fetch_assignment(
        &self,
        _target: &AssignmentRef,
    ) -> Result<AssignmentSnapshot, ServiceError> {
        self.record(Call::Fetch);
        let script = self.script.lock();
        if let Some(err) = &script.fetch_error {
            return Err(err.clone());
        }
        script
            .snapshot
            .clone()
            .ok_or_else(|| ServiceError::NotFound("no snapshot scripted".to_string()))
    }

    async fn save_text(
        &self,
        _target: &AssignmentRef,
        text_box: TextBoxId,
        text: String,
    ) -> Result<(), ServiceError> {
        self.record(Call::SaveText { text_box, text });
        let (gate, latency) = {
            let script = self.script.lock();
            (script.save_gate.clone(), script.latency)
        };
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        tokio::time::sleep(latency).await;
        self.script.lock().saves.pop_front().unwrap_or(Ok(()))
    }

    fn upload_file(
        &self,
        _target: &AssignmentRef,
        slot: UploadSlotId,
        file: UploadFile,
    ) -> UploadStream {
        self.record(Call::Upload {
            slot,
            name: file.name.clone(),
        });
        let (outcome, progress, latency) = {
            let mut script = self.script.lock();
            let outcome = script.uploads.pop_front().unwrap_or(UploadOutcome::Complete);
            (outcome, script.progress.clone(), script.latency)
        };

        let size = file.size();
        let mut items: Vec<Result<UploadEvent, ServiceError>> =
            progress.into_iter().map(|p| Ok(UploadEvent::Progress(p))).collect();
        match outcome {
            UploadOutcome::Complete => {
                items.push(Ok(UploadEvent::Completed(FileMeta::new(file.name, size))));
            }
            UploadOutcome::Fail(err) => items.push(Err(err)),
            UploadOutcome::EndEarly => {}
        }

        stream::iter(items)
            .then(move |item| async move {
                tokio::time::sleep(latency).await;
                item
            })
            .boxed()
    }

    async fn delete_file(
        &self,
        _target: &AssignmentRef,
        slot: UploadSlotId,
    ) -> Result<(), ServiceError> {
        self.record(Call::Delete { slot });
        tokio::time::sleep(self.latency()).await;
        self.script.lock().deletes.pop_front().unwrap_or(Ok(()))
    }

    async fn download_file(
        &self,
        _target: &AssignmentRef,
        slot: UploadSlotId,
    ) -> Result<(), ServiceError> {
        self.record(Call::Download { slot });
        tokio::time::sleep(self.latency()).await;
        self.script.lock().downloads.pop_front().unwrap_or(Ok(()))
    }
}

/// One part with a text box and an upload slot
#[derive(Debug, Clone)]
pub struct Fixture {
    pub snapshot: AssignmentSnapshot,
    pub part: PartId,
    pub text_box: TextBoxId,
    pub slot: UploadSlotId,
}

impl Fixture {
    /// Empty mandatory text box and optional empty slot
    pub fn essay() -> Self {
        Self::build(TextBoxSnapshot::new(TextBoxId::new(), ""), None, true)
    }

    /// Committed text and a mandatory slot holding `report.pdf`
    pub fn submitted() -> Self {
        Self::build(
            TextBoxSnapshot::new(TextBoxId::new(), "final answer"),
            Some(FileMeta::new("report.pdf", 4096)),
            false,
        )
    }

    /// Text box limited to `max` bytes; slot accepts PDFs only
    pub fn restricted(max: usize) -> Self {
        let mut fixture = Self::essay();
        let part = &mut fixture.snapshot.parts[0];
        part.text_boxes[0].max_length = Some(max);
        part.upload_slots[0].allowed_types = vec![".pdf".to_string()];
        fixture
    }

    fn build(text_box: TextBoxSnapshot, file: Option<FileMeta>, optional_slot: bool) -> Self {
        let part = PartId::new();
        let slot = UploadSlotId::new();
        let text_box_id = text_box.id;
        let mut upload = UploadSlotSnapshot::new(slot, file);
        if optional_slot {
            upload = upload.optional();
        }
        let snapshot = AssignmentSnapshot::new(AssignmentId::new(), "Essay").with_part(
            PartSnapshot::new(part, "Answer")
                .with_text_box(text_box)
                .with_upload_slot(upload),
        );
        Self {
            snapshot,
            part,
            text_box: text_box_id,
            slot,
        }
    }

    pub fn target(&self) -> AssignmentRef {
        AssignmentRef::new("course-1", self.snapshot.id).with_user("student-1")
    }
}

/// Wait until a published tree satisfies `predicate`
///
/// # Panics
/// If nothing matches within a minute of (possibly paused) time, or the
/// dispatcher stops.
pub async fn wait_for(
    state: &mut watch::Receiver<AssignmentTree>,
    predicate: impl FnMut(&AssignmentTree) -> bool,
) -> AssignmentTree {
    tokio::time::timeout(Duration::from_secs(60), state.wait_for(predicate))
        .await
        .expect("timed out waiting for tree")
        .expect("dispatcher stopped")
        .clone()
}
