//! In-memory backend with seeded failures and latency

use async_trait::async_trait;
use coursework_model::{AssignmentSnapshot, FileMeta, TextBoxId, UploadSlotId};
use coursework_sync::{
    AssignmentRef, AssignmentService, ServiceError, UploadEvent, UploadFile, UploadStream,
};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct Backend {
    rng: StdRng,
    failure_rate: f64,
    max_latency_ms: u64,
    texts: HashMap<TextBoxId, String>,
    files: HashMap<UploadSlotId, FileMeta>,
    injected_failures: u64,
}

impl Backend {
    fn roll(&mut self) -> (bool, Duration) {
        let fail = self.rng.random_bool(self.failure_rate);
        if fail {
            self.injected_failures += 1;
        }
        let latency = Duration::from_millis(self.rng.random_range(0..=self.max_latency_ms));
        (fail, latency)
    }
}

/// Backend that acknowledges, delays and fails pseudo-randomly
pub struct SimService {
    snapshot: AssignmentSnapshot,
    backend: Arc<Mutex<Backend>>,
}

impl SimService {
    /// Serve `snapshot`; `failure_rate` is clamped to `0.0..=1.0`
    #[must_use]
    pub fn new(
        snapshot: AssignmentSnapshot,
        seed: u64,
        failure_rate: f64,
        max_latency_ms: u64,
    ) -> Self {
        let mut texts = HashMap::new();
        let mut files = HashMap::new();
        for part in &snapshot.parts {
            for text_box in &part.text_boxes {
                texts.insert(text_box.id, text_box.text.clone());
            }
            for slot in &part.upload_slots {
                if let Some(file) = &slot.file {
                    files.insert(slot.id, file.clone());
                }
            }
        }
        let backend = Backend {
            rng: StdRng::seed_from_u64(seed),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            max_latency_ms,
            texts,
            files,
            injected_failures: 0,
        };
        Self {
            snapshot,
            backend: Arc::new(Mutex::new(backend)),
        }
    }

    /// Last acknowledged text for a text box
    #[must_use]
    pub fn stored_text(&self, text_box: TextBoxId) -> Option<String> {
        self.backend.lock().texts.get(&text_box).cloned()
    }

    /// File currently stored for a slot
    #[must_use]
    pub fn stored_file(&self, slot: UploadSlotId) -> Option<FileMeta> {
        self.backend.lock().files.get(&slot).cloned()
    }

    /// Number of failures injected so far
    #[must_use]
    pub fn injected_failures(&self) -> u64 {
        self.backend.lock().injected_failures
    }

    fn roll(&self) -> (bool, Duration) {
        self.backend.lock().roll()
    }
}

fn injected() -> ServiceError {
    ServiceError::Transport("injected failure".to_string())
}

#[async_trait]
impl AssignmentService for SimService {
    async fn fetch_assignment(
        &self,
        _target: &AssignmentRef,
    ) -> Result<AssignmentSnapshot, ServiceError> {
        Ok(self.snapshot.clone())
    }

    async fn save_text(
        &self,
        _target: &AssignmentRef,
        text_box: TextBoxId,
        text: String,
    ) -> Result<(), ServiceError> {
        let (fail, latency) = self.roll();
        tokio::time::sleep(latency).await;
        if fail {
            return Err(injected());
        }
        self.backend.lock().texts.insert(text_box, text);
        Ok(())
    }

    fn upload_file(
        &self,
        _target: &AssignmentRef,
        slot: UploadSlotId,
        file: UploadFile,
    ) -> UploadStream {
        let (fail, latency, steps) = {
            let mut backend = self.backend.lock();
            let (fail, latency) = backend.roll();
            let steps = backend.rng.random_range(0..=3u8);
            (fail, latency, steps)
        };

        let mut items: Vec<Result<UploadEvent, ServiceError>> = (1..=steps)
            .map(|step| Ok(UploadEvent::Progress(step * 25)))
            .collect();
        items.push(if fail {
            Err(injected())
        } else {
            Ok(UploadEvent::Completed(FileMeta::new(file.name.clone(), file.size())))
        });

        let backend = Arc::clone(&self.backend);
        let step_latency = latency / (u32::from(steps) + 1);
        stream::iter(items)
            .then(move |item| {
                let backend = Arc::clone(&backend);
                async move {
                    tokio::time::sleep(step_latency).await;
                    if let Ok(UploadEvent::Completed(meta)) = &item {
                        backend.lock().files.insert(slot, meta.clone());
                    }
                    item
                }
            })
            .boxed()
    }

    async fn delete_file(
        &self,
        _target: &AssignmentRef,
        slot: UploadSlotId,
    ) -> Result<(), ServiceError> {
        let (fail, latency) = self.roll();
        tokio::time::sleep(latency).await;
        if fail {
            return Err(injected());
        }
        self.backend.lock().files.remove(&slot);
        Ok(())
    }

    async fn download_file(
        &self,
        _target: &AssignmentRef,
        _slot: UploadSlotId,
    ) -> Result<(), ServiceError> {
        let (fail, latency) = self.roll();
        tokio::time::sleep(latency).await;
        if fail {
            Err(injected())
        } else {
            Ok(())
        }
    }
}
