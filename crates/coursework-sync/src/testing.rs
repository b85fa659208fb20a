//! In-crate service stub for unit tests

use crate::service::{
    AssignmentRef, AssignmentService, ServiceError, UploadEvent, UploadFile, UploadStream,
};
use coursework_model::{AssignmentSnapshot, FileMeta, TextBoxId, UploadSlotId};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

/// Always succeeds and records what it was asked to do
#[derive(Debug, Default)]
pub(crate) struct StubService {
    saved: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
    deletes: Mutex<usize>,
}

impl StubService {
    pub(crate) fn saved_texts(&self) -> Vec<String> {
        self.saved.lock().clone()
    }

    pub(crate) fn uploaded_names(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }

    pub(crate) fn delete_count(&self) -> usize {
        *self.deletes.lock()
    }
}

#[async_trait::async_trait]
impl AssignmentService for StubService {
    async fn fetch_assignment(
        &self,
        _target: &AssignmentRef,
    ) -> Result<AssignmentSnapshot, ServiceError> {
        Err(ServiceError::NotFound("stub has no assignments".into()))
    }

    async fn save_text(
        &self,
        _target: &AssignmentRef,
        _text_box: TextBoxId,
        text: String,
    ) -> Result<(), ServiceError> {
        self.saved.lock().push(text);
        Ok(())
    }

    fn upload_file(
        &self,
        _target: &AssignmentRef,
        _slot: UploadSlotId,
        file: UploadFile,
    ) -> UploadStream {
        self.uploads.lock().push(file.name.clone());
        let meta = FileMeta::new(file.name.clone(), file.size());
        stream::iter([
            Ok(UploadEvent::Progress(50)),
            Ok(UploadEvent::Completed(meta)),
        ])
        .boxed()
    }

    async fn delete_file(
        &self,
        _target: &AssignmentRef,
        _slot: UploadSlotId,
    ) -> Result<(), ServiceError> {
        *self.deletes.lock() += 1;
        Ok(())
    }

    async fn download_file(
        &self,
        _target: &AssignmentRef,
        _slot: UploadSlotId,
    ) -> Result<(), ServiceError> {
        Ok(())
    }
}
