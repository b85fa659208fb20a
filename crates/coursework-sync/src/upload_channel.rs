//! Per-upload-slot channel
//!
//! Uploads and deletes on one slot never overlap: a request that arrives
//! while another is in flight is dropped, not queued (exhaust). Progress from
//! the upload stream is forwarded as it arrives.
//!
//! Downloads do not change the slot and run outside the channel; see
//! [`spawn_download`].

use crate::context::ChannelContext;
use crate::notice::Notice;
use crate::service::{ServiceError, UploadEvent, UploadFile, UploadStream};
use coursework_model::{FileMeta, TreeEvent, UploadSlotId};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn, Instrument};

#[derive(Debug)]
pub(crate) enum SlotCommand {
    Upload(UploadFile),
    Delete,
}

/// Handle to a running upload channel
#[derive(Debug, Clone)]
pub(crate) struct UploadChannel {
    tx: mpsc::UnboundedSender<SlotCommand>,
}

impl UploadChannel {
    /// Spawn the channel task for `id`; `has_file` seeds the occupancy guard
    pub(crate) fn spawn(
        ctx: ChannelContext,
        id: UploadSlotId,
        has_file: bool,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = SlotWorker {
            id,
            ctx,
            has_file,
            operation: None,
        };
        let span = tracing::debug_span!("upload_channel", slot = %id);
        let handle = tokio::spawn(worker.run(rx).instrument(span));
        (Self { tx }, handle)
    }

    /// Forward a validated upload; returns `false` once the channel stopped
    pub(crate) fn upload(&self, file: UploadFile) -> bool {
        self.tx.send(SlotCommand::Upload(file)).is_ok()
    }

    /// Forward a delete request
    pub(crate) fn delete(&self) -> bool {
        self.tx.send(SlotCommand::Delete).is_ok()
    }
}

enum SlotOperation {
    Upload(UploadStream),
    Delete(BoxFuture<'static, Result<(), ServiceError>>),
}

enum SlotOutcome {
    Progress(u8),
    Uploaded(FileMeta),
    UploadFailed(ServiceError),
    Deleted,
    DeleteFailed(ServiceError),
}

struct SlotWorker {
    id: UploadSlotId,
    ctx: ChannelContext,
    has_file: bool,
    operation: Option<SlotOperation>,
}

impl SlotWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SlotCommand>) {
        let cancel = self.ctx.cancel.clone();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    if self.operation.is_some() {
                        debug!("abandoning in-flight operation");
                    }
                    break;
                }
                outcome = next_outcome(&mut self.operation) => self.settle(outcome),
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
    }

    fn handle(&mut self, command: SlotCommand) {
        if self.operation.is_some() {
            self.reject("another upload or delete is in progress");
            return;
        }
        match command {
            SlotCommand::Upload(_) if self.has_file => {
                self.reject("slot already holds a file");
            }
            SlotCommand::Upload(file) => {
                if !self.ctx.events.dispatch(TreeEvent::UploadStarted { slot: self.id }) {
                    return;
                }
                debug!(filename = %file.name, size = file.size(), "upload started");
                let stream = self.ctx.service.upload_file(&self.ctx.target, self.id, file);
                self.operation = Some(SlotOperation::Upload(stream));
            }
            SlotCommand::Delete if !self.has_file => {
                self.reject("slot has no file");
            }
            SlotCommand::Delete => {
                if !self.ctx.events.dispatch(TreeEvent::DeleteStarted { slot: self.id }) {
                    return;
                }
                debug!("delete started");
                let service = Arc::clone(&self.ctx.service);
                let target = Arc::clone(&self.ctx.target);
                let slot = self.id;
                self.operation = Some(SlotOperation::Delete(
                    async move { service.delete_file(&target, slot).await }.boxed(),
                ));
            }
        }
    }

    fn reject(&self, reason: &str) {
        debug!(reason, "request ignored");
        self.ctx.notices.emit(Notice::UploadRejected {
            slot: self.id,
            message: reason.to_string(),
        });
    }

    fn settle(&mut self, outcome: SlotOutcome) {
        let slot = self.id;
        let event = match outcome {
            SlotOutcome::Progress(percent) => {
                trace!(percent, "upload progress");
                self.ctx
                    .events
                    .dispatch(TreeEvent::UploadProgress { slot, percent });
                return;
            }
            SlotOutcome::Uploaded(file) => {
                debug!(filename = %file.filename, "upload completed");
                self.has_file = true;
                TreeEvent::UploadCompleted { slot, file }
            }
            SlotOutcome::UploadFailed(err) => {
                warn!(error = %err, "upload failed");
                self.ctx.notices.leaf_failed(slot.into(), &err);
                TreeEvent::UploadFailed {
                    slot,
                    message: err.to_string(),
                }
            }
            SlotOutcome::Deleted => {
                debug!("file deleted");
                self.has_file = false;
                TreeEvent::DeleteCompleted { slot }
            }
            SlotOutcome::DeleteFailed(err) => {
                warn!(error = %err, "delete failed");
                self.ctx.notices.leaf_failed(slot.into(), &err);
                TreeEvent::DeleteFailed {
                    slot,
                    message: err.to_string(),
                }
            }
        };
        self.operation = None;
        self.ctx.events.dispatch(event);
    }
}

async fn next_outcome(operation: &mut Option<SlotOperation>) -> SlotOutcome {
    match operation {
        Some(SlotOperation::Upload(stream)) => match stream.next().await {
            Some(Ok(UploadEvent::Progress(percent))) => SlotOutcome::Progress(percent),
            Some(Ok(UploadEvent::Completed(file))) => SlotOutcome::Uploaded(file),
            Some(Err(err)) => SlotOutcome::UploadFailed(err),
            None => SlotOutcome::UploadFailed(ServiceError::Transport(
                "upload ended before completion".to_string(),
            )),
        },
        Some(SlotOperation::Delete(future)) => match future.as_mut().await {
            Ok(()) => SlotOutcome::Deleted,
            Err(err) => SlotOutcome::DeleteFailed(err),
        },
        None => std::future::pending().await,
    }
}

/// Download a slot's file; failure is reported as a notice only
pub(crate) fn spawn_download(ctx: ChannelContext, slot: UploadSlotId) -> JoinHandle<()> {
    let span = tracing::debug_span!("download", slot = %slot);
    tokio::spawn(
        async move {
            let result = tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => return,
                result = ctx.service.download_file(&ctx.target, slot) => result,
            };
            if let Err(err) = result {
                warn!(error = %err, "download failed");
                if err.is_auth_expired() {
                    ctx.notices.emit(Notice::AuthExpired);
                }
                ctx.notices.emit(Notice::DownloadFailed {
                    slot,
                    message: err.to_string(),
                });
            }
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::spawn_dispatcher;
    use crate::notice::NoticeSender;
    use crate::service::AssignmentRef;
    use crate::testing::StubService;
    use coursework_model::{
        AssignmentId, AssignmentSnapshot, AssignmentTree, PartId, PartSnapshot, UploadSlotSnapshot,
        UploadState,
    };
    use std::time::Duration;
    use tokio::sync::{broadcast, watch};
    use tokio_util::sync::CancellationToken;

    struct Harness {
        channel: UploadChannel,
        slot: UploadSlotId,
        state: watch::Receiver<AssignmentTree>,
        notices: broadcast::Receiver<Notice>,
        _cancel: CancellationToken,
    }

    fn harness(service: Arc<StubService>, file: Option<FileMeta>) -> Harness {
        let slot = UploadSlotId::new();
        let has_file = file.is_some();
        let tree = AssignmentTree::from_snapshot(
            AssignmentSnapshot::new(AssignmentId::new(), "").with_part(
                PartSnapshot::new(PartId::new(), "")
                    .with_upload_slot(UploadSlotSnapshot::new(slot, file)),
            ),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let (events, state, _) = spawn_dispatcher(tree, cancel.child_token());
        let notice_tx = NoticeSender::new(8);
        let notices = notice_tx.subscribe();
        let ctx = ChannelContext {
            service,
            target: Arc::new(AssignmentRef::new("course", AssignmentId::new())),
            events,
            notices: notice_tx,
            cancel: cancel.child_token(),
            debounce: Duration::from_millis(1000),
        };
        let (channel, _) = UploadChannel::spawn(ctx, slot, has_file);
        Harness {
            channel,
            slot,
            state,
            notices,
            _cancel: cancel,
        }
    }

    #[tokio::test]
    async fn overlapping_upload_is_ignored() {
        let service = Arc::new(StubService::default());
        let mut h = harness(Arc::clone(&service), None);

        h.channel.upload(UploadFile::new("a.pdf", vec![1; 4]));
        h.channel.upload(UploadFile::new("b.pdf", vec![2; 4]));

        let slot = h.slot;
        let tree = h
            .state
            .wait_for(|tree| tree.upload_slot(slot).unwrap().state == UploadState::Saved)
            .await
            .unwrap()
            .clone();
        let upload = tree.upload_slot(slot).unwrap();
        assert_eq!(upload.file.as_ref().unwrap().filename, "a.pdf");
        assert_eq!(upload.progress, 100);
        assert_eq!(service.uploaded_names(), vec!["a.pdf".to_string()]);
        assert!(matches!(
            h.notices.recv().await.unwrap(),
            Notice::UploadRejected { .. }
        ));
    }

    #[tokio::test]
    async fn delete_empties_slot() {
        let service = Arc::new(StubService::default());
        let mut h = harness(Arc::clone(&service), Some(FileMeta::new("old.png", 10)));

        h.channel.delete();

        let slot = h.slot;
        h.state
            .wait_for(|tree| tree.upload_slot(slot).unwrap().state == UploadState::Empty)
            .await
            .unwrap();
        assert_eq!(service.delete_count(), 1);
        assert!(!h.state.borrow().is_complete());
    }
}
