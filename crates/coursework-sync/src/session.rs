//! Assignment session
//!
//! Composition root for one open assignment:
//! - loads the snapshot and builds the tree
//! - spawns the dispatcher plus one channel per leaf
//! - validates every edit before anything is dispatched
//! - tears everything down on [`AssignmentSession::shutdown`] or drop

use crate::config::SyncConfig;
use crate::context::ChannelContext;
use crate::dispatcher::spawn_dispatcher;
use crate::error::SessionError;
use crate::notice::{Notice, NoticeSender};
use crate::service::{AssignmentRef, AssignmentService, UploadFile};
use crate::text_channel::TextChannel;
use crate::upload_channel::{spawn_download, UploadChannel};
use coursework_model::{
    validation, AssignmentSummary, AssignmentTree, LeafId, LeaveDecision, SaveStatus, TextBoxId,
    TreeEvent, UploadSlot, UploadSlotId, ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// An open assignment with live autosave
pub struct AssignmentSession {
    config: SyncConfig,
    ctx: ChannelContext,
    state: watch::Receiver<AssignmentTree>,
    text_channels: HashMap<TextBoxId, TextChannel>,
    upload_channels: HashMap<UploadSlotId, UploadChannel>,
    tasks: Vec<JoinHandle<()>>,
}

impl AssignmentSession {
    /// Fetch the assignment and start syncing it
    ///
    /// # Errors
    /// - `SessionError::Load` if the fetch fails; nothing is spawned
    /// - `SessionError::Invalid` if the snapshot has duplicate ids
    #[instrument(skip_all, fields(assignment = %target))]
    pub async fn load(
        service: Arc<dyn AssignmentService>,
        target: AssignmentRef,
        config: SyncConfig,
    ) -> Result<Self, SessionError> {
        let snapshot = service.fetch_assignment(&target).await.map_err(|err| {
            warn!(error = %err, "failed to load assignment");
            SessionError::Load(err)
        })?;
        let tree = AssignmentTree::from_snapshot(snapshot)?;

        let cancel = CancellationToken::new();
        let (events, state, dispatcher) = spawn_dispatcher(tree.clone(), cancel.child_token());
        let ctx = ChannelContext {
            service,
            target: Arc::new(target),
            events,
            notices: NoticeSender::new(config.notice_capacity.max(1)),
            cancel,
            debounce: config.debounce(),
        };

        let mut tasks = vec![dispatcher];
        let mut text_channels = HashMap::new();
        for text_box in tree.text_boxes() {
            let (channel, task) =
                TextChannel::spawn(ctx.child(), text_box.id, text_box.current_text.clone());
            text_channels.insert(text_box.id, channel);
            tasks.push(task);
        }
        let mut upload_channels = HashMap::new();
        for slot in tree.upload_slots() {
            let (channel, task) = UploadChannel::spawn(ctx.child(), slot.id, slot.state.has_file());
            upload_channels.insert(slot.id, channel);
            tasks.push(task);
        }

        info!(
            parts = tree.part_count(),
            text_boxes = text_channels.len(),
            upload_slots = upload_channels.len(),
            complete = tree.is_complete(),
            "assignment loaded"
        );

        Ok(Self {
            config,
            ctx,
            state,
            text_channels,
            upload_channels,
            tasks,
        })
    }

    /// Get the assignment this session edits
    #[inline]
    #[must_use]
    pub fn target(&self) -> &AssignmentRef {
        &self.ctx.target
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Latest published tree
    #[must_use]
    pub fn tree(&self) -> AssignmentTree {
        self.state.borrow().clone()
    }

    /// Subscribe to published trees
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AssignmentTree> {
        self.state.clone()
    }

    /// Subscribe to notices
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.ctx.notices.subscribe()
    }

    /// Aggregate save status
    #[must_use]
    pub fn save_status(&self) -> SaveStatus {
        self.state.borrow().save_status()
    }

    /// Check if every mandatory field is committed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.borrow().is_complete()
    }

    /// Navigation guard
    #[must_use]
    pub fn leave_decision(&self) -> LeaveDecision {
        self.state.borrow().leave_decision()
    }

    /// Renderable summary
    #[must_use]
    pub fn summary(&self) -> AssignmentSummary {
        self.state.borrow().summary()
    }

    /// Check if the session was torn down
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ctx.cancel.is_cancelled()
    }

    /// Record a new draft and schedule its save
    ///
    /// # Errors
    /// - `SessionError::Validation` if the text exceeds the field's byte limit
    /// - `SessionError::UnknownLeaf`, `SessionError::Closed`
    pub fn edit_text(
        &self,
        text_box: TextBoxId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        let text = text.into();
        {
            let tree = self.state.borrow();
            let field = tree
                .text_box(text_box)
                .ok_or(SessionError::UnknownLeaf(LeafId::TextBox(text_box)))?;
            validation::check_text(field, &text)?;
        }
        let channel = self.text_channel(text_box)?;
        self.dispatch(TreeEvent::DraftChanged {
            text_box,
            text: text.clone(),
        })?;
        if channel.edit(text) {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    /// Save the current draft immediately
    ///
    /// # Errors
    /// - `SessionError::UnknownLeaf`, `SessionError::Closed`
    pub fn retry_text(&self, text_box: TextBoxId) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.text_channel(text_box)?.retry() {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    /// Upload a file into an empty slot
    ///
    /// # Errors
    /// - `SessionError::Validation` for oversized files, disallowed types or an occupied slot
    /// - `SessionError::UnknownLeaf`, `SessionError::Closed`
    pub fn upload_file(&self, slot: UploadSlotId, file: UploadFile) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.with_slot(slot, |upload| {
            validation::check_upload(upload, &file.candidate(), self.config.max_upload_bytes)
        })?;
        if self.upload_channel(slot)?.upload(file) {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    /// Delete the file in a slot
    ///
    /// # Errors
    /// - `SessionError::Validation` if the slot has no file
    /// - `SessionError::UnknownLeaf`, `SessionError::Closed`
    pub fn delete_file(&self, slot: UploadSlotId) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.with_slot(slot, validation::check_delete)?;
        if self.upload_channel(slot)?.delete() {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    /// Download the file in a slot; failures arrive as [`Notice::DownloadFailed`]
    ///
    /// # Errors
    /// - `SessionError::UnknownLeaf`, `SessionError::Closed`
    pub fn download_file(&self, slot: UploadSlotId) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.upload_channel(slot)?;
        drop(spawn_download(self.ctx.child(), slot));
        Ok(())
    }

    /// Reset the form to pristine after the caller persisted everything
    ///
    /// # Errors
    /// - `SessionError::Closed`
    pub fn mark_pristine(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.dispatch(TreeEvent::MarkPristine)
    }

    /// Cancel all work and wait for every task to stop
    pub async fn shutdown(mut self) {
        self.ctx.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(err) = task.await {
                error!(error = %err, "session task failed");
            }
        }
        info!(assignment = %self.ctx.target, "session closed");
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn dispatch(&self, event: TreeEvent) -> Result<(), SessionError> {
        if self.ctx.events.dispatch(event) {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    fn text_channel(&self, id: TextBoxId) -> Result<&TextChannel, SessionError> {
        self.text_channels
            .get(&id)
            .ok_or(SessionError::UnknownLeaf(LeafId::TextBox(id)))
    }

    fn upload_channel(&self, id: UploadSlotId) -> Result<&UploadChannel, SessionError> {
        self.upload_channels
            .get(&id)
            .ok_or(SessionError::UnknownLeaf(LeafId::UploadSlot(id)))
    }

    fn with_slot<F>(&self, id: UploadSlotId, check: F) -> Result<(), SessionError>
    where
        F: FnOnce(&UploadSlot) -> Result<(), ValidationError>,
    {
        let tree = self.state.borrow();
        let slot = tree
            .upload_slot(id)
            .ok_or(SessionError::UnknownLeaf(LeafId::UploadSlot(id)))?;
        check(slot).map_err(SessionError::from)
    }
}

impl Drop for AssignmentSession {
    fn drop(&mut self) {
        self.ctx.cancel.cancel();
    }
}

impl std::fmt::Debug for AssignmentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentSession")
            .field("target", &self.ctx.target)
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
