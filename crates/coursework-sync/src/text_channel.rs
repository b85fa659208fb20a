//! Per-text-box save channel
//!
//! One task per text box, driven by a single `select!` loop over three
//! phases:
//! - idle: nothing scheduled
//! - pending timer: the newest draft waits out the debounce window
//! - in flight: one save is outstanding
//!
//! A timer firing while a save is in flight drops the old save and sends the
//! newest draft instead (switch). A dropped save never reports back.

use crate::context::ChannelContext;
use crate::service::ServiceError;
use coursework_model::{TextBoxId, TreeEvent};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn, Instrument};

#[derive(Debug)]
pub(crate) enum TextCommand {
    /// New draft; restarts the debounce window
    Draft(String),
    /// Send the current draft now
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextPhase {
    Idle,
    PendingTimer,
    InFlight,
}

/// Handle to a running text channel
#[derive(Debug, Clone)]
pub(crate) struct TextChannel {
    tx: mpsc::UnboundedSender<TextCommand>,
}

impl TextChannel {
    /// Spawn the channel task for `id`, seeded with its loaded text
    pub(crate) fn spawn(
        ctx: ChannelContext,
        id: TextBoxId,
        draft: String,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = TextWorker {
            id,
            ctx,
            draft,
            deadline: None,
            in_flight: None,
        };
        let span = tracing::debug_span!("text_channel", text_box = %id);
        let handle = tokio::spawn(worker.run(rx).instrument(span));
        (Self { tx }, handle)
    }

    /// Forward a validated draft; returns `false` once the channel stopped
    pub(crate) fn edit(&self, text: String) -> bool {
        self.tx.send(TextCommand::Draft(text)).is_ok()
    }

    /// Request an immediate save of the current draft
    pub(crate) fn retry(&self) -> bool {
        self.tx.send(TextCommand::Retry).is_ok()
    }
}

struct InFlightSave {
    sent: String,
    future: BoxFuture<'static, Result<(), ServiceError>>,
}

struct TextWorker {
    id: TextBoxId,
    ctx: ChannelContext,
    draft: String,
    deadline: Option<Instant>,
    in_flight: Option<InFlightSave>,
}

impl TextWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<TextCommand>) {
        let cancel = self.ctx.cancel.clone();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    if self.in_flight.is_some() {
                        debug!("abandoning in-flight save");
                    }
                    break;
                }
                result = wait_in_flight(&mut self.in_flight) => self.finish(result),
                () = sleep_until_deadline(self.deadline) => {
                    self.deadline = None;
                    self.start_save();
                }
                command = rx.recv() => match command {
                    Some(TextCommand::Draft(text)) => self.schedule(text),
                    Some(TextCommand::Retry) => {
                        debug!(phase = ?self.phase(), "retry requested");
                        self.deadline = Some(Instant::now());
                    }
                    None => break,
                },
            }
        }
    }

    fn phase(&self) -> TextPhase {
        if self.in_flight.is_some() {
            TextPhase::InFlight
        } else if self.deadline.is_some() {
            TextPhase::PendingTimer
        } else {
            TextPhase::Idle
        }
    }

    fn schedule(&mut self, text: String) {
        self.draft = text;
        self.deadline = Some(Instant::now() + self.ctx.debounce);
        trace!(phase = ?self.phase(), "debounce restarted");
    }

    fn start_save(&mut self) {
        if self.in_flight.take().is_some() {
            debug!("superseding in-flight save");
        }
        if !self
            .ctx
            .events
            .dispatch(TreeEvent::TextSaveStarted { text_box: self.id })
        {
            return;
        }

        let sent = self.draft.clone();
        let service = Arc::clone(&self.ctx.service);
        let target = Arc::clone(&self.ctx.target);
        let (id, text) = (self.id, sent.clone());
        debug!(bytes = sent.len(), "save started");
        self.in_flight = Some(InFlightSave {
            sent,
            future: async move { service.save_text(&target, id, text).await }.boxed(),
        });
    }

    fn finish(&mut self, result: Result<(), ServiceError>) {
        let Some(done) = self.in_flight.take() else {
            return;
        };
        match result {
            Ok(()) => {
                debug!(bytes = done.sent.len(), "saved");
                self.ctx.events.dispatch(TreeEvent::TextSaved {
                    text_box: self.id,
                    text: done.sent,
                });
            }
            Err(err) => {
                warn!(error = %err, "save failed");
                self.ctx.notices.leaf_failed(self.id.into(), &err);
                self.ctx.events.dispatch(TreeEvent::TextSaveFailed {
                    text_box: self.id,
                    message: err.to_string(),
                });
            }
        }
    }
}

async fn wait_in_flight(in_flight: &mut Option<InFlightSave>) -> Result<(), ServiceError> {
    match in_flight {
        Some(save) => save.future.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::spawn_dispatcher;
    use crate::notice::NoticeSender;
    use crate::service::AssignmentRef;
    use crate::testing::StubService;
    use coursework_model::{
        AssignmentId, AssignmentSnapshot, AssignmentTree, PartId, PartSnapshot, SaveStatus,
        TextBoxSnapshot,
    };
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn harness(
        service: Arc<StubService>,
    ) -> (
        TextChannel,
        TextBoxId,
        tokio::sync::watch::Receiver<AssignmentTree>,
        CancellationToken,
    ) {
        let id = TextBoxId::new();
        let tree = AssignmentTree::from_snapshot(
            AssignmentSnapshot::new(AssignmentId::new(), "").with_part(
                PartSnapshot::new(PartId::new(), "").with_text_box(TextBoxSnapshot::new(id, "")),
            ),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let (events, state, _) = spawn_dispatcher(tree, cancel.child_token());
        let ctx = ChannelContext {
            service,
            target: Arc::new(AssignmentRef::new("course", AssignmentId::new())),
            events,
            notices: NoticeSender::new(4),
            cancel: cancel.child_token(),
            debounce: Duration::from_millis(1000),
        };
        let (channel, _) = TextChannel::spawn(ctx, id, String::new());
        (channel, id, state, cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_coalesced_into_latest_value() {
        let service = Arc::new(StubService::default());
        let (channel, id, mut state, _cancel) = harness(Arc::clone(&service));

        for text in ["a", "ab", "abc"] {
            channel.edit(text.into());
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;

        state
            .wait_for(|tree| tree.text_box(id).unwrap().saved_text == "abc")
            .await
            .unwrap();
        assert_eq!(service.saved_texts(), vec!["abc".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_skips_debounce() {
        // the draft event is not dispatched here, so the tree still holds ""
        // as current text and reads unsaved after the save
        let service = Arc::new(StubService::default());
        let (channel, id, mut state, _cancel) = harness(Arc::clone(&service));

        channel.edit("draft".into());
        channel.retry();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let tree = state
            .wait_for(|tree| tree.text_box(id).unwrap().saved_text == "draft")
            .await
            .unwrap()
            .clone();
        assert_eq!(tree.save_status(), SaveStatus::Unsaved);
        assert_eq!(service.saved_texts(), vec!["draft".to_string()]);
    }
}
