//! Command dispatcher
//!
//! One task owns the [`AssignmentTree`]:
//! - events arrive on an unbounded queue and are applied in receipt order
//! - every applied event publishes the recomputed tree through a `watch`
//! - invariant violations are logged and the event is dropped
//!   (`strict-debug` panics instead)

use coursework_model::{reduce, strict_debug, AssignmentTree, TreeEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, Instrument};

/// Handle for submitting events to the dispatcher
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TreeEvent>,
}

impl EventSink {
    /// Queue an event; returns `false` once the dispatcher is gone
    pub fn dispatch(&self, event: TreeEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                trace!(event = event.name(), "dispatcher closed, event discarded");
                false
            }
        }
    }

    /// Check if the dispatcher has stopped
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the dispatcher task owning `tree`
///
/// Returns the event sink, a receiver of published trees and the task handle.
/// The task ends when `cancel` fires or every sink is dropped.
pub fn spawn_dispatcher(
    tree: AssignmentTree,
    cancel: CancellationToken,
) -> (EventSink, watch::Receiver<AssignmentTree>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let span = tracing::debug_span!("dispatcher", assignment = %tree.id());
    let (state, published) = watch::channel(tree);
    let handle = tokio::spawn(run(rx, state, cancel).instrument(span));
    (EventSink { tx }, published, handle)
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<TreeEvent>,
    state: watch::Sender<AssignmentTree>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("cancelled");
                break;
            }
            event = rx.recv() => match event {
                Some(event) => apply_event(&state, event),
                None => {
                    debug!("all senders dropped");
                    break;
                }
            },
        }
    }
    rx.close();
}

fn apply_event(state: &watch::Sender<AssignmentTree>, event: TreeEvent) {
    let name = event.name();
    let leaf = event.leaf();
    let current = state.borrow().clone();

    match reduce(&current, event) {
        Ok(next) => {
            trace!(event = name, status = %next.save_status(), complete = next.is_complete(), "applied");
            state.send_replace(next);
        }
        Err(err) => {
            if strict_debug() {
                panic!("invariant violation on {name}: {err}");
            }
            error!(event = name, ?leaf, error = %err, "invariant violation, event dropped");
        }
    }
}
