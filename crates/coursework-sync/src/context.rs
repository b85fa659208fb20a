//! Shared wiring handed to every leaf channel

use crate::dispatcher::EventSink;
use crate::notice::NoticeSender;
use crate::service::{AssignmentRef, AssignmentService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub(crate) struct ChannelContext {
    pub(crate) service: Arc<dyn AssignmentService>,
    pub(crate) target: Arc<AssignmentRef>,
    pub(crate) events: EventSink,
    pub(crate) notices: NoticeSender,
    pub(crate) cancel: CancellationToken,
    pub(crate) debounce: Duration,
}

impl ChannelContext {
    /// Same wiring under a child cancellation token
    pub(crate) fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            ..self.clone()
        }
    }
}
