//! Out-of-band notices
//!
//! Things the user or the embedding application should hear about that are
//! not part of the tree: failed downloads, expired sessions, failed saves and
//! requests dropped by the exhaust guard.

use crate::service::ServiceError;
use coursework_model::{LeafId, UploadSlotId};
use tokio::sync::broadcast;

/// A notice on the session's broadcast stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Download of a slot's file failed
    DownloadFailed {
        /// Slot whose file was requested
        slot: UploadSlotId,
        /// Failure text for the user
        message: String,
    },
    /// The backend session expired; halt and re-authenticate
    AuthExpired,
    /// A save, upload or delete failed
    SaveFailed {
        /// Failed field
        leaf: LeafId,
        /// Failure text for the user
        message: String,
    },
    /// An upload or delete was ignored because another one is in flight
    UploadRejected {
        /// Busy slot
        slot: UploadSlotId,
        /// Why the request was dropped
        message: String,
    },
}

/// Sending half of the notice stream
#[derive(Debug, Clone)]
pub(crate) struct NoticeSender {
    tx: broadcast::Sender<Notice>,
}

impl NoticeSender {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish; having no subscribers is fine
    pub(crate) fn emit(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }

    /// Publish a leaf failure, plus `AuthExpired` when applicable
    pub(crate) fn leaf_failed(&self, leaf: LeafId, error: &ServiceError) {
        if error.is_auth_expired() {
            self.emit(Notice::AuthExpired);
        }
        self.emit(Notice::SaveFailed {
            leaf,
            message: error.to_string(),
        });
    }
}
