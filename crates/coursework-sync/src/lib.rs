//! Coursework Sync
//!
//! Asynchronous side of the assignment form:
//! - [`AssignmentSession`]: load, edit, upload, delete, download, shutdown
//! - per-leaf channels: debounced text saves (switch) and exhaust-guarded
//!   uploads/deletes
//! - a single dispatcher task that owns the tree and publishes every change
//! - [`AssignmentService`]: the injected persistence boundary
//!
//! # Example
//!
//! ```rust,ignore
//! use coursework_sync::{AssignmentRef, AssignmentSession, SyncConfig};
//!
//! let session = AssignmentSession::load(service, target, SyncConfig::default()).await?;
//! session.edit_text(text_box, "first draft")?;
//! let mut trees = session.subscribe();
//! trees.changed().await?;
//! println!("{}", trees.borrow().save_status());
//! session.shutdown().await;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
mod context;
pub mod dispatcher;
pub mod error;
pub mod notice;
pub mod service;
pub mod session;
mod text_channel;
mod upload_channel;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::SyncConfig;
pub use dispatcher::{spawn_dispatcher, EventSink};
pub use error::{ConfigError, SessionError};
pub use notice::Notice;
pub use service::{
    AssignmentRef, AssignmentService, ServiceError, UploadEvent, UploadFile, UploadStream,
};
pub use session::AssignmentSession;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
