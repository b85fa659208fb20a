//! Edit-boundary validation
//!
//! Input that fails these checks is rejected before it reaches a channel and
//! causes no state transition.

use crate::error::ValidationError;
use crate::leaf::{TextBox, UploadSlot};

/// Default upload size cap: 32 MiB
pub const MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// What the boundary knows about a file before uploading it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCandidate<'a> {
    /// File name, used for extension matching
    pub name: &'a str,
    /// MIME type, if the caller knows it
    pub content_type: Option<&'a str>,
    /// Size in bytes
    pub size: u64,
}

/// Check a draft against the field's byte limit
///
/// The limit counts UTF-8 bytes, not characters.
///
/// # Errors
/// - `ValidationError::TextTooLong`
pub fn check_text(text_box: &TextBox, text: &str) -> Result<(), ValidationError> {
    match text_box.max_length {
        Some(max) if text.len() > max => Err(ValidationError::TextTooLong {
            max,
            actual: text.len(),
        }),
        _ => Ok(()),
    }
}

/// Check a file against the slot and the size cap
///
/// # Errors
/// - `ValidationError::SlotOccupied` if the slot holds a file
/// - `ValidationError::FileTooLarge` if `file.size > max_bytes`
/// - `ValidationError::FileTypeNotAllowed` if no accepted type matches
pub fn check_upload(
    slot: &UploadSlot,
    file: &FileCandidate<'_>,
    max_bytes: u64,
) -> Result<(), ValidationError> {
    if slot.state.has_file() {
        return Err(ValidationError::SlotOccupied(slot.id));
    }
    if file.size > max_bytes {
        return Err(ValidationError::FileTooLarge {
            max: max_bytes,
            actual: file.size,
        });
    }
    if !type_allowed(&slot.allowed_types, file) {
        return Err(ValidationError::FileTypeNotAllowed {
            name: file.name.to_string(),
            allowed: slot.allowed_types.clone(),
        });
    }
    Ok(())
}

/// Check that there is a file to delete
///
/// # Errors
/// - `ValidationError::SlotEmpty`
pub fn check_delete(slot: &UploadSlot) -> Result<(), ValidationError> {
    if slot.state.has_file() {
        Ok(())
    } else {
        Err(ValidationError::SlotEmpty(slot.id))
    }
}

fn type_allowed(allowed: &[String], file: &FileCandidate<'_>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let extension = file
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    allowed.iter().any(|entry| {
        let entry = entry.trim().to_ascii_lowercase();
        if let Some((kind, sub)) = entry.split_once('/') {
            let Some(content_type) = file.content_type else {
                return false;
            };
            let content_type = content_type.to_ascii_lowercase();
            match content_type.split_once('/') {
                Some((ct_kind, ct_sub)) => ct_kind == kind && (sub == "*" || ct_sub == sub),
                None => false,
            }
        } else {
            extension.as_deref() == Some(entry.trim_start_matches('.'))
        }
    })
}
