//! Sync configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! debounce_ms = 1000
//! max_upload_bytes = 33554432
//! notice_capacity = 64
//! ```

use crate::error::ConfigError;
use coursework_model::MAX_UPLOAD_BYTES;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timing and limits for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last keystroke before a text save is sent
    pub debounce_ms: u64,
    /// Upload size cap in bytes
    pub max_upload_bytes: u64,
    /// Buffered notices per subscriber before old ones are dropped
    pub notice_capacity: usize,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With debounce window
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With upload cap
    #[inline]
    #[must_use]
    pub fn with_max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }

    /// With notice buffer size
    #[inline]
    #[must_use]
    pub fn with_notice_capacity(mut self, capacity: usize) -> Self {
        self.notice_capacity = capacity;
        self
    }

    /// Debounce window as a duration
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML or wrong types
    /// - `ConfigError::Invalid` for unusable values
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Read` if the file cannot be read
    /// - see [`SyncConfig::from_toml_str`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check values
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if the notice buffer is empty or the upload cap is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notice_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notice_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            notice_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_gives_defaults() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.debounce(), Duration::from_secs(1));
        assert_eq!(config.max_upload_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn partial_document_overrides() {
        let config = SyncConfig::from_toml_str("debounce_ms = 250").unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.notice_capacity, 64);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = SyncConfig::from_toml_str("notice_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = SyncConfig::from_toml_str("debounce_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_upload_bytes = 1024").unwrap();
        let config = SyncConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = SyncConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn builder_methods() {
        let config = SyncConfig::new()
            .with_debounce(Duration::from_millis(10))
            .with_max_upload_bytes(5)
            .with_notice_capacity(2);
        assert_eq!(config.debounce_ms, 10);
        assert_eq!(config.max_upload_bytes, 5);
        assert_eq!(config.notice_capacity, 2);
    }
}
