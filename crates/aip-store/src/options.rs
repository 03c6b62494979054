use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use aip_types::{CancellationToken, Identifier, NoopProgress, ProgressObserver, VersionId};
use serde::{Deserialize, Serialize};

use crate::lock::LockMode;

/// How a version's payload is persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLayout {
    /// Payload files are copied into the version directory.
    #[default]
    Directory,
    /// The payload is packaged as one tar per version.
    Archive,
}

/// Store-wide behavior shared by both layouts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSettings {
    /// File or directory names never ingested.
    pub excluded_names: Vec<String>,
    pub lock_mode: LockMode,
    /// Version message when a store call gives none.
    pub default_message: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            excluded_names: Vec::new(),
            lock_mode: LockMode::Blocking,
            default_message: "ingest".to_string(),
        }
    }
}

/// Per-call options for a store.
#[derive(Clone, Default)]
pub struct StoreOptions {
    /// Version message; the store's default when `None`.
    pub message: Option<String>,
    pub cancel: CancellationToken,
    pub progress: Option<Arc<dyn ProgressObserver>>,
}

impl StoreOptions {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn observer(&self) -> Arc<dyn ProgressObserver> {
        self.progress
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgress))
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("message", &self.message)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Result of a successful store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreReceipt {
    pub id: Identifier,
    pub version: VersionId,
    /// The new version directory.
    pub path: PathBuf,
    /// Payload paths written into this version.
    pub added: Vec<String>,
    /// Paths of the previous version no longer present.
    pub removed: Vec<String>,
    /// Payload paths already held by an earlier version.
    pub unchanged: Vec<String>,
}
