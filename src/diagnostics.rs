//! Reporting channel for failures the pipelines recover from.
//!
//! A handful of failures never reach the caller: a saliency search that
//! errors out, a stored record that no longer deserializes, a rollback that
//! could not remove its directory. They are handed to a [`Diagnostics`]
//! implementation instead of being dropped silently. Production code logs
//! them through `tracing`; tests record them and assert on what was seen.

use crate::repository::Collection;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

/// Collaborator notified about non-fatal failures.
pub trait Diagnostics: Send + Sync {
    /// The automatic top crop could not be computed; ingestion continues
    /// with an empty rectangle.
    fn saliency_failed(&self, id: Uuid, error: &dyn std::error::Error);

    /// A stored value could not be decoded and was left out of a listing.
    fn record_skipped(&self, collection: Collection, key: &[u8], error: &dyn std::error::Error);

    /// Removing a half-built record directory failed during rollback.
    fn cleanup_failed(&self, path: &Path, error: &dyn std::error::Error);
}

/// Default [`Diagnostics`]: every event becomes a `warn` log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn saliency_failed(&self, id: Uuid, error: &dyn std::error::Error) {
        tracing::warn!(%id, %error, "top crop unavailable, storing empty rectangle");
    }

    fn record_skipped(&self, collection: Collection, key: &[u8], error: &dyn std::error::Error) {
        let key = Uuid::from_slice(key)
            .map(|id| id.to_string())
            .unwrap_or_else(|_| format!("{key:02x?}"));
        tracing::warn!(%collection, %key, %error, "skipping undecodable record");
    }

    fn cleanup_failed(&self, path: &Path, error: &dyn std::error::Error) {
        tracing::warn!(path = %path.display(), %error, "rollback left files behind");
    }
}

/// One event seen by [`RecordingDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    SaliencyFailed { id: Uuid, message: String },
    RecordSkipped { collection: Collection, key: Vec<u8> },
    CleanupFailed { path: String, message: String },
}

/// [`Diagnostics`] that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.lock().clone()
    }

    fn push(&self, event: DiagnosticEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DiagnosticEvent>> {
        // A panicking test thread must not hide the events of the others
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn saliency_failed(&self, id: Uuid, error: &dyn std::error::Error) {
        self.push(DiagnosticEvent::SaliencyFailed {
            id,
            message: error.to_string(),
        });
    }

    fn record_skipped(&self, collection: Collection, key: &[u8], _error: &dyn std::error::Error) {
        self.push(DiagnosticEvent::RecordSkipped {
            collection,
            key: key.to_vec(),
        });
    }

    fn cleanup_failed(&self, path: &Path, error: &dyn std::error::Error) {
        self.push(DiagnosticEvent::CleanupFailed {
            path: path.display().to_string(),
            message: error.to_string(),
        });
    }
}
