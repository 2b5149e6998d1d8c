//! # Snapshot Backends
//!
//! Concrete [`SnapshotBackend`] implementations: a file-backed adapter for
//! production and an in-memory adapter for tests.

use crate::ports::SnapshotBackend;
use relay_types::PersistenceError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// File-backed snapshot store.
///
/// Writes pretty-printed JSON atomically via a temp file and rename, so a
/// crash mid-write never leaves a truncated snapshot behind.
pub struct FileSnapshotBackend {
    path: PathBuf,
}

impl FileSnapshotBackend {
    /// Create a backend writing to `path`. Parent directories are created
    /// on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        if let Ok(metadata) = std::fs::metadata(&path) {
            info!(path = %path.display(), bytes = metadata.len(), "Found existing snapshot");
        } else {
            info!(path = %path.display(), "No existing snapshot");
        }
        Self { path }
    }

    fn io_error(&self, e: &std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

impl SnapshotBackend for FileSnapshotBackend {
    fn load(&self) -> Result<Option<serde_json::Value>, PersistenceError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(&e)),
        };
        let value = serde_json::from_str(&raw)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        Ok(Some(value))
    }

    fn save(&self, snapshot: &serde_json::Value) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(&e))?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(|e| self.io_error(&e))?;
        file.write_all(&bytes).map_err(|e| self.io_error(&e))?;
        file.sync_all().map_err(|e| self.io_error(&e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(&e))?;

        Ok(())
    }
}

/// In-memory snapshot store for tests.
#[derive(Default)]
pub struct MemorySnapshotBackend {
    snapshot: Mutex<Option<serde_json::Value>>,
}

impl MemorySnapshotBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-seeded with a snapshot, as if a previous process
    /// had written it.
    #[must_use]
    pub fn seeded(snapshot: serde_json::Value) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    /// The last saved snapshot, if any.
    #[must_use]
    pub fn last_saved(&self) -> Option<serde_json::Value> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SnapshotBackend for MemorySnapshotBackend {
    fn load(&self) -> Result<Option<serde_json::Value>, PersistenceError> {
        Ok(self.last_saved())
    }

    fn save(&self, snapshot: &serde_json::Value) -> Result<(), PersistenceError> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        Ok(())
    }
}
