//! # Outbound Ports
//!
//! Contracts the subscription store needs from the outside world.

use relay_types::PersistenceError;

/// Full-snapshot persistence contract.
///
/// The store always writes the complete account map; there are no partial
/// updates. Backends receive the snapshot as raw JSON so a previous schema
/// version round-trips untouched until the store normalizes it on load.
pub trait SnapshotBackend: Send + Sync {
    /// Read the last written snapshot.
    ///
    /// Returns `Ok(None)` when no snapshot exists yet (first run).
    ///
    /// # Errors
    ///
    /// [`PersistenceError`] when the snapshot exists but cannot be read or
    /// parsed. Callers treat this as an empty store, not a crash.
    fn load(&self) -> Result<Option<serde_json::Value>, PersistenceError>;

    /// Replace the snapshot with `snapshot`.
    ///
    /// # Errors
    ///
    /// [`PersistenceError`] when the write fails. The store proceeds in
    /// memory; the next successful write self-heals.
    fn save(&self, snapshot: &serde_json::Value) -> Result<(), PersistenceError>;
}

impl<T: SnapshotBackend + ?Sized> SnapshotBackend for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<serde_json::Value>, PersistenceError> {
        (**self).load()
    }

    fn save(&self, snapshot: &serde_json::Value) -> Result<(), PersistenceError> {
        (**self).save(snapshot)
    }
}
