//! # Content-Platform Adapters
//!
//! In-tree implementations of the [`ContentPlatform`] port: a no-op adapter
//! for wiring without upstream credentials and a scripted adapter driven by
//! tests.

use crate::ports::{ContentPlatform, Profile, SignalStream, StreamSignal};
use async_trait::async_trait;
use relay_types::{ContentItem, ExternalId, TransportError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Adapter that resolves nothing and opens streams that never emit.
///
/// Lets the runtime come up without upstream credentials; every follow
/// request fails with `ProfileNotFound`.
#[derive(Default)]
pub struct NoOpContentPlatform;

#[async_trait]
impl ContentPlatform for NoOpContentPlatform {
    async fn lookup_profile(&self, _handle: &str) -> Result<Option<Profile>, TransportError> {
        Ok(None)
    }

    async fn open_filter_stream(
        &self,
        _follow_ids: &[ExternalId],
    ) -> Result<SignalStream, TransportError> {
        Ok(Box::pin(tokio_stream::pending()))
    }
}

/// One connection opened against the scripted platform.
///
/// Tests keep a handle to emit signals into the live stream.
pub struct ScriptedConnection {
    /// The follow-set the connection was opened with, sorted.
    pub follow_ids: Vec<ExternalId>,
    sender: mpsc::UnboundedSender<StreamSignal>,
}

impl ScriptedConnection {
    /// Emit a post into the stream.
    pub fn emit_item(&self, item: ContentItem) {
        let _ = self.sender.send(StreamSignal::Item(item));
    }

    /// Emit a soft "connection ended" signal.
    pub fn emit_end(&self) {
        let _ = self.sender.send(StreamSignal::End);
    }

    /// Emit a hard transport error.
    pub fn emit_error(&self, error: TransportError) {
        let _ = self.sender.send(StreamSignal::Error(error));
    }
}

/// Scripted platform for tests: profiles are pre-registered, connections are
/// recorded, and their streams are fed by the test.
#[derive(Default)]
pub struct ScriptedContentPlatform {
    profiles: Mutex<HashMap<String, Profile>>,
    connections: Mutex<Vec<Arc<ScriptedConnection>>>,
    fail_next_connect: AtomicBool,
}

impl ScriptedContentPlatform {
    /// Create a platform with no known profiles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolvable profile. `handle` is matched without `@`.
    pub fn add_profile(&self, handle: &str, id: &str) {
        self.profiles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                handle.to_string(),
                Profile {
                    id: id.to_string(),
                    handle: handle.to_string(),
                },
            );
    }

    /// Make the next `open_filter_stream` call fail.
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.store(true, Ordering::SeqCst);
    }

    /// How many connections have been opened so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// The most recently opened connection.
    #[must_use]
    pub fn last_connection(&self) -> Option<Arc<ScriptedConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl ContentPlatform for ScriptedContentPlatform {
    async fn lookup_profile(&self, handle: &str) -> Result<Option<Profile>, TransportError> {
        Ok(self
            .profiles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(handle)
            .cloned())
    }

    async fn open_filter_stream(
        &self,
        follow_ids: &[ExternalId],
    ) -> Result<SignalStream, TransportError> {
        if self.fail_next_connect.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Connect("scripted failure".to_string()));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(ScriptedConnection {
                follow_ids: follow_ids.to_vec(),
                sender,
            }));
        Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
    }
}
