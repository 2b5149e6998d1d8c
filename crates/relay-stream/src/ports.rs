//! # Outbound Ports
//!
//! The content-platform client contract the stream manager drives. The real
//! HTTP/streaming transport lives outside this workspace; in-tree adapters
//! are no-op and scripted implementations.

use async_trait::async_trait;
use relay_types::{ContentItem, ExternalId, TransportError};
use std::pin::Pin;
use tokio_stream::Stream;

/// A resolved platform profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Stable external account id.
    pub id: ExternalId,
    /// Canonical handle, without the `@` prefix.
    pub handle: String,
}

/// Signals emitted by a live filter stream.
#[derive(Debug)]
pub enum StreamSignal {
    /// A post from one of the observed accounts.
    Item(ContentItem),
    /// The transport closed the connection without an error. Inside the
    /// post-connect grace window this is treated as noise.
    End,
    /// Hard transport failure; the connection is dead.
    Error(TransportError),
}

/// The signal sequence of one connection. Dropping it closes the stream.
pub type SignalStream = Pin<Box<dyn Stream<Item = StreamSignal> + Send>>;

/// Client contract for the content-streaming platform.
#[async_trait]
pub trait ContentPlatform: Send + Sync {
    /// Resolve a handle to a profile.
    ///
    /// Returns `Ok(None)` when the platform knows no such account.
    ///
    /// # Errors
    ///
    /// [`TransportError`] on request failure. Callers fold both cases into
    /// `ProfileNotFound` for the requester.
    async fn lookup_profile(&self, handle: &str) -> Result<Option<Profile>, TransportError>;

    /// Open a filter stream observing `follow_ids`.
    ///
    /// # Errors
    ///
    /// [`TransportError`] when the connection cannot be established.
    async fn open_filter_stream(
        &self,
        follow_ids: &[ExternalId],
    ) -> Result<SignalStream, TransportError>;
}
