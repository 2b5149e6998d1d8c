//! # Messenger Port
//!
//! Outbound side of the relay: the messaging platform the recipients live
//! on. The runtime only depends on this trait; a real platform adapter is
//! built outside this workspace.

use async_trait::async_trait;
use relay_types::{ExternalId, LocalAccount, LocalId, MediaItem, PendingVerification};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

/// A delivery to one recipient failed.
#[derive(Debug, Clone, Error)]
#[error("Delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Outbound messaging contract.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver matched media from `author_handle` to one recipient.
    ///
    /// # Errors
    ///
    /// [`DeliveryError`] when this recipient could not be reached. Callers
    /// treat it as per-recipient and keep going.
    async fn deliver(
        &self,
        recipient: &LocalAccount,
        author_handle: &str,
        media: &[MediaItem],
    ) -> Result<(), DeliveryError>;

    /// Tell the requester their follow is verified and active.
    async fn notify_verified(&self, pending: &PendingVerification);

    /// Tell the requester the watch window is live and the token can be
    /// posted.
    async fn notify_ready(&self, pending: &PendingVerification);
}

/// Adapter that only logs.
///
/// Lets the relay run end to end without messaging credentials; useful for
/// soak-testing the stream side.
#[derive(Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn deliver(
        &self,
        recipient: &LocalAccount,
        author_handle: &str,
        media: &[MediaItem],
    ) -> Result<(), DeliveryError> {
        tracing::info!(
            recipient = %recipient.id,
            author = author_handle,
            items = media.len(),
            "Would deliver media"
        );
        Ok(())
    }

    async fn notify_verified(&self, pending: &PendingVerification) {
        tracing::info!(
            requester = %pending.requester,
            handle = %pending.handle,
            "Would notify: follow verified"
        );
    }

    async fn notify_ready(&self, pending: &PendingVerification) {
        tracing::info!(
            requester = %pending.requester,
            handle = %pending.handle,
            token = %pending.token,
            "Would notify: post the token now"
        );
    }
}

/// One recorded delivery.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Local id of the recipient.
    pub recipient: LocalId,
    /// Handle the media was attributed to.
    pub author_handle: ExternalId,
    /// The delivered media.
    pub media: Vec<MediaItem>,
}

/// Test adapter that records every call and can fail per recipient.
#[derive(Default)]
pub struct RecordingMessenger {
    deliveries: Mutex<Vec<Delivery>>,
    verified: Mutex<Vec<PendingVerification>>,
    ready: Mutex<Vec<PendingVerification>>,
    failing: Mutex<HashSet<LocalId>>,
}

impl RecordingMessenger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `recipient` fail.
    pub fn fail_delivery_for(&self, recipient: &str) {
        self.lock(&self.failing).insert(recipient.to_string());
    }

    /// All deliveries so far.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock(&self.deliveries).clone()
    }

    /// All verified-follow notifications so far.
    #[must_use]
    pub fn verified(&self) -> Vec<PendingVerification> {
        self.lock(&self.verified).clone()
    }

    /// All watch-window notifications so far.
    #[must_use]
    pub fn ready(&self) -> Vec<PendingVerification> {
        self.lock(&self.ready).clone()
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver(
        &self,
        recipient: &LocalAccount,
        author_handle: &str,
        media: &[MediaItem],
    ) -> Result<(), DeliveryError> {
        if self.lock(&self.failing).contains(&recipient.id) {
            return Err(DeliveryError(format!("recipient {} unreachable", recipient.id)));
        }
        self.lock(&self.deliveries).push(Delivery {
            recipient: recipient.id.clone(),
            author_handle: author_handle.to_string(),
            media: media.to_vec(),
        });
        Ok(())
    }

    async fn notify_verified(&self, pending: &PendingVerification) {
        self.lock(&self.verified).push(pending.clone());
    }

    async fn notify_ready(&self, pending: &PendingVerification) {
        self.lock(&self.ready).push(pending.clone());
    }
}
