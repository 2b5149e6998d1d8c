//! # Pending-Challenge Registry
//!
//! One outstanding challenge per external account, consumed exactly once.

use crate::token::issue_token;
use relay_types::{ExternalId, FollowRequestError, PendingVerification};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, info};

struct Entry {
    verification: PendingVerification,
    /// Whether the requester has been told the watch window is live.
    /// Reset on overwrite so a fresh token is announced again.
    notified: bool,
}

/// In-memory registry of pending ownership-verification challenges.
#[derive(Default)]
pub struct VerificationRegistry {
    pending: Mutex<HashMap<ExternalId, Entry>>,
}

impl VerificationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the challenge for `external_id` with a freshly
    /// issued token.
    ///
    /// Concurrent requests for the same account are not serialized: the last
    /// call wins and its token is the only one that verifies.
    ///
    /// # Errors
    ///
    /// [`FollowRequestError::TokenSpaceExhausted`] if issuance hits its
    /// retry cap.
    pub fn request_verification(
        &self,
        external_id: &str,
        handle: &str,
        requester: &str,
    ) -> Result<PendingVerification, FollowRequestError> {
        let mut pending = self.lock();
        let existing = pending
            .values()
            .map(|entry| entry.verification.token.clone())
            .collect();
        let token = issue_token(&existing)?;

        let verification = PendingVerification {
            external_id: external_id.to_string(),
            handle: handle.to_string(),
            token,
            requester: requester.to_string(),
            created_at: SystemTime::now(),
        };
        info!(external_id, handle, requester, "Verification requested");
        pending.insert(
            external_id.to_string(),
            Entry {
                verification: verification.clone(),
                notified: false,
            },
        );
        Ok(verification)
    }

    /// Consume the challenge for `external_id` if its token appears as a
    /// whole whitespace-delimited token in `text` (case-insensitive).
    ///
    /// One-shot: a match removes the entry; a miss leaves it pending.
    /// Substring matches without token boundaries do not count.
    pub fn try_consume(&self, external_id: &str, text: &str) -> Option<PendingVerification> {
        let mut pending = self.lock();
        let token = pending.get(external_id)?.verification.token.clone();
        let matched = text
            .to_lowercase()
            .split_whitespace()
            .any(|word| word == token);
        if !matched {
            debug!(external_id, "Post from pending account without token");
            return None;
        }
        let entry = pending.remove(external_id)?;
        info!(
            external_id,
            handle = %entry.verification.handle,
            "Ownership verified"
        );
        Some(entry.verification)
    }

    /// External ids with an outstanding challenge.
    ///
    /// These must be observed by the stream connection so their proof post
    /// can be seen.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<ExternalId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Challenges whose requester has not yet been told the watch window is
    /// live. Marks them notified; each challenge is returned at most once.
    #[must_use]
    pub fn take_unnotified(&self) -> Vec<PendingVerification> {
        let mut pending = self.lock();
        let mut fresh: Vec<_> = pending
            .values_mut()
            .filter(|entry| !entry.notified)
            .map(|entry| {
                entry.notified = true;
                entry.verification.clone()
            })
            .collect();
        fresh.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        fresh
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ExternalId, Entry>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
