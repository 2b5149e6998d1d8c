//! # Relay Events
//!
//! Defines every event that flows through the bus and the topic key used
//! for handler registration.

use relay_types::{ExternalId, MediaItem, PendingVerification};

/// All events that can be published to the event bus.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    // =========================================================================
    // SUBSCRIPTION STORE
    // =========================================================================
    /// The set of followed external accounts changed.
    ///
    /// Carries the full current list of followed external ids; the stream
    /// manager recomputes its desired follow-set from it.
    FollowSetChanged(Vec<ExternalId>),

    // =========================================================================
    // STREAM MANAGER
    // =========================================================================
    /// An ownership-verification token was seen in a post from the claimed
    /// account. The subscription store adds the follow; the messaging
    /// adapter notifies the requester.
    FollowVerified(PendingVerification),

    /// The live connection now observes a pending verification target.
    ///
    /// Tells the requester the watch window is open and the token can be
    /// posted. Dispatched once per challenge, after the reconnect that
    /// picked the target up.
    VerificationReady(PendingVerification),

    /// A followed account posted keyword-matching content with media.
    NewContent {
        /// External id of the author.
        author_id: ExternalId,
        /// Extracted media; never empty (text-only posts are not delivered).
        media: Vec<MediaItem>,
    },
}

impl RelayEvent {
    /// The topic handlers register under to receive this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::FollowSetChanged(_) => EventTopic::FollowSetChanged,
            Self::FollowVerified(_) => EventTopic::FollowVerified,
            Self::VerificationReady(_) => EventTopic::VerificationReady,
            Self::NewContent { .. } => EventTopic::NewContent,
        }
    }
}

/// Topic key for handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    /// See [`RelayEvent::FollowSetChanged`].
    FollowSetChanged,
    /// See [`RelayEvent::FollowVerified`].
    FollowVerified,
    /// See [`RelayEvent::VerificationReady`].
    VerificationReady,
    /// See [`RelayEvent::NewContent`].
    NewContent,
}
