//! # Core Domain Entities
//!
//! Defines the entities that flow between the relay subsystems.
//!
//! ## Clusters
//!
//! - **Accounts**: `LocalAccount` (messaging-platform recipient)
//! - **Verification**: `PendingVerification` (ownership challenge)
//! - **Content**: `ContentItem`, `MediaAttachment`, `MediaItem`, `VideoVariant`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Identifier of an account on the content-streaming platform.
pub type ExternalId = String;

/// Identifier of a recipient on the messaging platform.
pub type LocalId = String;

// =============================================================================
// CLUSTER A: ACCOUNTS
// =============================================================================

/// A recipient on the messaging platform.
///
/// Created on first inbound interaction, mutated when a follow is verified,
/// never deleted. The `session` map is transient scratch space for the
/// messaging adapter and is stripped from the persisted snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalAccount {
    /// Opaque account id (messaging-platform native id as a string).
    pub id: LocalId,
    /// Display name; defaults to `#<id>` when the platform supplies none.
    pub name: String,
    /// Verified follows: external-account id -> display handle.
    ///
    /// `BTreeMap` keeps snapshot output stable across saves.
    pub follows: BTreeMap<ExternalId, String>,
    /// Raw platform profile, carried as an opaque blob.
    pub raw_profile: serde_json::Value,
    /// Per-session state; cleared on restart, never persisted.
    #[serde(skip)]
    pub session: BTreeMap<String, String>,
}

impl LocalAccount {
    /// Create an account with defaults for the given id.
    #[must_use]
    pub fn new(id: impl Into<LocalId>) -> Self {
        let id = id.into();
        Self {
            name: format!("#{id}"),
            id,
            follows: BTreeMap::new(),
            raw_profile: serde_json::Value::Null,
            session: BTreeMap::new(),
        }
    }
}

// =============================================================================
// CLUSTER B: VERIFICATION
// =============================================================================

/// One outstanding "prove you own external account X" challenge.
///
/// At most one exists per external id; a new request overwrites the prior
/// one. Destroyed when the token is seen in a post from that account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    /// The external account being claimed.
    pub external_id: ExternalId,
    /// Display handle of that account (e.g. `@alice`).
    pub handle: String,
    /// Short random hex token the owner must post publicly.
    pub token: String,
    /// The local account that requested the follow.
    pub requester: LocalId,
    /// When the challenge was issued. Retained as an expiry extension point;
    /// no sweeper prunes by age today.
    pub created_at: SystemTime,
}

// =============================================================================
// CLUSTER C: CONTENT
// =============================================================================

/// A single post received from the live content stream.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentItem {
    /// External id of the author.
    pub author_id: ExternalId,
    /// Full post text.
    pub text: String,
    /// Attached media descriptors, in post order.
    pub media: Vec<MediaAttachment>,
}

/// A media element attached to a post, as described by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAttachment {
    /// Platform media kind (`photo`, `video`, ...).
    pub kind: MediaKind,
    /// Original high-resolution still URL; doubles as the video thumbnail.
    pub preview_url: String,
    /// Encoded variants; present for videos only.
    pub variants: Vec<VideoVariant>,
}

/// Platform media kinds the relay understands.
///
/// Unknown kinds (animated stickers, polls, ...) are dropped at extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A still image.
    Photo,
    /// A video with one or more encoded variants.
    Video,
    /// Anything the relay does not deliver.
    Other,
}

/// One encoding of a video element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoVariant {
    /// MIME content type, e.g. `video/mp4`.
    pub content_type: String,
    /// Declared bitrate in bits per second; absent for streaming manifests.
    pub bitrate: Option<u64>,
    /// Direct URL of this variant.
    pub url: String,
}

/// A media reference ready for delivery to recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaItem {
    /// A photo, passed through at original resolution.
    Photo {
        /// Direct image URL.
        url: String,
    },
    /// The best available encoding of a video.
    Video {
        /// Direct video URL (highest-bitrate qualifying variant).
        url: String,
        /// Preview image shown before playback.
        thumbnail_url: String,
    },
}
