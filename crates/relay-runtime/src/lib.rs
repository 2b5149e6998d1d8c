//! # Relay Runtime
//!
//! Composition root for the stream relay.
//!
//! ## Modular Structure
//!
//! - `config` - environment/file configuration with startup validation
//! - `messenger` - outbound messaging port plus in-tree adapters
//! - `wiring` - event handler registration connecting the components
//! - `runtime` - process lifecycle: startup, ticker, graceful shutdown
//!
//! ## Event Flow
//!
//! ```text
//! StreamManager ──FollowVerified────▶ SubscriptionStore.add_follow
//!       │                        └──▶ Messenger.notify_verified
//!       ├───────VerificationReady───▶ Messenger.notify_ready
//!       └───────NewContent──────────▶ Messenger.deliver (per follower)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod messenger;
pub mod runtime;
pub mod wiring;

pub use config::{ConfigError, RelayConfig};
pub use messenger::{DeliveryError, LogMessenger, Messenger, RecordingMessenger};
pub use runtime::RelayRuntime;
