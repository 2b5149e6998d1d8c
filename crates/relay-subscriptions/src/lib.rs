//! # Subscription Store
//!
//! Owns the durable mapping of local account -> followed external accounts,
//! derives the reverse index, and persists full snapshots through a pluggable
//! backend.
//!
//! ## Architecture
//!
//! - **Domain:** `SubscriptionStore` - accounts, index rebuild, normalization
//! - **Ports:** `SnapshotBackend` - full-snapshot read/write contract
//! - **Adapters:** `FileSnapshotBackend` (atomic rename), `MemorySnapshotBackend`
//!
//! ## Invariants
//!
//! - The reverse index is rebuilt in full on every follow-map change; it is
//!   never partially patched and never persisted.
//! - Session state never reaches disk and is stripped on the way in.
//! - A corrupt or missing snapshot never fails startup; the store logs and
//!   continues empty.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod ports;
pub mod store;

pub use adapters::{FileSnapshotBackend, MemorySnapshotBackend};
pub use ports::SnapshotBackend;
pub use store::{AccountPatch, SubscriptionStore};
