//! # Shared Types Crate
//!
//! Domain entities and the error taxonomy shared across the stream-relay
//! subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-crate types live here and nowhere else.
//! - **Opaque passthrough**: the raw platform profile is carried as
//!   `serde_json::Value` and never interpreted by the core.
//! - **No global state**: every lookup table in the legacy design is an owned
//!   field of its component; this crate only defines the data they hold.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
