//! # Stream-Relay Test Suite
//!
//! Unified test crate for cross-crate flows that no single crate can cover
//! alone.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── end_to_end.rs   # Follow handshake and delivery choreography
//!     └── lifecycle.rs    # Startup, restart, and shutdown persistence
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo test -p relay-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
