//! # Verification Registry
//!
//! Tracks outstanding "prove you own external account X" challenges.
//!
//! The handshake: a local account asks to follow an external account; the
//! registry issues a short random hex token; the claimed owner posts that
//! token publicly; the stream manager sees the post and consumes the
//! challenge. Pure in-memory state machine - nothing here survives restart,
//! which is fine because an unfinished challenge can simply be requested
//! again.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod registry;
pub mod token;

pub use registry::VerificationRegistry;
pub use token::{issue_token, MAX_TOKEN_ATTEMPTS, TOKEN_BYTES};
