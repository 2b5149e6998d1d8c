//! # Error Types
//!
//! The relay-wide failure taxonomy. Every recoverable path is typed here;
//! components log and continue rather than escalate, except where a caller
//! explicitly needs the failure (see `HandlerFailure`).

use thiserror::Error;

/// Errors surfaced by the follow-request entry point.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FollowRequestError {
    /// The upstream profile lookup failed or returned no id.
    ///
    /// Surfaced to the requester; never retried by the core.
    #[error("Could not load profile for handle {handle}")]
    ProfileNotFound {
        /// The handle that failed to resolve.
        handle: String,
    },

    /// Token issuance exhausted its retry budget.
    ///
    /// Practically unreachable with an 8-hex-char token space; exists because
    /// the issuance loop is capped instead of unbounded.
    #[error("Token space exhausted after {attempts} attempts")]
    TokenSpaceExhausted {
        /// How many candidate tokens were drawn before giving up.
        attempts: u32,
    },
}

/// Errors from snapshot persistence.
///
/// A failed write is logged and the store proceeds in memory; the next
/// successful write self-heals the snapshot.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// The snapshot file could not be read or written.
    #[error("Snapshot I/O failed at {path}: {message}")]
    Io {
        /// Path of the snapshot file.
        path: String,
        /// Underlying OS error text.
        message: String,
    },

    /// The snapshot could not be encoded or decoded.
    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),
}

/// Errors from the upstream streaming transport.
///
/// Never escalates to a crash: the connection is torn down and the next
/// scheduled tick retries.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Opening the filter stream failed.
    #[error("Failed to open filter stream: {0}")]
    Connect(String),

    /// The live connection reported a hard error.
    #[error("Stream connection failed: {0}")]
    Connection(String),

    /// A profile lookup request failed at the transport level.
    #[error("Profile lookup failed: {0}")]
    Lookup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_not_found_names_the_handle() {
        let err = FollowRequestError::ProfileNotFound {
            handle: "@alice".to_string(),
        };
        assert!(err.to_string().contains("@alice"));
    }
}
