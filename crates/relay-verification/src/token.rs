//! # Token Issuance
//!
//! Short random hex tokens, unique among currently pending challenges.

use rand::RngCore;
use relay_types::FollowRequestError;
use std::collections::HashSet;

/// Random bytes per token; hex-encodes to 8 characters.
pub const TOKEN_BYTES: usize = 4;

/// Safety cap on issuance retries.
///
/// With 2^32 possible tokens and a handful pending at any time, a single
/// retry is already rare; the cap only guards against a broken RNG.
pub const MAX_TOKEN_ATTEMPTS: u32 = 1000;

/// Issue a token colliding with none of `existing`.
///
/// Uniqueness is scoped to currently pending tokens, not historical ones.
///
/// # Errors
///
/// [`FollowRequestError::TokenSpaceExhausted`] after [`MAX_TOKEN_ATTEMPTS`]
/// collisions.
pub fn issue_token(existing: &HashSet<String>) -> Result<String, FollowRequestError> {
    issue_token_with(existing, &mut rand::thread_rng())
}

pub(crate) fn issue_token_with<R: RngCore>(
    existing: &HashSet<String>,
    rng: &mut R,
) -> Result<String, FollowRequestError> {
    for _ in 0..MAX_TOKEN_ATTEMPTS {
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        if !existing.contains(&token) {
            return Ok(token);
        }
    }
    Err(FollowRequestError::TokenSpaceExhausted {
        attempts: MAX_TOKEN_ATTEMPTS,
    })
}
