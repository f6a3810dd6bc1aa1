//! Random nonces for sign-in messages and WebAuthn challenges.

use rand::{Rng, distributions::Alphanumeric};

/// Number of alphanumeric characters in a generated nonce.
///
/// 17 characters drawn from a 62 symbol alphabet carry a little over 101
/// bits, which covers the 96 bits EIP-4361 asks for.
pub const NONCE_LENGTH: usize = 17;

/// Minimum length of a nonce accepted in a sign-in message.
pub const MIN_NONCE_LENGTH: usize = 8;

/// Generates a fresh alphanumeric nonce with at least 96 bits of entropy.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns `true` if `nonce` has the shape of a sign-in nonce: at least
/// [`MIN_NONCE_LENGTH`] ASCII alphanumeric characters.
pub fn is_valid_nonce(nonce: &str) -> bool {
    nonce.len() >= MIN_NONCE_LENGTH && nonce.chars().all(|c| c.is_ascii_alphanumeric())
}
