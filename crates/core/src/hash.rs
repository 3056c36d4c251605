//! One-way content hashing.
//!
//! Raw hardware identifiers (SIM ICCIDs, platform device ids) never leave
//! this core in the clear. Everything that crosses the wire is first passed
//! through [`hash`], a SHA-256 digest rendered as lowercase hex.

use sha2::{Digest, Sha256};

/// SHA-256 of the empty input, as produced by [`hash`] for `b""`.
pub const EMPTY_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Hash arbitrary bytes to a lowercase hex SHA-256 digest.
///
/// Deterministic and infallible. Empty input is valid and yields
/// [`EMPTY_HASH`].
pub fn hash(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

/// Convenience wrapper for string inputs.
pub fn hash_str(input: &str) -> String {
    hash(input.as_bytes())
}
