//! # erc7231-core — Foundational Types for Identity Binding
//!
//! This crate is the leaf of the workspace. It defines the value types every
//! other crate exchanges and the two hashing stages of the binding protocol.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtypes for identifiers.** `TokenId`, `Address`, `Hash256` are
//!    distinct types with validated parsers. No bare strings or byte arrays
//!    cross crate boundaries.
//!
//! 2. **`CanonicalBytes` newtype.** Every root hash flows through
//!    `ClaimEncoding::canonicalize()`. No raw `serde_json::to_vec()` for
//!    digests.
//!
//! 3. **Two-stage hashing.** `digest()` turns canonical claim bytes into a
//!    root hash; `message_digest()` wraps a root in the EIP-191 envelope
//!    before it is signed.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `erc7231-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod claim;
pub mod digest;
pub mod error;
pub mod identity;

// Re-export primary types for ergonomic imports.
pub use canonical::{CanonicalBytes, ClaimEncoding};
pub use claim::{is_well_formed_user_id, user_ids, IdentityClaim};
pub use digest::{
    digest, keccak256, message_digest, set_root_digest, DigestAlgorithm, Hash256, EIP191_PREFIX,
    SET_ROOT_DOMAIN,
};
pub use error::{CanonicalizationError, CryptoError, Erc7231Error, ParseError};
pub use identity::{Address, TokenId};

/// Strip one leading `0x`/`0X`, if present.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode hex with an optional `0x` prefix, naming `kind` in errors.
pub fn decode_hex(kind: &'static str, s: &str) -> Result<Vec<u8>, ParseError> {
    let digits = strip_hex_prefix(s.trim());
    if digits.is_empty() {
        return Err(ParseError::Empty(kind));
    }
    hex::decode(digits).map_err(|e| ParseError::InvalidHex {
        kind,
        reason: e.to_string(),
    })
}

/// Compute the root hash of an ordered claim sequence in one step.
///
/// Equivalent to `digest(&encoding.canonicalize(claims)?, algorithm)`.
pub fn claims_root(
    claims: &[IdentityClaim],
    encoding: ClaimEncoding,
    algorithm: DigestAlgorithm,
) -> Result<Hash256, CanonicalizationError> {
    let canonical = encoding.canonicalize(claims)?;
    Ok(digest(&canonical, algorithm))
}
