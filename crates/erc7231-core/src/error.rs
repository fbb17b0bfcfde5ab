//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types shared by every crate in the workspace. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Parse errors name the kind of value and the offending input length
//!   or character, never the full input (it may be a key).
//! - Cryptographic errors fail loudly with full context at the library
//!   boundary. The binding verifier folds them into a plain `false`.

use thiserror::Error;

/// Top-level error type for the identity-binding stack.
#[derive(Error, Debug)]
pub enum Erc7231Error {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A textual value could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Error during canonical serialization of a claim sequence.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error parsing a hex or decimal representation of a domain value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was not valid hex.
    #[error("invalid hex for {kind}: {reason}")]
    InvalidHex {
        /// What was being parsed (e.g. "address").
        kind: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// Input decoded to the wrong number of bytes.
    #[error("{kind} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// What was being parsed.
        kind: &'static str,
        /// Required byte length.
        expected: usize,
        /// Decoded byte length.
        actual: usize,
    },

    /// Decimal input contained a non-digit character.
    #[error("invalid decimal digit {0:?} in token id")]
    InvalidDigit(char),

    /// Value does not fit in 256 bits.
    #[error("token id exceeds 256 bits")]
    Overflow,

    /// Input was empty.
    #[error("empty {0}")]
    Empty(&'static str),

    /// Mixed-case address whose EIP-55 checksum does not match.
    #[error("address checksum mismatch")]
    BadChecksum,

    /// Unknown enumeration name.
    #[error("unknown {kind} {value:?}")]
    UnknownVariant {
        /// Enumeration being parsed.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature bytes are malformed or not canonical.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Public key recovery failed.
    #[error("signer recovery failed: {0}")]
    RecoveryFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}
