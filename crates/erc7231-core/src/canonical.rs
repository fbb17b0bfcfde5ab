//! # Canonical Serialization — Claim Sequence Bytes
//!
//! This module defines `CanonicalBytes`, the sole construction path for
//! bytes that feed a root hash.
//!
//! ## Security Invariant
//!
//! `CanonicalBytes` has a private inner field. The only way to construct it
//! is [`ClaimEncoding::canonicalize()`], which serializes an ordered claim
//! sequence under a fixed encoding. Any function computing a root hash
//! accepts `&CanonicalBytes`, so no root can be derived from ad-hoc bytes.
//!
//! ## Encodings
//!
//! - [`ClaimEncoding::Compact`] — compact JSON array, object keys in the
//!   fixed order `userID`, `verifierUri1`, `memo`, no whitespace. This is
//!   byte-identical to `JSON.stringify(claims)` in the reference client, so
//!   roots computed by either side agree.
//! - [`ClaimEncoding::Jcs`] — RFC 8785 JSON Canonicalization Scheme via
//!   `serde_jcs`: keys sorted lexicographically, compact separators.
//!
//! Both keep array order: the sequence order is part of the commitment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::claim::IdentityClaim;
use crate::error::{CanonicalizationError, ParseError};

/// Bytes produced exclusively by claim canonicalization.
///
/// # Invariants
///
/// - The only constructor is [`ClaimEncoding::canonicalize()`].
/// - Output is UTF-8 JSON.
/// - Equal claim sequences under the same encoding yield equal bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// View the bytes as text. Canonical bytes are always valid UTF-8.
    pub fn as_str(&self) -> &str {
        // serde_json output is UTF-8; fall back to an empty view rather than panic.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The serialization rule applied to a claim sequence before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimEncoding {
    /// Declared field order, compact separators.
    #[default]
    Compact,
    /// RFC 8785 sorted-key canonical JSON.
    Jcs,
}

impl ClaimEncoding {
    /// Returns the encoding identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Jcs => "jcs",
        }
    }

    /// Serialize an ordered claim sequence into canonical bytes.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if JSON
    /// serialization fails. Claims hold only strings, so in practice this
    /// does not happen.
    pub fn canonicalize(
        &self,
        claims: &[IdentityClaim],
    ) -> Result<CanonicalBytes, CanonicalizationError> {
        let bytes = match self {
            Self::Compact => serde_json::to_vec(claims)?,
            Self::Jcs => serde_jcs::to_string(&claims)?.into_bytes(),
        };
        Ok(CanonicalBytes(bytes))
    }
}

impl fmt::Display for ClaimEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimEncoding {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "jcs" => Ok(Self::Jcs),
            other => Err(ParseError::UnknownVariant {
                kind: "claim encoding",
                value: other.to_string(),
            }),
        }
    }
}
