//! # Claim Digests — Root Hashes and Signable Message Digests
//!
//! Defines [`Hash256`] and the two hashing stages of the binding protocol:
//!
//! 1. [`digest()`] hashes the canonical bytes of a claim sequence. The
//!    result is the *root hash* committed per token.
//! 2. [`message_digest()`] wraps a root hash in the EIP-191 personal-message
//!    envelope (`"\x19Ethereum Signed Message:\n32" || root`) and hashes it
//!    again. Signatures are always produced over this second digest, so a
//!    root hash can never be replayed as some other signed payload.
//!
//! A third digest, [`set_root_digest()`], authorizes a root *write*. It binds
//! the root to one token and one write nonce under the
//! [`SET_ROOT_DOMAIN`] tag before the EIP-191 envelope, so a binding
//! signature handed to verifiers can never be submitted as a write, and a
//! write signature is spent once the nonce advances.
//!
//! ## Security Invariant
//!
//! `digest()` accepts only `&CanonicalBytes`. Every root hash in the system
//! is therefore computed through the canonicalization pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::canonical::CanonicalBytes;
use crate::error::ParseError;
use crate::identity::TokenId;

/// EIP-191 version `0x45` prefix for a 32-byte message.
pub const EIP191_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Domain tag prefixed to every root-write authorization.
pub const SET_ROOT_DOMAIN: &[u8] = b"ERC7231:setIdentitiesRoot:v1";

/// A 32-byte digest.
///
/// Serializes as a `0x`-prefixed lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash, used on the wire where "no root" must be spelled out.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wrap raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Render as lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex digits, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let bytes = crate::decode_hex("hash", s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseError::InvalidLength {
                kind: "hash",
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256(0x{})", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The hash function used for root hashes and message digests.
///
/// Keccak-256 is the default and matches the EVM reference contract and
/// client. SHA-256 is available for deployments that anchor roots outside
/// an EVM chain. Address derivation is always Keccak-256 regardless of
/// this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// Keccak-256 (pre-standard SHA-3 padding), as used by the EVM.
    #[default]
    Keccak256,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keccak256 => "keccak256",
            Self::Sha256 => "sha256",
        }
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Hash256 {
        let mut out = [0u8; 32];
        match self {
            Self::Keccak256 => {
                let mut hasher = Keccak256::new();
                for part in parts {
                    hasher.update(part);
                }
                out.copy_from_slice(&hasher.finalize());
            }
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                for part in parts {
                    hasher.update(part);
                }
                out.copy_from_slice(&hasher.finalize());
            }
        }
        Hash256(out)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keccak256" | "keccak" => Ok(Self::Keccak256),
            "sha256" => Ok(Self::Sha256),
            other => Err(ParseError::UnknownVariant {
                kind: "digest algorithm",
                value: other.to_string(),
            }),
        }
    }
}

/// Hash the canonical bytes of a claim sequence into a root hash.
pub fn digest(data: &CanonicalBytes, algorithm: DigestAlgorithm) -> Hash256 {
    algorithm.hash_parts(&[data.as_bytes()])
}

/// Wrap a root hash in the EIP-191 envelope and hash it.
///
/// This is the value a claim holder signs and the value the verifier
/// recovers the signer from.
pub fn message_digest(root: &Hash256, algorithm: DigestAlgorithm) -> Hash256 {
    algorithm.hash_parts(&[EIP191_PREFIX, root.as_bytes()])
}

/// The digest a controller signs to authorize writing `root` to `token_id`.
///
/// `H(SET_ROOT_DOMAIN || token_id (32 bytes BE) || nonce (8 bytes BE) || root)`,
/// wrapped in the EIP-191 envelope.
pub fn set_root_digest(
    token_id: &TokenId,
    nonce: u64,
    root: &Hash256,
    algorithm: DigestAlgorithm,
) -> Hash256 {
    let authorization = algorithm.hash_parts(&[
        SET_ROOT_DOMAIN,
        &token_id.to_be_bytes(),
        &nonce.to_be_bytes(),
        root.as_bytes(),
    ]);
    message_digest(&authorization, algorithm)
}

/// Keccak-256 over arbitrary bytes.
///
/// Used for address derivation and token id derivation, which hash public
/// keys and addresses rather than claim content.
pub fn keccak256(data: &[u8]) -> Hash256 {
    DigestAlgorithm::Keccak256.hash_parts(&[data])
}
