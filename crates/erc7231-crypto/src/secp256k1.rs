//! # secp256k1 Signing and Signer Recovery
//!
//! Provides secp256k1 key generation, signing over message digests, and
//! recovery of the signing address from a 65-byte recoverable signature.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be a `&Hash256` message digest. The public entry
//!   point [`Secp256k1KeyPair::sign_root()`] applies the EIP-191 envelope
//!   itself, so a claim holder cannot accidentally sign a bare root hash.
//! - Private keys are never serialized or logged. `Secp256k1KeyPair` does
//!   not implement `Serialize`, and its `Debug` output is redacted.
//! - Recovery rejects high-s signatures. Each (message, key) pair has
//!   exactly one accepted signature encoding.
//!
//! ## Serde
//!
//! - Signatures serialize/deserialize as `0x`-prefixed hex (65 bytes,
//!   `r || s || v`, `v` ∈ {27, 28} on output, {0, 1, 27, 28} on input).

use std::fmt;
use std::str::FromStr;

use erc7231_core::{
    keccak256, message_digest, set_root_digest, Address, CryptoError, DigestAlgorithm, Hash256,
    TokenId,
};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

/// A 65-byte recoverable ECDSA signature: `r || s || v`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverableSignature(pub [u8; 65]);

/// A secp256k1 key pair for signing operations.
///
/// Does not implement `Serialize` — private keys must not be accidentally
/// serialized into logs, responses, or artifacts.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

// ---------------------------------------------------------------------------
// RecoverableSignature impls
// ---------------------------------------------------------------------------

impl RecoverableSignature {
    /// Wrap raw bytes without validation. Validation happens at recovery.
    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    /// Return the raw 65 bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// The `v` byte as stored.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Render as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse 130 hex digits, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = erc7231_core::decode_hex("signature", s)
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        let arr: [u8; 65] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::MalformedSignature(format!(
                "signature must be 65 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Split into the `k256` signature and recovery id.
    fn to_parts(self) -> Result<(Signature, RecoveryId), CryptoError> {
        let v = match self.v() {
            0 | 27 => 0,
            1 | 28 => 1,
            other => {
                return Err(CryptoError::MalformedSignature(format!(
                    "recovery byte must be 0, 1, 27 or 28, got {other}"
                )))
            }
        };
        let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| {
            CryptoError::MalformedSignature(format!("invalid recovery id {v}"))
        })?;
        let signature = Signature::from_slice(&self.0[..64])
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        if signature.normalize_s().is_some() {
            return Err(CryptoError::MalformedSignature(
                "high-s signature rejected".to_string(),
            ));
        }
        Ok((signature, recovery_id))
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({}...)", hex::encode(&self.0[..4]))
    }
}

impl FromStr for RecoverableSignature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Secp256k1KeyPair impls
// ---------------------------------------------------------------------------

impl Secp256k1KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::random(&mut csprng),
        }
    }

    /// Create a key pair from a raw 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| CryptoError::KeyError(format!("invalid secret key: {e}")))?;
        Ok(Self { signing_key })
    }

    /// Parse a secret key from 64 hex digits, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            erc7231_core::decode_hex("secret key", s)
                .map_err(|e| CryptoError::KeyError(e.to_string()))?,
        );
        let arr: Zeroizing<[u8; 32]> = Zeroizing::new(bytes.as_slice().try_into().map_err(|_| {
            CryptoError::KeyError(format!("secret key must be 32 bytes, got {}", bytes.len()))
        })?);
        Self::from_bytes(&arr)
    }

    /// Export the secret key as lowercase hex (no prefix).
    ///
    /// The returned buffer is wiped on drop.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing_key.to_bytes()))
    }

    /// The address controlled by this key pair.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a message digest directly.
    ///
    /// Prefer [`sign_root()`](Self::sign_root), which applies the EIP-191
    /// envelope. This entry point exists for callers that already hold a
    /// message digest.
    pub fn sign_digest(&self, digest: &Hash256) -> Result<RecoverableSignature, CryptoError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        // Normalize to low-s; the recovery parity flips with s.
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(RecoverableSignature(out))
    }

    /// Sign a root hash the way a claim holder does: over
    /// `message_digest(root)`.
    pub fn sign_root(
        &self,
        root: &Hash256,
        algorithm: DigestAlgorithm,
    ) -> Result<RecoverableSignature, CryptoError> {
        self.sign_digest(&message_digest(root, algorithm))
    }

    /// Authorize writing `root` to `token_id` at write nonce `nonce`.
    ///
    /// The result is only valid as a write authorization; it does not
    /// verify as a binding signature for `root`.
    pub fn sign_root_write(
        &self,
        token_id: &TokenId,
        nonce: u64,
        root: &Hash256,
        algorithm: DigestAlgorithm,
    ) -> Result<RecoverableSignature, CryptoError> {
        self.sign_digest(&set_root_digest(token_id, nonce, root, algorithm))
    }
}

impl fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1KeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// Derive the address of a public key: the last 20 bytes of the Keccak-256
/// hash of the uncompressed point without its `0x04` tag.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash.as_bytes()[12..]);
    Address(out)
}

/// Recover the address that produced `signature` over `digest`.
///
/// # Errors
///
/// Returns `CryptoError::MalformedSignature` for a bad `v`, zero or
/// out-of-range `r`/`s`, or a high-s value, and
/// `CryptoError::RecoveryFailed` when no public key matches.
pub fn recover_signer(
    digest: &Hash256,
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    let (sig, recovery_id) = signature.to_parts()?;
    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(address_of(&key))
}

/// Whether `signature` over `digest` was produced by `expected`.
pub fn verify_signer(digest: &Hash256, signature: &RecoverableSignature, expected: &Address) -> bool {
    matches!(recover_signer(digest, signature), Ok(addr) if addr == *expected)
}
