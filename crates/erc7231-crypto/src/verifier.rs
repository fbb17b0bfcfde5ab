//! # Signature Verifier Seam
//!
//! The binding verifier consumes signer recovery through the
//! [`SignatureVerifier`] trait so the registry never names a curve.
//! [`Secp256k1Recovery`] is the production implementation.

use erc7231_core::{Address, CryptoError, Hash256};

use crate::secp256k1::{recover_signer, RecoverableSignature};

/// Recovers the address that signed a message digest.
pub trait SignatureVerifier: Send + Sync {
    /// Recover the signer of `signature` over `message`.
    fn recover_signer(
        &self,
        message: &Hash256,
        signature: &RecoverableSignature,
    ) -> Result<Address, CryptoError>;

    /// Whether `signature` over `message` recovers to `expected`.
    fn verify(&self, message: &Hash256, signature: &RecoverableSignature, expected: &Address) -> bool {
        matches!(self.recover_signer(message, signature), Ok(addr) if addr == *expected)
    }
}

/// ECDSA over secp256k1 with public-key recovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Recovery;

impl SignatureVerifier for Secp256k1Recovery {
    fn recover_signer(
        &self,
        message: &Hash256,
        signature: &RecoverableSignature,
    ) -> Result<Address, CryptoError> {
        recover_signer(message, signature)
    }
}
