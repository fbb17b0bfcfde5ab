//! # erc7231-crypto — Cryptographic Primitives
//!
//! Provides the signing side of identity binding:
//!
//! - **secp256k1** key pairs, 65-byte recoverable signatures, and signer
//!   recovery over EIP-191 message digests.
//! - **Address derivation** from public keys (Keccak-256, last 20 bytes).
//! - The [`SignatureVerifier`] seam the binding verifier consumes.
//!
//! ## Crate Policy
//!
//! - Depends only on `erc7231-core` internally.
//! - No hand-rolled curve arithmetic; all ECDSA goes through `k256`.
//! - No mocking of cryptographic operations in tests — all tests use real
//!   keys, real Keccak-256, real recovery.

pub mod secp256k1;
pub mod verifier;

pub use secp256k1::{address_of, recover_signer, verify_signer, RecoverableSignature, Secp256k1KeyPair};
pub use verifier::{Secp256k1Recovery, SignatureVerifier};
