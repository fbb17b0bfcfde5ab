//! # erc7231-cli — Identity Binding Command-Line Interface
//!
//! Holder-side tooling for ERC-7231 identity binding. Every operation is
//! offline: no registry is contacted.
//!
//! ## Subcommands
//!
//! - `keygen` — secp256k1 key generation
//! - `digest` — canonical bytes, root, and message digest of a claims file
//! - `sign` — sign the root of a claims file
//! - `recover` — recover the signer of a root signature
//! - `verify` — check a claims file and signature against an address
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to `erc7231-core` and `erc7231-crypto`.
//! - Handlers return an exit code; errors propagate as `anyhow::Error`.

pub mod digest;
pub mod keygen;
pub mod signing;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use erc7231_core::{ClaimEncoding, DigestAlgorithm, IdentityClaim};

/// Hashing options shared by subcommands that compute roots.
#[derive(Args, Debug, Clone, Copy)]
pub struct HashingArgs {
    /// Claim encoding: `compact` or `jcs`.
    #[arg(long, env = "ERC7231_CLAIM_ENCODING", default_value = "compact")]
    pub encoding: ClaimEncoding,
    /// Digest algorithm: `keccak256` or `sha256`.
    #[arg(long, env = "ERC7231_DIGEST", default_value = "keccak256")]
    pub algorithm: DigestAlgorithm,
}

/// Read an ordered claim list from a JSON file.
///
/// Accepts either a bare array or an object with a `claims` array.
pub fn read_claims(path: &Path) -> Result<Vec<IdentityClaim>> {
    if !path.exists() {
        bail!("claims file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read claims: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse JSON: {}", path.display()))?;
    let list = match value {
        serde_json::Value::Object(mut obj) => obj
            .remove("claims")
            .with_context(|| format!("no `claims` array in {}", path.display()))?,
        other => other,
    };
    let claims: Vec<IdentityClaim> = serde_json::from_value(list)
        .with_context(|| format!("invalid claims in {}", path.display()))?;
    tracing::debug!(count = claims.len(), path = %path.display(), "claims loaded");
    Ok(claims)
}
