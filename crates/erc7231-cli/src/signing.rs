//! # Signing Subcommands
//!
//! Root signing, signer recovery, and offline binding checks.
//!
//! ## Security Invariant
//!
//! A holder never signs claim bytes or a bare root. `sign` always signs the
//! EIP-191 message digest of the root computed from canonical claim bytes,
//! which is exactly what the registry verifier recovers from. With
//! `--token-id`, it also signs the single-use write authorization for that
//! token and `--nonce`, which is a different digest.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use erc7231_core::{claims_root, message_digest, Address, DigestAlgorithm, Hash256, TokenId};
use erc7231_crypto::{recover_signer, RecoverableSignature, Secp256k1KeyPair};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::{read_claims, HashingArgs};

/// Arguments for `erc7231 sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Path to the private key file (hex-encoded 32-byte key).
    #[arg(long)]
    pub key: PathBuf,
    /// Claims JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Also authorize writing the root to this token (decimal or 0x-hex).
    #[arg(long)]
    pub token_id: Option<TokenId>,
    /// The token's current write nonce, used with `--token-id`.
    #[arg(long, default_value_t = 0, requires = "token_id")]
    pub nonce: u64,
    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Arguments for `erc7231 recover`.
#[derive(Args, Debug)]
pub struct RecoverArgs {
    /// Root hash that was signed (0x-hex).
    #[arg(long)]
    pub root: Hash256,
    /// 65-byte signature (0x-hex).
    #[arg(long)]
    pub signature: RecoverableSignature,
    /// Digest algorithm of the message envelope.
    #[arg(long, env = "ERC7231_DIGEST", default_value = "keccak256")]
    pub algorithm: DigestAlgorithm,
}

/// Arguments for `erc7231 verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Address expected to have signed.
    #[arg(long)]
    pub address: Address,
    /// 65-byte signature (0x-hex).
    #[arg(long)]
    pub signature: RecoverableSignature,
    /// Root the claims must hash to, e.g. the one read from the registry.
    #[arg(long)]
    pub root: Option<Hash256>,
    /// Claims JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Output of `erc7231 sign`, printed as JSON.
#[derive(Debug, Serialize)]
pub struct SignOutput {
    pub signer: Address,
    pub root: Hash256,
    pub signature: RecoverableSignature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteAuthorization>,
}

/// Signed authorization to write a root to one token at one nonce.
#[derive(Debug, Serialize)]
pub struct WriteAuthorization {
    pub token_id: TokenId,
    pub nonce: u64,
    pub signature: RecoverableSignature,
}

/// Execute the sign subcommand.
pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let write = args.token_id.map(|token_id| (token_id, args.nonce));
    let out = cmd_sign(&args.key, &args.file, write, args.hashing)?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(0)
}

/// Execute the recover subcommand.
pub fn run_recover(args: &RecoverArgs) -> Result<u8> {
    let message = message_digest(&args.root, args.algorithm);
    let signer = recover_signer(&message, &args.signature)
        .map_err(|e| anyhow!("signer recovery failed: {e}"))?;
    println!("{signer}");
    Ok(0)
}

/// Execute the verify subcommand. Exit code 0 when valid, 1 otherwise.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    match check_binding(args)? {
        Ok(()) => {
            println!("OK: signature binds the claims to {}", args.address);
            Ok(0)
        }
        Err(reason) => {
            println!("FAIL: {reason}");
            Ok(1)
        }
    }
}

fn load_keypair(path: &Path) -> Result<Secp256k1KeyPair> {
    if !path.exists() {
        bail!("private key file not found: {}", path.display());
    }
    let hex = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read private key: {}", path.display()))?,
    );
    Secp256k1KeyPair::from_hex(hex.trim()).map_err(|e| anyhow!("invalid private key: {e}"))
}

fn cmd_sign(
    key_path: &Path,
    claims_path: &Path,
    write: Option<(TokenId, u64)>,
    hashing: HashingArgs,
) -> Result<SignOutput> {
    let keypair = load_keypair(key_path)?;
    let claims = read_claims(claims_path)?;
    let root = claims_root(&claims, hashing.encoding, hashing.algorithm)
        .context("failed to canonicalize claims")?;
    let signature = keypair
        .sign_root(&root, hashing.algorithm)
        .map_err(|e| anyhow!("signing failed: {e}"))?;
    let write = match write {
        Some((token_id, nonce)) => {
            let signature = keypair
                .sign_root_write(&token_id, nonce, &root, hashing.algorithm)
                .map_err(|e| anyhow!("signing write authorization failed: {e}"))?;
            Some(WriteAuthorization {
                token_id,
                nonce,
                signature,
            })
        }
        None => None,
    };
    tracing::info!(signer = %keypair.address(), %root, write = write.is_some(), "signed identities root");
    Ok(SignOutput {
        signer: keypair.address(),
        root,
        signature,
        write,
    })
}

/// Outer error: the inputs could not be read. Inner error: the binding
/// does not hold, with a reason for the operator.
fn check_binding(args: &VerifyArgs) -> Result<std::result::Result<(), String>> {
    let claims = read_claims(&args.file)?;
    if claims.is_empty() {
        return Ok(Err("claims file is empty".into()));
    }
    let root = claims_root(&claims, args.hashing.encoding, args.hashing.algorithm)
        .context("failed to canonicalize claims")?;
    if let Some(expected) = args.root {
        if expected != root {
            return Ok(Err(format!("claims hash to {root}, expected {expected}")));
        }
    }
    let message = message_digest(&root, args.hashing.algorithm);
    match recover_signer(&message, &args.signature) {
        Ok(signer) if signer == args.address => Ok(Ok(())),
        Ok(signer) => Ok(Err(format!("signed by {signer}, not {}", args.address))),
        Err(e) => Ok(Err(format!("signature invalid: {e}"))),
    }
}
