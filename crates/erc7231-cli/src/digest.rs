//! # Digest Subcommand
//!
//! Prints the canonical bytes, root, and message digest of a claims file.
//! The message digest is the value a holder signs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use erc7231_core::{digest, message_digest, Hash256};
use serde::Serialize;

use crate::{read_claims, HashingArgs};

/// Arguments for `erc7231 digest`.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Claims JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Digest output, printed as JSON.
#[derive(Debug, Serialize)]
pub struct DigestOutput {
    pub canonical: String,
    pub root: Hash256,
    pub message_digest: Hash256,
}

/// Compute the digest of a claims file.
pub fn compute_digest(args: &DigestArgs) -> Result<DigestOutput> {
    let claims = read_claims(&args.file)?;
    let canonical = args
        .hashing
        .encoding
        .canonicalize(&claims)
        .context("failed to canonicalize claims")?;
    let root = digest(&canonical, args.hashing.algorithm);
    Ok(DigestOutput {
        canonical: canonical.as_str().to_string(),
        root,
        message_digest: message_digest(&root, args.hashing.algorithm),
    })
}

/// Execute the digest subcommand.
pub fn run_digest(args: &DigestArgs) -> Result<u8> {
    let out = compute_digest(args)?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(0)
}
