//! # Keygen Subcommand
//!
//! Generates a secp256k1 key pair and writes `{prefix}.key` (hex secret)
//! and `{prefix}.addr` (checksummed address).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use erc7231_core::TokenId;
use erc7231_crypto::Secp256k1KeyPair;

/// Arguments for `erc7231 keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "erc7231")]
    pub prefix: String,
}

/// Execute the keygen subcommand.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    cmd_keygen(&args.output, &args.prefix)
}

fn cmd_keygen(output_dir: &Path, prefix: &str) -> Result<u8> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let keypair = Secp256k1KeyPair::generate();
    let address = keypair.address();

    let key_path = output_dir.join(format!("{prefix}.key"));
    let addr_path = output_dir.join(format!("{prefix}.addr"));

    std::fs::write(&key_path, keypair.secret_hex().as_bytes())
        .with_context(|| format!("failed to write private key: {}", key_path.display()))?;
    std::fs::write(&addr_path, address.to_string())
        .with_context(|| format!("failed to write address: {}", addr_path.display()))?;

    tracing::info!(%address, "generated secp256k1 key pair");
    println!("OK: generated secp256k1 key pair");
    println!("  Private key: {}", key_path.display());
    println!("  Address:     {address}");
    println!("  Token id:    {}", TokenId::from_owner(&address));

    Ok(0)
}
