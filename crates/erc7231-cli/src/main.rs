//! # erc7231 CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use erc7231_cli::digest::{run_digest, DigestArgs};
use erc7231_cli::keygen::{run_keygen, KeygenArgs};
use erc7231_cli::signing::{run_recover, run_sign, run_verify, RecoverArgs, SignArgs, VerifyArgs};

/// ERC-7231 identity binding toolkit.
///
/// Generates holder keys, computes claim roots, signs them, and checks
/// bindings offline.
#[derive(Parser, Debug)]
#[command(name = "erc7231", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a secp256k1 key pair.
    Keygen(KeygenArgs),

    /// Print the canonical bytes, root, and message digest of a claims file.
    Digest(DigestArgs),

    /// Sign the root of a claims file.
    Sign(SignArgs),

    /// Recover the signer of a root signature.
    Recover(RecoverArgs),

    /// Check that a signature binds a claims file to an address.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Digest(args) => run_digest(&args),
        Commands::Sign(args) => run_sign(&args),
        Commands::Recover(args) => run_recover(&args),
        Commands::Verify(args) => run_verify(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
