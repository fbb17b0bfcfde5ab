//! # Registry Errors
//!
//! Errors surfaced by mutating registry and ledger operations. Verification
//! never returns these: it folds every failure into `false`.

use erc7231_core::{Address, TokenId};
use thiserror::Error;

/// Error from a mutating registry or ledger call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Caller is not an authorized controller of the token.
    #[error("{caller} is not authorized to control token {token_id}")]
    Unauthorized {
        /// The token being mutated.
        token_id: TokenId,
        /// The rejected caller.
        caller: Address,
    },

    /// The owner already holds a token.
    #[error("token {0} already minted")]
    AlreadyMinted(TokenId),

    /// No token with this id exists.
    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    /// A signed write carried a nonce other than the token's current one.
    #[error("stale write nonce for token {token_id}: expected {expected}, got {supplied}")]
    StaleNonce {
        /// The token being written.
        token_id: TokenId,
        /// The nonce the next write must carry.
        expected: u64,
        /// The nonce the write carried.
        supplied: u64,
    },

    /// A write authorization could not be recovered to a signer.
    #[error("invalid write authorization: {0}")]
    InvalidSignature(String),

    /// Caller does not own the token it tried to manage.
    #[error("{caller} does not own token {token_id}")]
    NotOwner {
        /// The token.
        token_id: TokenId,
        /// The caller.
        caller: Address,
    },
}
