//! # Commitment Store
//!
//! Per-token storage of the live identities root. A record is created on
//! first write, overwritten by later writes, and never deleted. History is
//! not kept here; the audit trail lives in [`crate::events::EventLog`].

use std::collections::HashMap;

use erc7231_core::{Hash256, TokenId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// The live commitment for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    /// The token the root is bound to.
    pub token_id: TokenId,
    /// The most recently committed identities root.
    pub root: Hash256,
}

/// Backing store for identities roots.
///
/// Implementations must make `put` atomic with respect to `get`: a reader
/// sees either the previous root or the new one.
pub trait RootStorage: Send + Sync {
    /// The current root for `token_id`, if one was ever set.
    fn get(&self, token_id: &TokenId) -> Option<Hash256>;

    /// Store `root` for `token_id`, returning the root it replaced.
    fn put(&self, token_id: TokenId, root: Hash256) -> Option<Hash256>;

    /// Number of tokens with a committed root.
    fn len(&self) -> usize;

    /// Whether no root has been committed yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`RootStorage`] behind a `parking_lot::RwLock`.
///
/// The lock is never held across `.await`; all operations are synchronous.
#[derive(Debug, Default)]
pub struct InMemoryRootStorage {
    roots: RwLock<HashMap<TokenId, Hash256>>,
}

impl InMemoryRootStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every record, ordered by token id.
    pub fn records(&self) -> Vec<CommitmentRecord> {
        let mut records: Vec<_> = self
            .roots
            .read()
            .iter()
            .map(|(token_id, root)| CommitmentRecord {
                token_id: *token_id,
                root: *root,
            })
            .collect();
        records.sort_by_key(|r| r.token_id);
        records
    }
}

impl RootStorage for InMemoryRootStorage {
    fn get(&self, token_id: &TokenId) -> Option<Hash256> {
        self.roots.read().get(token_id).copied()
    }

    fn put(&self, token_id: TokenId, root: Hash256) -> Option<Hash256> {
        self.roots.write().insert(token_id, root)
    }

    fn len(&self) -> usize {
        self.roots.read().len()
    }
}
