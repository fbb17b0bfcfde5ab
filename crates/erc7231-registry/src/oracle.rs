//! # Ownership Oracle
//!
//! The registry asks an [`OwnershipOracle`] whether a caller may mutate a
//! token's identities root. [`TokenLedger`] is an in-process oracle with
//! ERC-721 ownership and approval semantics, minus transfers.
//!
//! A controller of a token is its owner, the address approved for that
//! token, or an operator the owner approved for all of its tokens.

use std::collections::{HashMap, HashSet};

use erc7231_core::{Address, TokenId};
use parking_lot::RwLock;

use crate::error::RegistryError;

/// Answers whether an address controls a token.
pub trait OwnershipOracle: Send + Sync {
    /// Whether `caller` is an authorized controller of `token_id`.
    /// Unknown tokens have no controllers.
    fn is_authorized_controller(&self, token_id: &TokenId, caller: &Address) -> bool;
}

#[derive(Debug, Default)]
struct LedgerState {
    owners: HashMap<TokenId, Address>,
    token_approvals: HashMap<TokenId, Address>,
    operators: HashSet<(Address, Address)>,
}

/// In-memory token ownership with per-token and operator approvals.
///
/// Each owner holds at most one token, whose id is derived from the owner
/// address with [`TokenId::from_owner`].
#[derive(Debug, Default)]
pub struct TokenLedger {
    state: RwLock<LedgerState>,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the token for `owner`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyMinted`] if `owner` already holds its token.
    pub fn mint(&self, owner: Address) -> Result<TokenId, RegistryError> {
        let token_id = TokenId::from_owner(&owner);
        let mut state = self.state.write();
        if state.owners.contains_key(&token_id) {
            return Err(RegistryError::AlreadyMinted(token_id));
        }
        state.owners.insert(token_id, owner);
        tracing::debug!(%token_id, %owner, "token minted");
        Ok(token_id)
    }

    /// The owner of `token_id`, if minted.
    pub fn owner_of(&self, token_id: &TokenId) -> Option<Address> {
        self.state.read().owners.get(token_id).copied()
    }

    /// The address approved for `token_id`, if any.
    pub fn get_approved(&self, token_id: &TokenId) -> Option<Address> {
        self.state.read().token_approvals.get(token_id).copied()
    }

    /// Whether `operator` may act on all of `owner`'s tokens.
    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.state.read().operators.contains(&(*owner, *operator))
    }

    /// Approve `operator` for one token, or clear the approval with `None`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownToken`] if the token was never minted,
    /// [`RegistryError::NotOwner`] if `caller` does not own it.
    pub fn approve(
        &self,
        caller: &Address,
        token_id: &TokenId,
        operator: Option<Address>,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let owner = state
            .owners
            .get(token_id)
            .copied()
            .ok_or(RegistryError::UnknownToken(*token_id))?;
        if owner != *caller {
            return Err(RegistryError::NotOwner {
                token_id: *token_id,
                caller: *caller,
            });
        }
        match operator {
            Some(op) => state.token_approvals.insert(*token_id, op),
            None => state.token_approvals.remove(token_id),
        };
        Ok(())
    }

    /// Grant or revoke `operator` control over all of `owner`'s tokens.
    pub fn set_approval_for_all(&self, owner: Address, operator: Address, approved: bool) {
        let mut state = self.state.write();
        if approved {
            state.operators.insert((owner, operator));
        } else {
            state.operators.remove(&(owner, operator));
        }
    }

    /// Number of minted tokens.
    pub fn len(&self) -> usize {
        self.state.read().owners.len()
    }

    /// Whether nothing has been minted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OwnershipOracle for TokenLedger {
    fn is_authorized_controller(&self, token_id: &TokenId, caller: &Address) -> bool {
        let state = self.state.read();
        let Some(owner) = state.owners.get(token_id) else {
            return false;
        };
        owner == caller
            || state.token_approvals.get(token_id) == Some(caller)
            || state.operators.contains(&(*owner, *caller))
    }
}
