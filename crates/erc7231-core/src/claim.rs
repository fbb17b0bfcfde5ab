//! # Identity Claims
//!
//! An [`IdentityClaim`] links a token to one off-chain identity: a namespaced
//! user id (`"openID2:steam:<id>"`, `"did:polygonId:<id>"`, ...), the URI of
//! an attestation a verifier can dereference, and a free-form memo.
//!
//! Claims are always handled as an ordered sequence. Order participates in
//! the root hash.
//!
//! ## Wire Format
//!
//! Field names follow the reference client's JSON: `userID`,
//! `verifierUri1`, `memo`, in that order. `verifierURI` is accepted as an
//! alias on input. The declaration order of the struct fields is the
//! order the compact canonical encoding emits, so it must not change.

use serde::{Deserialize, Serialize};

/// One identity claim bound to a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityClaim {
    /// Opaque namespaced identifier, e.g. `"did:polygonId:b..2"`.
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Dereferenceable attestation location.
    #[serde(rename = "verifierUri1", alias = "verifierURI")]
    pub verifier_uri: String,
    /// Free-form annotation.
    pub memo: String,
}

impl IdentityClaim {
    /// Build a claim from its three fields.
    pub fn new(
        user_id: impl Into<String>,
        verifier_uri: impl Into<String>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            verifier_uri: verifier_uri.into(),
            memo: memo.into(),
        }
    }

    /// The namespace prefix of the user id (text before the first `:`),
    /// or `None` when the id is not namespaced.
    pub fn scheme(&self) -> Option<&str> {
        self.user_id
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|s| !s.is_empty())
    }
}

/// Whether a user id is acceptable in a verification request.
///
/// Empty and whitespace-only ids are rejected. Nothing else is enforced:
/// ids are opaque.
pub fn is_well_formed_user_id(user_id: &str) -> bool {
    !user_id.trim().is_empty()
}

/// Project a claim sequence onto its user ids, preserving order.
pub fn user_ids(claims: &[IdentityClaim]) -> Vec<String> {
    claims.iter().map(|c| c.user_id.clone()).collect()
}
