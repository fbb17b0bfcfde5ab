//! # Identity Registry
//!
//! Binds an ordered set of identity claims to a token by storing one root
//! hash per token, and verifies that a claimant's signed claims match the
//! committed root.
//!
//! ## Write Path
//!
//! `set_identities_root` checks the caller against the ownership oracle,
//! stores the root, and emits `SetIdentitiesRoot`. All three happen under a
//! single mutex, so same-token writers are serialized last-writer-wins and
//! event order equals write order. Readers go straight to storage and see
//! either the old or the new root.
//!
//! Every token carries a write nonce, starting at 0 and advanced by each
//! successful write. `set_identities_root_signed` identifies the caller by
//! recovering a signature over `set_root_digest(token, nonce, root)` and
//! accepts it only at the current nonce, so a write authorization is good
//! for one token and one write.
//!
//! ## Verification
//!
//! Verification is a total predicate: every failure becomes `false`. The
//! reason is logged at `debug` and never returned, so a caller learns
//! nothing about which check failed.

use std::collections::HashMap;
use std::sync::Arc;

use erc7231_core::{
    is_well_formed_user_id, message_digest, set_root_digest, Address, CanonicalizationError,
    ClaimEncoding, DigestAlgorithm, Hash256, IdentityClaim, TokenId,
};
use erc7231_crypto::{RecoverableSignature, Secp256k1Recovery, SignatureVerifier};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RegistryError;
use crate::events::{EventSink, RegistryEvent, TracingSink};
use crate::oracle::OwnershipOracle;
use crate::storage::{InMemoryRootStorage, RootStorage};

/// Hashing parameters shared by every root the registry deals with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How claim sequences are serialized before hashing.
    pub encoding: ClaimEncoding,
    /// The digest used for roots and message envelopes.
    pub algorithm: DigestAlgorithm,
}

/// Why a binding check failed. Internal only: never surfaced to callers.
#[derive(Error, Debug)]
enum Rejection {
    #[error("no root committed")]
    NoRoot,
    #[error("expected root does not match committed root")]
    RootMismatch,
    #[error("claim user ids are empty or contain a blank id")]
    MalformedUserIds,
    #[error("claims hash does not match expected root")]
    ClaimsHashMismatch,
    #[error("claims could not be canonicalized: {0}")]
    Canonicalization(#[from] CanonicalizationError),
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),
    #[error("recovered signer {recovered} is not claimant {claimant}")]
    SignerMismatch { recovered: Address, claimant: Address },
    #[error("claimant is not an authorized controller")]
    NotController,
}

/// The identity-root registry.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct IdentityRegistry {
    storage: Arc<dyn RootStorage>,
    oracle: Arc<dyn OwnershipOracle>,
    verifier: Arc<dyn SignatureVerifier>,
    events: Arc<dyn EventSink>,
    config: RegistryConfig,
    nonces: RwLock<HashMap<TokenId, u64>>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("roots", &self.storage.len())
            .field("config", &self.config)
            .finish()
    }
}

impl IdentityRegistry {
    /// Create a registry with in-memory storage, secp256k1 recovery, a
    /// tracing event sink, and default hashing.
    pub fn new(oracle: Arc<dyn OwnershipOracle>) -> Self {
        Self {
            storage: Arc::new(InMemoryRootStorage::new()),
            oracle,
            verifier: Arc::new(Secp256k1Recovery),
            events: Arc::new(TracingSink),
            config: RegistryConfig::default(),
            nonces: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the root storage.
    pub fn with_storage(mut self, storage: Arc<dyn RootStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Replace the signature verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Replace the event sink.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replace the hashing configuration.
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// The hashing configuration in effect.
    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Root hash of an ordered claim sequence under this registry's config.
    pub fn claims_root(&self, claims: &[IdentityClaim]) -> Result<Hash256, CanonicalizationError> {
        erc7231_core::claims_root(claims, self.config.encoding, self.config.algorithm)
    }

    /// The digest a holder signs to attest `root`.
    pub fn message_for(&self, root: &Hash256) -> Hash256 {
        message_digest(root, self.config.algorithm)
    }

    /// The nonce the next write to `token_id` must be authorized for.
    pub fn write_nonce(&self, token_id: &TokenId) -> u64 {
        self.nonces.read().get(token_id).copied().unwrap_or(0)
    }

    /// The digest a controller signs to authorize writing `root` to
    /// `token_id` at `nonce`.
    pub fn write_message_for(&self, token_id: &TokenId, nonce: u64, root: &Hash256) -> Hash256 {
        set_root_digest(token_id, nonce, root, self.config.algorithm)
    }

    /// Commit `root` as the identities root of `token_id`.
    ///
    /// For callers already authenticated in-process. Overwrites any previous
    /// root, advances the write nonce, and emits `SetIdentitiesRoot`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] when `caller` is not a controller of
    /// the token. The stored root is left unchanged and nothing is emitted.
    pub fn set_identities_root(
        &self,
        token_id: &TokenId,
        caller: &Address,
        root: Hash256,
    ) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock();
        self.commit_locked(token_id, caller, root)
    }

    /// Commit `root` on the strength of a signed write authorization.
    ///
    /// The caller is the address recovered from `signature` over
    /// [`write_message_for(token_id, nonce, root)`](Self::write_message_for).
    /// Returns that address.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidSignature`] when no signer can be recovered.
    /// - [`RegistryError::StaleNonce`] when `nonce` is not the token's
    ///   current write nonce, including any replay of an earlier write.
    /// - [`RegistryError::Unauthorized`] when the signer is not a controller.
    pub fn set_identities_root_signed(
        &self,
        token_id: &TokenId,
        root: Hash256,
        nonce: u64,
        signature: &RecoverableSignature,
    ) -> Result<Address, RegistryError> {
        let message = self.write_message_for(token_id, nonce, &root);
        let caller = self
            .verifier
            .recover_signer(&message, signature)
            .map_err(|e| RegistryError::InvalidSignature(e.to_string()))?;

        let _guard = self.write_lock.lock();
        let expected = self.write_nonce(token_id);
        if nonce != expected {
            metrics::counter!("erc7231_root_set_rejected_total").increment(1);
            tracing::warn!(%token_id, %caller, expected, supplied = nonce, "identities root write rejected: stale nonce");
            return Err(RegistryError::StaleNonce {
                token_id: *token_id,
                expected,
                supplied: nonce,
            });
        }
        self.commit_locked(token_id, &caller, root)?;
        Ok(caller)
    }

    /// Authorize, store, advance the nonce, and emit. Requires `write_lock`.
    fn commit_locked(
        &self,
        token_id: &TokenId,
        caller: &Address,
        root: Hash256,
    ) -> Result<(), RegistryError> {
        if !self.oracle.is_authorized_controller(token_id, caller) {
            metrics::counter!("erc7231_root_set_rejected_total").increment(1);
            tracing::warn!(%token_id, %caller, "identities root write rejected: not a controller");
            return Err(RegistryError::Unauthorized {
                token_id: *token_id,
                caller: *caller,
            });
        }
        let previous = self.storage.put(*token_id, root);
        *self.nonces.write().entry(*token_id).or_insert(0) += 1;
        self.events.emit(&RegistryEvent::SetIdentitiesRoot {
            token_id: *token_id,
            root,
        });
        metrics::counter!("erc7231_roots_set_total").increment(1);
        tracing::debug!(%token_id, %root, overwrite = previous.is_some(), "identities root set");
        Ok(())
    }

    /// The most recently committed root of `token_id`, if any.
    pub fn get_identities_root(&self, token_id: &TokenId) -> Option<Hash256> {
        self.storage.get(token_id)
    }

    /// Verify a binding from user ids, the expected root, and a signature.
    ///
    /// True only when `expected_root` is the committed root, `user_ids` is
    /// non-empty with no blank entry, `signature` over the message digest of
    /// the root recovers to `claimant`, and `claimant` controls the token.
    pub fn verify_identities_binding<S: AsRef<str>>(
        &self,
        token_id: &TokenId,
        claimant: &Address,
        user_ids: &[S],
        expected_root: &Hash256,
        signature: &RecoverableSignature,
    ) -> bool {
        let result = self.check_committed_root(token_id, expected_root).and_then(|()| {
            if user_ids.is_empty() || !user_ids.iter().all(|id| is_well_formed_user_id(id.as_ref()))
            {
                return Err(Rejection::MalformedUserIds);
            }
            self.check_signer(token_id, claimant, expected_root, signature)
        });
        self.record_outcome(token_id, claimant, result)
    }

    /// Verify a binding from the full claim records.
    ///
    /// Everything [`verify_identities_binding`](Self::verify_identities_binding)
    /// checks, plus the claims must hash to `expected_root` under this
    /// registry's encoding and algorithm.
    pub fn verify_claims_binding(
        &self,
        token_id: &TokenId,
        claimant: &Address,
        claims: &[IdentityClaim],
        expected_root: &Hash256,
        signature: &RecoverableSignature,
    ) -> bool {
        let result = self.check_committed_root(token_id, expected_root).and_then(|()| {
            if claims.is_empty() || !claims.iter().all(|c| is_well_formed_user_id(&c.user_id)) {
                return Err(Rejection::MalformedUserIds);
            }
            if self.claims_root(claims)? != *expected_root {
                return Err(Rejection::ClaimsHashMismatch);
            }
            self.check_signer(token_id, claimant, expected_root, signature)
        });
        self.record_outcome(token_id, claimant, result)
    }

    fn check_committed_root(&self, token_id: &TokenId, expected: &Hash256) -> Result<(), Rejection> {
        match self.storage.get(token_id) {
            None => Err(Rejection::NoRoot),
            Some(stored) if stored != *expected => Err(Rejection::RootMismatch),
            Some(_) => Ok(()),
        }
    }

    fn check_signer(
        &self,
        token_id: &TokenId,
        claimant: &Address,
        root: &Hash256,
        signature: &RecoverableSignature,
    ) -> Result<(), Rejection> {
        let message = self.message_for(root);
        let recovered = self
            .verifier
            .recover_signer(&message, signature)
            .map_err(|e| Rejection::SignatureInvalid(e.to_string()))?;
        if recovered != *claimant {
            return Err(Rejection::SignerMismatch {
                recovered,
                claimant: *claimant,
            });
        }
        if !self.oracle.is_authorized_controller(token_id, claimant) {
            return Err(Rejection::NotController);
        }
        Ok(())
    }

    fn record_outcome(
        &self,
        token_id: &TokenId,
        claimant: &Address,
        result: Result<(), Rejection>,
    ) -> bool {
        match result {
            Ok(()) => {
                metrics::counter!("erc7231_verifications_total", "outcome" => "valid").increment(1);
                true
            }
            Err(reason) => {
                metrics::counter!("erc7231_verifications_total", "outcome" => "invalid")
                    .increment(1);
                tracing::debug!(%token_id, %claimant, %reason, "binding verification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::oracle::TokenLedger;
    use erc7231_core::keccak256;
    use erc7231_crypto::Secp256k1KeyPair;

    struct Fixture {
        ledger: Arc<TokenLedger>,
        log: Arc<EventLog>,
        registry: IdentityRegistry,
        holder: Secp256k1KeyPair,
        token: TokenId,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(TokenLedger::new());
        let log = Arc::new(EventLog::new());
        let registry = IdentityRegistry::new(ledger.clone()).with_events(log.clone());
        let holder = Secp256k1KeyPair::generate();
        let token = ledger.mint(holder.address()).unwrap();
        Fixture {
            ledger,
            log,
            registry,
            holder,
            token,
        }
    }

    fn claims() -> Vec<IdentityClaim> {
        vec![
            IdentityClaim::new("openID2:steam:a1", "https://verify/a1", "memo1"),
            IdentityClaim::new("did:polygonId:b2", "https://verify/b2", "memo1"),
        ]
    }

    #[test]
    fn get_is_absent_before_set() {
        let f = fixture();
        assert_eq!(f.registry.get_identities_root(&f.token), None);
    }

    #[test]
    fn owner_sets_and_reads_back() {
        let f = fixture();
        let root = keccak256(b"root");
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), root)
            .unwrap();
        assert_eq!(f.registry.get_identities_root(&f.token), Some(root));
        assert_eq!(f.registry.get_identities_root(&f.token), Some(root));
        assert_eq!(f.log.len(), 1);
    }

    #[test]
    fn stranger_is_rejected_and_nothing_changes() {
        let f = fixture();
        let root = keccak256(b"root");
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), root)
            .unwrap();
        let stranger = Secp256k1KeyPair::generate().address();
        let err = f
            .registry
            .set_identities_root(&f.token, &stranger, keccak256(b"evil"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));
        assert_eq!(f.registry.get_identities_root(&f.token), Some(root));
        assert_eq!(f.log.len(), 1);
    }

    #[test]
    fn approved_operator_may_set() {
        let f = fixture();
        let operator = Secp256k1KeyPair::generate().address();
        f.ledger
            .set_approval_for_all(f.holder.address(), operator, true);
        f.registry
            .set_identities_root(&f.token, &operator, keccak256(b"op"))
            .unwrap();
        assert_eq!(f.registry.get_identities_root(&f.token), Some(keccak256(b"op")));
    }

    #[test]
    fn signed_write_advances_nonce() {
        let f = fixture();
        let root = keccak256(b"root");
        assert_eq!(f.registry.write_nonce(&f.token), 0);
        let sig = f
            .holder
            .sign_root_write(&f.token, 0, &root, DigestAlgorithm::Keccak256)
            .unwrap();
        let signer = f
            .registry
            .set_identities_root_signed(&f.token, root, 0, &sig)
            .unwrap();
        assert_eq!(signer, f.holder.address());
        assert_eq!(f.registry.get_identities_root(&f.token), Some(root));
        assert_eq!(f.registry.write_nonce(&f.token), 1);

        f.registry
            .set_identities_root(&f.token, &f.holder.address(), keccak256(b"direct"))
            .unwrap();
        assert_eq!(f.registry.write_nonce(&f.token), 2);
    }

    #[test]
    fn replayed_write_is_stale() {
        let f = fixture();
        let h1 = keccak256(b"h1");
        let h2 = keccak256(b"h2");
        let sig1 = f
            .holder
            .sign_root_write(&f.token, 0, &h1, DigestAlgorithm::Keccak256)
            .unwrap();
        let sig2 = f
            .holder
            .sign_root_write(&f.token, 1, &h2, DigestAlgorithm::Keccak256)
            .unwrap();
        f.registry.set_identities_root_signed(&f.token, h1, 0, &sig1).unwrap();
        f.registry.set_identities_root_signed(&f.token, h2, 1, &sig2).unwrap();

        let err = f
            .registry
            .set_identities_root_signed(&f.token, h1, 0, &sig1)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::StaleNonce {
                token_id: f.token,
                expected: 2,
                supplied: 0
            }
        );
        // Claiming the current nonce changes the digest, so the signer differs.
        let err = f
            .registry
            .set_identities_root_signed(&f.token, h1, 2, &sig1)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));
        assert_eq!(f.registry.get_identities_root(&f.token), Some(h2));
        assert_eq!(f.log.len(), 2);
    }

    #[test]
    fn write_authorization_is_bound_to_one_token() {
        let f = fixture();
        let operator = Secp256k1KeyPair::generate();
        let other_owner = Secp256k1KeyPair::generate().address();
        let other = f.ledger.mint(other_owner).unwrap();
        f.ledger
            .set_approval_for_all(f.holder.address(), operator.address(), true);
        f.ledger.set_approval_for_all(other_owner, operator.address(), true);

        let root = keccak256(b"root");
        let sig = operator
            .sign_root_write(&f.token, 0, &root, DigestAlgorithm::Keccak256)
            .unwrap();
        let err = f
            .registry
            .set_identities_root_signed(&other, root, 0, &sig)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));
        assert_eq!(f.registry.get_identities_root(&other), None);
        f.registry.set_identities_root_signed(&f.token, root, 0, &sig).unwrap();
    }

    #[test]
    fn binding_signature_is_not_a_write_authorization() {
        let f = fixture();
        let root = keccak256(b"root");
        let binding = f.holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
        let err = f
            .registry
            .set_identities_root_signed(&f.token, root, 0, &binding)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));
        assert_eq!(f.registry.write_nonce(&f.token), 0);
    }

    #[test]
    fn user_id_path_accepts_valid_binding() {
        let f = fixture();
        let root = f.registry.claims_root(&claims()).unwrap();
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), root)
            .unwrap();
        let sig = f.holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
        let ids = erc7231_core::user_ids(&claims());
        assert!(f
            .registry
            .verify_identities_binding(&f.token, &f.holder.address(), &ids, &root, &sig));
    }

    #[test]
    fn user_id_path_rejects_empty_or_blank_ids() {
        let f = fixture();
        let root = keccak256(b"root");
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), root)
            .unwrap();
        let sig = f.holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
        let none: [&str; 0] = [];
        assert!(!f
            .registry
            .verify_identities_binding(&f.token, &f.holder.address(), &none, &root, &sig));
        assert!(!f.registry.verify_identities_binding(
            &f.token,
            &f.holder.address(),
            &["did:x:1", ""],
            &root,
            &sig
        ));
    }

    #[test]
    fn verification_fails_without_committed_root() {
        let f = fixture();
        let root = keccak256(b"root");
        let sig = f.holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
        assert!(!f.registry.verify_identities_binding(
            &f.token,
            &f.holder.address(),
            &["did:x:1"],
            &root,
            &sig
        ));
    }

    #[test]
    fn verification_fails_for_stale_root() {
        let f = fixture();
        let old = keccak256(b"old");
        let sig = f.holder.sign_root(&old, DigestAlgorithm::Keccak256).unwrap();
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), old)
            .unwrap();
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), keccak256(b"new"))
            .unwrap();
        assert!(!f.registry.verify_identities_binding(
            &f.token,
            &f.holder.address(),
            &["did:x:1"],
            &old,
            &sig
        ));
    }

    #[test]
    fn signature_from_other_key_fails() {
        let f = fixture();
        let root = keccak256(b"root");
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), root)
            .unwrap();
        let sig = Secp256k1KeyPair::generate()
            .sign_root(&root, DigestAlgorithm::Keccak256)
            .unwrap();
        assert!(!f.registry.verify_identities_binding(
            &f.token,
            &f.holder.address(),
            &["did:x:1"],
            &root,
            &sig
        ));
    }

    #[test]
    fn signer_who_lost_control_fails() {
        let f = fixture();
        let operator = Secp256k1KeyPair::generate();
        f.ledger
            .set_approval_for_all(f.holder.address(), operator.address(), true);
        let root = keccak256(b"root");
        f.registry
            .set_identities_root(&f.token, &operator.address(), root)
            .unwrap();
        let sig = operator.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
        assert!(f.registry.verify_identities_binding(
            &f.token,
            &operator.address(),
            &["did:x:1"],
            &root,
            &sig
        ));
        f.ledger
            .set_approval_for_all(f.holder.address(), operator.address(), false);
        assert!(!f.registry.verify_identities_binding(
            &f.token,
            &operator.address(),
            &["did:x:1"],
            &root,
            &sig
        ));
    }

    #[test]
    fn raw_root_signature_is_not_accepted() {
        let f = fixture();
        let root = keccak256(b"root");
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), root)
            .unwrap();
        let sig = f.holder.sign_digest(&root).unwrap();
        assert!(!f.registry.verify_identities_binding(
            &f.token,
            &f.holder.address(),
            &["did:x:1"],
            &root,
            &sig
        ));
    }

    #[test]
    fn claims_path_detects_edited_claim() {
        let f = fixture();
        let root = f.registry.claims_root(&claims()).unwrap();
        f.registry
            .set_identities_root(&f.token, &f.holder.address(), root)
            .unwrap();
        let sig = f.holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
        assert!(f
            .registry
            .verify_claims_binding(&f.token, &f.holder.address(), &claims(), &root, &sig));

        let mut edited = claims();
        edited[1].verifier_uri.push('x');
        assert!(!f
            .registry
            .verify_claims_binding(&f.token, &f.holder.address(), &edited, &root, &sig));
    }

    #[test]
    fn sha256_config_changes_root_and_envelope() {
        let ledger = Arc::new(TokenLedger::new());
        let config = RegistryConfig {
            encoding: ClaimEncoding::Jcs,
            algorithm: DigestAlgorithm::Sha256,
        };
        let registry = IdentityRegistry::new(ledger.clone()).with_config(config);
        let holder = Secp256k1KeyPair::generate();
        let token = ledger.mint(holder.address()).unwrap();
        let root = registry.claims_root(&claims()).unwrap();
        assert_ne!(
            root,
            erc7231_core::claims_root(&claims(), ClaimEncoding::Compact, DigestAlgorithm::Keccak256)
                .unwrap()
        );
        registry
            .set_identities_root(&token, &holder.address(), root)
            .unwrap();
        let keccak_sig = holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
        let sha_sig = holder.sign_root(&root, DigestAlgorithm::Sha256).unwrap();
        assert!(!registry.verify_claims_binding(&token, &holder.address(), &claims(), &root, &keccak_sig));
        assert!(registry.verify_claims_binding(&token, &holder.address(), &claims(), &root, &sha_sig));
    }
}
