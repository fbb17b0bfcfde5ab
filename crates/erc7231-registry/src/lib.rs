//! # erc7231-registry — Identity Root Registry
//!
//! Stores one identities root per token and verifies that a claimant's
//! signed claims match it.
//!
//! ## Components
//!
//! - **Storage** (`storage.rs`): [`RootStorage`] trait and the in-memory
//!   [`InMemoryRootStorage`].
//!
//! - **Oracle** (`oracle.rs`): [`OwnershipOracle`] trait deciding who may
//!   write a token's root, and [`TokenLedger`], an in-process ERC-721-style
//!   ownership ledger with approvals.
//!
//! - **Events** (`events.rs`): [`RegistryEvent`], the [`EventSink`] trait,
//!   the append-only [`EventLog`], [`TracingSink`] and [`FanOut`].
//!
//! - **Registry** (`registry.rs`): [`IdentityRegistry`], the write path and
//!   both verification paths.
//!
//! ## Concurrency
//!
//! Every type here is `Send + Sync` and meant to be shared through `Arc`.
//! Locks are `parking_lot` and never held across `.await`.

pub mod error;
pub mod events;
pub mod oracle;
pub mod registry;
pub mod storage;

pub use error::RegistryError;
pub use events::{AuditEntry, EventLog, EventSink, FanOut, RegistryEvent, TracingSink};
pub use oracle::{OwnershipOracle, TokenLedger};
pub use registry::{IdentityRegistry, RegistryConfig};
pub use storage::{CommitmentRecord, InMemoryRootStorage, RootStorage};
