//! # Registry Events
//!
//! Every successful root write produces one [`RegistryEvent`], delivered to
//! an [`EventSink`] inside the same critical section as the write. Event
//! order therefore equals write order.
//!
//! ## Sinks
//!
//! - [`EventLog`]: append-only audit log with sequence numbers and UTC
//!   timestamps, queryable in full or per token.
//! - [`TracingSink`]: one structured log line per event.
//! - [`FanOut`]: delivers to several sinks in order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use erc7231_core::{Hash256, TokenId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A state change in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A token's identities root was set or overwritten.
    SetIdentitiesRoot {
        /// The token.
        token_id: TokenId,
        /// The new root.
        root: Hash256,
    },
}

impl RegistryEvent {
    /// The token this event concerns.
    pub fn token_id(&self) -> &TokenId {
        match self {
            Self::SetIdentitiesRoot { token_id, .. } => token_id,
        }
    }
}

/// Receives registry events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Must not block on I/O for long; it runs under
    /// the registry's write lock.
    fn emit(&self, event: &RegistryEvent);
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
    /// The event.
    pub event: RegistryEvent,
}

/// Append-only in-memory audit log.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in emission order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    /// Entries concerning `token_id`, in emission order.
    pub fn entries_for(&self, token_id: &TokenId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.event.token_id() == token_id)
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &RegistryEvent) {
        let mut entries = self.entries.write();
        let sequence = entries.len() as u64 + 1;
        entries.push(AuditEntry {
            sequence,
            recorded_at: Utc::now(),
            event: *event,
        });
    }
}

/// Writes each event as an `info` log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RegistryEvent) {
        match event {
            RegistryEvent::SetIdentitiesRoot { token_id, root } => {
                tracing::info!(%token_id, %root, "SetIdentitiesRoot");
            }
        }
    }
}

/// Delivers each event to every inner sink, in order.
#[derive(Default, Clone)]
pub struct FanOut {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOut {
    /// Create a fan-out with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventSink for FanOut {
    fn emit(&self, event: &RegistryEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
