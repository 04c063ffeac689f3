//! Stored audit entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hirehub_plugin_sdk::prelude::*;

/// Storage key prefix for audit entries.
pub const ENTRY_PREFIX: &str = "entries/";

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID (time-ordered).
    pub id: Uuid,
    /// Hook that fired.
    pub hook: String,
    /// Trace ID of the dispatch.
    pub trace_id: Uuid,
    /// User who triggered the event, if known.
    pub actor_id: Option<Uuid>,
    /// When the business event happened.
    pub occurred_at: DateTime<Utc>,
    /// When the entry was written.
    pub recorded_at: DateTime<Utc>,
    /// Event data with redacted fields removed.
    pub data: Value,
}

impl AuditEntry {
    /// Storage key of this entry.
    pub fn key(&self) -> String {
        format!("{}{}", ENTRY_PREFIX, self.id)
    }
}

/// Reads all audit entries in the order they were recorded.
///
/// Entries that fail to deserialize are skipped.
pub async fn read_entries(storage: &ScopedStorage) -> Vec<AuditEntry> {
    let mut entries = Vec::new();
    for key in storage.keys(ENTRY_PREFIX).await {
        let Some(value) = storage.get(&key).await else {
            continue;
        };
        match serde_json::from_value::<AuditEntry>(value) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(key = %key, error = %e, "Skipping unreadable audit entry"),
        }
    }
    entries
}
