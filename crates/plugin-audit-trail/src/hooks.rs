//! Hook handler that writes audit entries.

use chrono::Utc;
use uuid::Uuid;

use hirehub_plugin_sdk::prelude::*;

use crate::entry::AuditEntry;

/// Records every invocation of one hook.
#[derive(Debug)]
pub struct AuditHandler {
    /// Handler name (`audit-trail:<hook>`).
    name: String,
    /// Hook this handler is bound to.
    hook: String,
    /// Payload keys stripped before storing.
    redact: Vec<String>,
    /// Plugin storage.
    storage: ScopedStorage,
}

impl AuditHandler {
    /// Creates a handler for `hook`.
    pub fn new(hook: &str, redact: Vec<String>, storage: ScopedStorage) -> Self {
        Self {
            name: format!("audit-trail:{hook}"),
            hook: hook.to_string(),
            redact,
            storage,
        }
    }

    fn redacted(&self, data: &Value) -> Value {
        match data {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(key, _)| !self.redact.iter().any(|r| r == *key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

#[async_trait]
impl HookHandler for AuditHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, payload: &HookPayload) -> HandlerResult {
        let entry = AuditEntry {
            id: Uuid::now_v7(),
            hook: self.hook.clone(),
            trace_id: ctx.trace_id(),
            actor_id: payload.actor_id,
            occurred_at: payload.timestamp,
            recorded_at: Utc::now(),
            data: self.redacted(&payload.data),
        };

        self.storage
            .set(&entry.key(), serde_json::to_value(&entry)?)
            .await?;

        tracing::debug!(hook = %self.hook, entry_id = %entry.id, "Audit entry recorded");
        Ok(Some(json!({ "entry_id": entry.id })))
    }
}
