//! Audit trail plugin implementation — registers with the HireHub plugin system.

use std::sync::Arc;

use tokio::sync::Mutex;

use hirehub_plugin_sdk::prelude::*;

use crate::hooks::AuditHandler;

/// Plugin ID.
pub const PLUGIN_ID: &str = "audit-trail";

/// Hooks audited when no `hooks` setting is configured.
const DEFAULT_HOOKS: &[&str] = &[
    names::JOB_CREATED,
    names::JOB_CLOSED,
    names::CANDIDATE_CREATED,
    names::CANDIDATE_STAGE_CHANGED,
    names::INTERVIEW_SCHEDULED,
];

/// Audit trail plugin.
///
/// Settings (under `[plugins.settings.audit-trail]`):
/// - `hooks`: array of hook names to audit.
/// - `redact`: array of payload keys never written to storage.
#[derive(Debug, Default)]
pub struct AuditTrailPlugin {
    /// Handlers registered during `initialize`, removed again in `stop`.
    registered: Mutex<Vec<(String, Arc<dyn HookHandler>)>>,
}

impl AuditTrailPlugin {
    /// Creates a new audit trail plugin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the hook names currently audited.
    pub async fn audited_hooks(&self) -> Vec<String> {
        self.registered
            .lock()
            .await
            .iter()
            .map(|(hook, _)| hook.clone())
            .collect()
    }
}

fn string_list(ctx: &PluginContext, key: &str) -> AppResult<Option<Vec<String>>> {
    let Some(value) = ctx.setting(key) else {
        return Ok(None);
    };

    value
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect::<Option<Vec<String>>>()
        })
        .map(Some)
        .ok_or_else(|| {
            AppError::configuration(format!(
                "{PLUGIN_ID}: setting '{key}' must be an array of strings"
            ))
        })
}

#[async_trait]
impl Plugin for AuditTrailPlugin {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Audit Trail"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Records hiring events into host storage"
    }

    async fn initialize(&self, ctx: &PluginContext) -> AppResult<()> {
        let hooks = string_list(ctx, "hooks")?
            .unwrap_or_else(|| DEFAULT_HOOKS.iter().map(|h| h.to_string()).collect());
        let redact = string_list(ctx, "redact")?.unwrap_or_default();

        let mut registered = self.registered.lock().await;
        for hook in hooks {
            let handler: Arc<dyn HookHandler> = Arc::new(AuditHandler::new(
                &hook,
                redact.clone(),
                ctx.storage().clone(),
            ));
            ctx.register_hook(&hook, Arc::clone(&handler)).await?;
            registered.push((hook, handler));
        }

        ctx.logger()
            .info(&format!("Auditing {} hook(s)", registered.len()));
        Ok(())
    }

    async fn stop(&self, ctx: &PluginContext) -> AppResult<()> {
        let mut registered = self.registered.lock().await;
        for (hook, handler) in registered.drain(..) {
            ctx.unregister_hook(&hook, &handler).await?;
        }

        ctx.logger().info("Audit trail stopped");
        Ok(())
    }
}
