//! Hook registry — handlers stored per hook name in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hirehub_core::result::AppResult;

use super::definitions::{ExecutionContext, HookName, HookPayload};
use crate::error::HookError;

/// Value returned by a handler: an optional output, or an error.
pub type HandlerResult = AppResult<Option<serde_json::Value>>;

/// Trait for hook handler implementations.
///
/// Handlers are identified by the `Arc` they were registered with; the
/// same `Arc` must be passed back to unregister them.
#[async_trait]
pub trait HookHandler: Send + Sync + std::fmt::Debug {
    /// Name used to identify this handler in logs and dispatch reports.
    fn name(&self) -> &str;

    /// Handles a hook invocation.
    async fn handle(&self, ctx: &ExecutionContext, payload: &HookPayload) -> HandlerResult;
}

/// A handler as captured in a registry snapshot.
#[derive(Debug, Clone)]
pub struct RegisteredHandler {
    /// The handler.
    pub handler: Arc<dyn HookHandler>,
    /// Plugin that registered this handler through its context, if any.
    pub owner: Option<String>,
}

impl RegisteredHandler {
    fn is(&self, handler: &Arc<dyn HookHandler>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.handler), Arc::as_ptr(handler))
    }
}

/// Registry of hook handlers organized by hook name.
///
/// Writers hold the lock only while mutating a handler list; readers hold
/// it only while copying one, so in-flight dispatches never block
/// registration for longer than a snapshot copy.
#[derive(Debug)]
pub struct HookRegistry {
    /// Hook name → handlers in registration order.
    handlers: RwLock<HashMap<HookName, Vec<RegisteredHandler>>>,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a host-owned handler to the sequence for `hook`.
    ///
    /// Registering the same handler twice makes it run twice per dispatch.
    pub async fn register(
        &self,
        hook: &str,
        handler: Arc<dyn HookHandler>,
    ) -> Result<(), HookError> {
        self.insert(hook, handler, None, None).await
    }

    /// Appends a handler owned by `plugin_id`.
    ///
    /// Fails with [`HookError::Revoked`] once `revocation` is cancelled. The
    /// check is made under the write lock, so a registration racing with
    /// [`unregister_owner`](Self::unregister_owner) is either swept or
    /// rejected.
    pub(crate) async fn register_owned(
        &self,
        hook: &str,
        handler: Arc<dyn HookHandler>,
        plugin_id: &str,
        revocation: &CancellationToken,
    ) -> Result<(), HookError> {
        self.insert(hook, handler, Some(plugin_id.to_string()), Some(revocation))
            .await
    }

    async fn insert(
        &self,
        hook: &str,
        handler: Arc<dyn HookHandler>,
        owner: Option<String>,
        revocation: Option<&CancellationToken>,
    ) -> Result<(), HookError> {
        let hook = HookName::new(hook)?;
        let handler_name = handler.name().to_string();

        let mut handlers = self.handlers.write().await;
        if revocation.is_some_and(CancellationToken::is_cancelled) {
            drop(handlers);
            let plugin_id = owner.unwrap_or_default();
            warn!(
                hook = %hook,
                handler = %handler_name,
                plugin_id = %plugin_id,
                "Rejected hook registration from revoked plugin context"
            );
            return Err(HookError::Revoked(plugin_id));
        }
        let entries = handlers.entry(hook.clone()).or_default();
        entries.push(RegisteredHandler {
            handler,
            owner: owner.clone(),
        });
        let position = entries.len();
        drop(handlers);

        info!(
            hook = %hook,
            handler = %handler_name,
            plugin_id = owner.as_deref().unwrap_or("host"),
            position,
            "Hook handler registered"
        );
        Ok(())
    }

    /// Removes the first registration of `handler` under `hook`.
    ///
    /// Matching is by `Arc` identity. Absence is not an error, and the
    /// relative order of the remaining handlers is preserved.
    pub async fn unregister(
        &self,
        hook: &str,
        handler: &Arc<dyn HookHandler>,
    ) -> Result<(), HookError> {
        let hook = HookName::new(hook)?;

        let mut handlers = self.handlers.write().await;
        let (removed, now_empty) = match handlers.get_mut(hook.as_str()) {
            Some(entries) => {
                let position = entries.iter().position(|entry| entry.is(handler));
                if let Some(index) = position {
                    entries.remove(index);
                }
                (position.is_some(), entries.is_empty())
            }
            None => (false, false),
        };
        if now_empty {
            handlers.remove(hook.as_str());
        }
        drop(handlers);

        if removed {
            info!(hook = %hook, handler = %handler.name(), "Hook handler unregistered");
        } else {
            debug!(hook = %hook, handler = %handler.name(), "Hook handler not registered, nothing to remove");
        }
        Ok(())
    }

    /// Removes every handler registered by `plugin_id`. Returns how many were removed.
    pub async fn unregister_owner(&self, plugin_id: &str) -> usize {
        let mut handlers = self.handlers.write().await;
        let mut removed = 0;

        for entries in handlers.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.owner.as_deref() != Some(plugin_id));
            removed += before - entries.len();
        }

        handlers.retain(|_, entries| !entries.is_empty());
        drop(handlers);

        if removed > 0 {
            info!(plugin_id = %plugin_id, removed, "Hook handlers unregistered for plugin");
        }
        removed
    }

    /// Returns an ordered copy of the handlers currently bound to `hook`.
    pub async fn snapshot(&self, hook: &str) -> Vec<RegisteredHandler> {
        let handlers = self.handlers.read().await;
        handlers.get(hook).cloned().unwrap_or_default()
    }

    /// Returns whether any handlers are registered for a hook.
    pub async fn has_handlers(&self, hook: &str) -> bool {
        let handlers = self.handlers.read().await;
        handlers
            .get(hook)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    /// Returns the number of handlers registered for a hook.
    pub async fn handler_count(&self, hook: &str) -> usize {
        let handlers = self.handlers.read().await;
        handlers.get(hook).map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns all hook names with at least one handler, sorted.
    pub async fn registered_hooks(&self) -> Vec<HookName> {
        let handlers = self.handlers.read().await;
        let mut hooks: Vec<HookName> = handlers.keys().cloned().collect();
        hooks.sort();
        hooks
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
