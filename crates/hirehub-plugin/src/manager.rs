//! Plugin manager — lifecycle management for all plugins.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use hirehub_core::config::PluginSystemConfig;
use hirehub_core::error::AppError;
use hirehub_core::result::AppResult;

use crate::api::context::PluginContext;
use crate::api::services::{MemoryStorage, PluginStorage};
use crate::error::{AggregateError, HookError, PluginError};
use crate::hooks::definitions::{ExecutionContext, HookName, HookPayload};
use crate::hooks::dispatcher::{DispatchReport, EngineOptions, HookDispatcher, panic_message};
use crate::hooks::registry::{HookHandler, HookRegistry};
use crate::registry::{Plugin, PluginInfo, PluginRecord, PluginRegistry, PluginState};

/// Owns the plugin set, the hook registry, and the dispatcher.
///
/// Construct one per host at startup and pass it by reference (or `Arc`) to
/// whatever needs to register plugins or fire hooks. Call
/// [`shutdown_all`](Self::shutdown_all) before dropping it.
#[derive(Debug)]
pub struct PluginManager {
    /// Plugin registry.
    plugin_registry: Arc<PluginRegistry>,
    /// Hook registry.
    hook_registry: Arc<HookRegistry>,
    /// Hook dispatcher.
    hook_dispatcher: Arc<HookDispatcher>,
    /// Host-owned storage handed to plugins.
    storage: Arc<dyn PluginStorage>,
    /// Per-plugin settings.
    settings: HashMap<String, serde_json::Value>,
}

impl PluginManager {
    /// Creates a plugin manager with in-memory plugin storage.
    pub fn new(config: &PluginSystemConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::new()))
    }

    /// Creates a plugin manager backed by host-provided storage.
    pub fn with_storage(config: &PluginSystemConfig, storage: Arc<dyn PluginStorage>) -> Self {
        let hook_registry = Arc::new(HookRegistry::new());
        let hook_dispatcher = Arc::new(HookDispatcher::with_options(
            Arc::clone(&hook_registry),
            EngineOptions::from(config),
        ));

        Self {
            plugin_registry: Arc::new(PluginRegistry::new()),
            hook_registry,
            hook_dispatcher,
            storage,
            settings: config.settings.clone(),
        }
    }

    fn context_for(&self, plugin_id: &str) -> PluginContext {
        PluginContext::new(
            plugin_id,
            self.settings.get(plugin_id).cloned(),
            Arc::clone(&self.storage),
            Arc::clone(&self.hook_registry),
        )
    }

    /// Initializes, starts, and installs a plugin.
    ///
    /// The plugin only becomes visible once both `initialize` and `start`
    /// have succeeded. On failure any hooks it registered are removed and
    /// its context is revoked; after a failed `start`, `stop` is called on
    /// a best-effort basis first. A panic inside a lifecycle call counts as
    /// a failure of that call. If this future is dropped before it
    /// finishes, the rollback runs in the background.
    pub async fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let plugin_id = plugin.id().to_string();
        if plugin_id.trim().is_empty() {
            warn!("Rejected plugin with empty ID");
            return Err(PluginError::InvalidId);
        }

        if let Err(e) = self.plugin_registry.reserve(&plugin_id).await {
            warn!(plugin_id = %plugin_id, "Plugin already registered, rejecting duplicate");
            return Err(e);
        }

        let ctx = self.context_for(&plugin_id);
        let rollback = Rollback::new(self, &ctx);
        debug!(plugin_id = %plugin_id, state = ?PluginState::Registering, "Initializing plugin");

        let initialized = {
            let (plugin, ctx) = (Arc::clone(&plugin), ctx.clone());
            run_contained("initialize", async move { plugin.initialize(&ctx).await }).await
        };
        if let Err(e) = initialized {
            error!(plugin_id = %plugin_id, error = %e, "Plugin initialization failed");
            rollback.run().await;
            return Err(PluginError::InitializationFailed {
                id: plugin_id,
                source: e,
            });
        }
        debug!(plugin_id = %plugin_id, state = ?PluginState::Initialized, "Starting plugin");

        let started = {
            let (plugin, ctx) = (Arc::clone(&plugin), ctx.clone());
            run_contained("start", async move { plugin.start(&ctx).await }).await
        };
        if let Err(e) = started {
            error!(plugin_id = %plugin_id, error = %e, "Plugin start failed");
            let stopped = {
                let (plugin, ctx) = (Arc::clone(&plugin), ctx.clone());
                run_contained("stop", async move { plugin.stop(&ctx).await }).await
            };
            if let Err(stop_err) = stopped {
                warn!(
                    plugin_id = %plugin_id,
                    error = %stop_err,
                    "Plugin stop after failed start returned error"
                );
            }
            rollback.run().await;
            return Err(PluginError::StartFailed {
                id: plugin_id,
                source: e,
            });
        }

        let record = self.plugin_registry.activate(plugin, ctx).await;
        rollback.disarm();
        let info = record.info();
        info!(
            plugin_id = %info.id,
            name = %info.name,
            version = %info.version,
            "Plugin registered and started"
        );

        Ok(())
    }

    /// Stops and removes a plugin.
    ///
    /// Errors and panics from `stop` are logged and swallowed; the plugin
    /// and any hooks it still owns are removed regardless, and its context
    /// is revoked.
    pub async fn unregister_plugin(&self, plugin_id: &str) -> Result<(), PluginError> {
        let record = self.plugin_registry.begin_removal(plugin_id).await?;
        let rollback = Rollback::new(self, record.context());

        let stopped = {
            let (plugin, ctx) = (Arc::clone(record.plugin()), record.context().clone());
            run_contained("stop", async move { plugin.stop(&ctx).await }).await
        };
        if let Err(e) = stopped {
            warn!(
                plugin_id = %plugin_id,
                error = %e,
                "Plugin stop returned error"
            );
        }
        debug!(plugin_id = %plugin_id, state = ?PluginState::Stopped, "Plugin stopped");

        rollback.run().await;
        info!(plugin_id = %plugin_id, "Plugin unregistered");

        Ok(())
    }

    /// Alias of [`unregister_plugin`](Self::unregister_plugin).
    pub async fn shutdown_plugin(&self, plugin_id: &str) -> Result<(), PluginError> {
        self.unregister_plugin(plugin_id).await
    }

    /// Stops and removes every plugin, most recently registered first.
    pub async fn shutdown_all(&self) {
        let records = self.plugin_registry.records().await;

        for record in records.iter().rev() {
            if let Err(e) = self.unregister_plugin(record.id()).await {
                error!(
                    plugin_id = %record.id(),
                    error = %e,
                    "Error unregistering plugin during shutdown"
                );
            }
        }

        info!(count = records.len(), "All plugins shut down");
    }

    /// Looks up a live plugin.
    pub async fn lookup(&self, plugin_id: &str) -> Result<PluginRecord, PluginError> {
        self.plugin_registry
            .get(plugin_id)
            .await
            .ok_or_else(|| PluginError::NotFound(plugin_id.to_string()))
    }

    /// Lists all live plugins in registration order.
    pub async fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugin_registry.list().await
    }

    /// Returns the number of live plugins.
    pub async fn plugin_count(&self) -> usize {
        self.plugin_registry.count().await
    }

    /// Registers a host-owned handler.
    pub async fn register_hook(
        &self,
        hook: &str,
        handler: Arc<dyn HookHandler>,
    ) -> Result<(), HookError> {
        self.hook_registry.register(hook, handler).await
    }

    /// Removes the first registration of `handler` under `hook`.
    pub async fn unregister_hook(
        &self,
        hook: &str,
        handler: &Arc<dyn HookHandler>,
    ) -> Result<(), HookError> {
        self.hook_registry.unregister(hook, handler).await
    }

    /// Fires a hook. See [`HookDispatcher::execute_hooks`].
    pub async fn execute_hooks(
        &self,
        hook: &str,
        ctx: &ExecutionContext,
        payload: HookPayload,
    ) -> Result<DispatchReport, AggregateError> {
        self.hook_dispatcher.execute_hooks(hook, ctx, payload).await
    }

    /// Fires a hook in strict mode. See [`HookDispatcher::execute_hooks_strict`].
    pub async fn execute_hooks_strict(
        &self,
        hook: &str,
        ctx: &ExecutionContext,
        payload: HookPayload,
    ) -> Result<DispatchReport, AggregateError> {
        self.hook_dispatcher
            .execute_hooks_strict(hook, ctx, payload)
            .await
    }

    /// Returns the number of handlers registered for a hook.
    pub async fn handler_count(&self, hook: &str) -> usize {
        self.hook_registry.handler_count(hook).await
    }

    /// Returns all hook names with at least one handler.
    pub async fn registered_hooks(&self) -> Vec<HookName> {
        self.hook_registry.registered_hooks().await
    }

    /// Returns the hook dispatcher for firing hooks.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.hook_dispatcher
    }

    /// Returns the hook registry.
    pub fn hook_registry(&self) -> &Arc<HookRegistry> {
        &self.hook_registry
    }

    /// Returns the plugin registry.
    pub fn plugin_registry(&self) -> &Arc<PluginRegistry> {
        &self.plugin_registry
    }

    /// Returns the host storage shared with plugins.
    pub fn storage(&self) -> &Arc<dyn PluginStorage> {
        &self.storage
    }
}

/// Revokes the context, sweeps the plugin's hooks, and frees its ID.
async fn discard(
    plugin_registry: &PluginRegistry,
    hook_registry: &HookRegistry,
    context: &PluginContext,
) {
    context.revoke();
    hook_registry.unregister_owner(context.plugin_id()).await;
    plugin_registry.release(context.plugin_id()).await;
}

/// Runs one plugin lifecycle call on its own task so a panic is reported
/// as an error instead of unwinding into the manager.
async fn run_contained<F>(stage: &str, call: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>> + Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => Err(AppError::plugin(format!(
            "{stage} panicked: {}",
            panic_message(join_error.into_panic())
        ))),
        Err(_) => Err(AppError::plugin(format!("{stage} task was cancelled"))),
    }
}

/// Discards a registration or removal in progress unless disarmed.
///
/// Dropping an armed guard (the owning future was dropped mid-lifecycle)
/// revokes the context at once and spawns the rest of the cleanup.
struct Rollback {
    plugin_registry: Arc<PluginRegistry>,
    hook_registry: Arc<HookRegistry>,
    context: PluginContext,
    armed: bool,
}

impl Rollback {
    fn new(manager: &PluginManager, context: &PluginContext) -> Self {
        Self {
            plugin_registry: Arc::clone(&manager.plugin_registry),
            hook_registry: Arc::clone(&manager.hook_registry),
            context: context.clone(),
            armed: true,
        }
    }

    async fn run(mut self) {
        discard(&self.plugin_registry, &self.hook_registry, &self.context).await;
        self.armed = false;
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        self.context.revoke();
        let plugin_id = self.context.plugin_id().to_string();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(plugin_id = %plugin_id, "Plugin lifecycle abandoned, rolling back");
                let plugin_registry = Arc::clone(&self.plugin_registry);
                let hook_registry = Arc::clone(&self.hook_registry);
                let context = self.context.clone();
                handle.spawn(async move {
                    discard(&plugin_registry, &hook_registry, &context).await;
                });
            }
            Err(_) => {
                error!(
                    plugin_id = %plugin_id,
                    "Plugin lifecycle abandoned outside a runtime, ID stays reserved"
                );
            }
        }
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new(&PluginSystemConfig::default())
    }
}
