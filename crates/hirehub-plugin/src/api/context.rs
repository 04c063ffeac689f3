//! Plugin context — the capability object handed to a plugin's lifecycle calls.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::services::{PluginStorage, ScopedStorage};
use crate::error::HookError;
use crate::hooks::registry::{HookHandler, HookRegistry};

/// Logging sink for a plugin. Every event is tagged with the plugin ID.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin_id: Arc<str>,
}

impl PluginLogger {
    fn new(plugin_id: Arc<str>) -> Self {
        Self { plugin_id }
    }

    /// Logs at debug level.
    pub fn debug(&self, message: &str) {
        tracing::debug!(plugin_id = %self.plugin_id, "{}", message);
    }

    /// Logs at info level.
    pub fn info(&self, message: &str) {
        tracing::info!(plugin_id = %self.plugin_id, "{}", message);
    }

    /// Logs at warn level.
    pub fn warn(&self, message: &str) {
        tracing::warn!(plugin_id = %self.plugin_id, "{}", message);
    }

    /// Logs at error level.
    pub fn error(&self, message: &str) {
        tracing::error!(plugin_id = %self.plugin_id, "{}", message);
    }
}

/// Context passed to `initialize`, `start`, and `stop`.
///
/// Gives a plugin logging, its own read-only settings, a scoped view of the
/// host's storage, and hook (de)registration. Handlers registered through
/// the context are owned by the plugin and are removed by the manager if
/// the plugin is rejected or unregistered. The context deliberately does
/// not expose the plugin registry or the dispatcher.
///
/// Clones share one revocation state. Once the manager rejects or removes
/// the plugin, every clone is revoked and `register_hook` fails with
/// [`HookError::Revoked`], so a task the plugin left running cannot attach
/// handlers to a plugin that no longer exists.
#[derive(Clone)]
pub struct PluginContext {
    plugin_id: Arc<str>,
    logger: PluginLogger,
    settings: Arc<serde_json::Value>,
    storage: ScopedStorage,
    hooks: Arc<HookRegistry>,
    revocation: CancellationToken,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

impl PluginContext {
    pub(crate) fn new(
        plugin_id: &str,
        settings: Option<serde_json::Value>,
        storage: Arc<dyn PluginStorage>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let plugin_id: Arc<str> = Arc::from(plugin_id);
        Self {
            logger: PluginLogger::new(Arc::clone(&plugin_id)),
            settings: Arc::new(settings.unwrap_or(serde_json::Value::Null)),
            storage: ScopedStorage::new(storage, &plugin_id),
            plugin_id,
            hooks,
            revocation: CancellationToken::new(),
        }
    }

    /// Revokes this context and all of its clones.
    pub(crate) fn revoke(&self) {
        self.revocation.cancel();
    }

    /// Returns whether the plugin has been rejected or removed.
    pub fn is_revoked(&self) -> bool {
        self.revocation.is_cancelled()
    }

    /// Waits until the context is revoked.
    ///
    /// Background tasks spawned by a plugin can select on this to stop
    /// when the plugin goes away.
    pub async fn revoked(&self) {
        self.revocation.cancelled().await
    }

    /// Returns the ID of the plugin this context belongs to.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Returns the plugin's logging sink.
    pub fn logger(&self) -> &PluginLogger {
        &self.logger
    }

    /// Returns the plugin's settings table (`Null` when none are configured).
    pub fn config(&self) -> &serde_json::Value {
        &self.settings
    }

    /// Gets one setting by key.
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.settings.get(key)
    }

    /// Returns the plugin's scoped storage.
    pub fn storage(&self) -> &ScopedStorage {
        &self.storage
    }

    /// Registers a handler for `hook`, owned by this plugin.
    pub async fn register_hook(
        &self,
        hook: &str,
        handler: Arc<dyn HookHandler>,
    ) -> Result<(), HookError> {
        self.hooks
            .register_owned(hook, handler, &self.plugin_id, &self.revocation)
            .await
    }

    /// Removes the first registration of `handler` under `hook`.
    pub async fn unregister_hook(
        &self,
        hook: &str,
        handler: &Arc<dyn HookHandler>,
    ) -> Result<(), HookError> {
        self.hooks.unregister(hook, handler).await
    }
}
