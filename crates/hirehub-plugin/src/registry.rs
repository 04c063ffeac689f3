//! Plugin registry — the set of installed plugins and their metadata.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use hirehub_core::result::AppResult;

use crate::api::context::PluginContext;
use crate::error::PluginError;

/// Trait that all plugins must implement.
///
/// Plugins are compiled into the host and registered as trait objects; the
/// manager drives them through `initialize` → `start` → `stop`.
#[async_trait]
pub trait Plugin: Send + Sync + std::fmt::Debug {
    /// Unique, non-empty plugin identifier.
    fn id(&self) -> &str;

    /// Human-readable plugin name.
    fn name(&self) -> &str;

    /// Plugin version string.
    fn version(&self) -> &str;

    /// Plugin description.
    fn description(&self) -> &str {
        ""
    }

    /// Called once during registration. Register hooks here.
    async fn initialize(&self, ctx: &PluginContext) -> AppResult<()>;

    /// Called after a successful `initialize`.
    async fn start(&self, _ctx: &PluginContext) -> AppResult<()> {
        Ok(())
    }

    /// Called on unregistration, and after a failed `start`.
    async fn stop(&self, _ctx: &PluginContext) -> AppResult<()> {
        Ok(())
    }
}

/// Lifecycle state of a plugin.
///
/// `Registering` and `Stopped` are transient: a plugin is only discoverable
/// while `Started`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Registration in progress; not yet initialized.
    Registering,
    /// `initialize` succeeded.
    Initialized,
    /// `start` succeeded; the plugin is live.
    Started,
    /// `stop` was called; the plugin is being removed.
    Stopped,
}

/// Metadata about an installed plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Unique plugin identifier.
    pub id: String,
    /// Human-readable plugin name.
    pub name: String,
    /// Plugin version string.
    pub version: String,
    /// Plugin description.
    pub description: String,
    /// Lifecycle state.
    pub state: PluginState,
    /// When the plugin finished registering.
    pub registered_at: DateTime<Utc>,
}

/// A live plugin: metadata, implementation, and the context it was given.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    info: PluginInfo,
    plugin: Arc<dyn Plugin>,
    context: PluginContext,
    sequence: u64,
}

impl PluginRecord {
    /// Returns the plugin metadata.
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Returns the plugin ID.
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> PluginState {
        self.info.state
    }

    /// Returns the plugin implementation.
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub(crate) fn context(&self) -> &PluginContext {
        &self.context
    }
}

#[derive(Debug)]
enum Slot {
    /// ID reserved while `initialize`/`start` run.
    Registering,
    /// ID held while `stop` runs.
    Stopping,
    Live(PluginRecord),
}

/// Registry of installed plugins.
///
/// IDs are reserved before a plugin's lifecycle calls run and released if
/// they fail, so concurrent registrations of the same ID cannot both
/// succeed and a half-initialized plugin is never visible to lookups.
#[derive(Debug)]
pub struct PluginRegistry {
    /// Plugin ID → slot.
    slots: RwLock<HashMap<String, Slot>>,
    /// Registration order counter.
    next_sequence: AtomicU64,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Reserves `id` for a registration in progress.
    pub(crate) async fn reserve(&self, id: &str) -> Result<(), PluginError> {
        let mut slots = self.slots.write().await;
        if slots.contains_key(id) {
            return Err(PluginError::AlreadyExists(id.to_string()));
        }
        slots.insert(id.to_string(), Slot::Registering);
        debug!(plugin_id = %id, "Plugin ID reserved");
        Ok(())
    }

    /// Releases a reservation (failed registration or finished removal).
    pub(crate) async fn release(&self, id: &str) {
        let mut slots = self.slots.write().await;
        if matches!(slots.get(id), Some(Slot::Registering | Slot::Stopping)) {
            slots.remove(id);
        }
    }

    /// Turns a reservation into a live record.
    pub(crate) async fn activate(
        &self,
        plugin: Arc<dyn Plugin>,
        context: PluginContext,
    ) -> PluginRecord {
        let record = PluginRecord {
            info: PluginInfo {
                id: plugin.id().to_string(),
                name: plugin.name().to_string(),
                version: plugin.version().to_string(),
                description: plugin.description().to_string(),
                state: PluginState::Started,
                registered_at: Utc::now(),
            },
            plugin,
            context,
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
        };

        let mut slots = self.slots.write().await;
        slots.insert(record.info.id.clone(), Slot::Live(record.clone()));
        record
    }

    /// Takes a live record out of the registry, holding its ID until
    /// [`release`](Self::release) is called.
    pub(crate) async fn begin_removal(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let mut slots = self.slots.write().await;
        match slots.remove(id) {
            Some(Slot::Live(record)) => {
                slots.insert(id.to_string(), Slot::Stopping);
                Ok(record)
            }
            Some(other) => {
                slots.insert(id.to_string(), other);
                Err(PluginError::NotFound(id.to_string()))
            }
            None => Err(PluginError::NotFound(id.to_string())),
        }
    }

    /// Gets a live plugin record by ID.
    pub async fn get(&self, id: &str) -> Option<PluginRecord> {
        let slots = self.slots.read().await;
        match slots.get(id) {
            Some(Slot::Live(record)) => Some(record.clone()),
            _ => None,
        }
    }

    /// Checks whether a live plugin has this ID.
    pub async fn contains(&self, id: &str) -> bool {
        let slots = self.slots.read().await;
        matches!(slots.get(id), Some(Slot::Live(_)))
    }

    /// Lists live plugin metadata in registration order.
    pub async fn list(&self) -> Vec<PluginInfo> {
        self.records()
            .await
            .into_iter()
            .map(|record| record.info)
            .collect()
    }

    /// Returns live records in registration order.
    pub async fn records(&self) -> Vec<PluginRecord> {
        let slots = self.slots.read().await;
        let mut records: Vec<PluginRecord> = slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Live(record) => Some(record.clone()),
                _ => None,
            })
            .collect();
        drop(slots);
        records.sort_by_key(|record| record.sequence);
        records
    }

    /// Returns the number of live plugins.
    pub async fn count(&self) -> usize {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
