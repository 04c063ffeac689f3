//! Storage service exposed to plugins.
//!
//! The host owns the backing store and its lifetime; each plugin receives a
//! [`ScopedStorage`] view whose keys are prefixed with the plugin ID.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use hirehub_core::result::AppResult;

/// Key-value storage shared between the host and its plugins.
#[async_trait]
pub trait PluginStorage: Send + Sync + std::fmt::Debug {
    /// Gets a value.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;
    /// Sets a value, replacing any previous one.
    async fn set(&self, key: &str, value: serde_json::Value) -> AppResult<()>;
    /// Deletes a value. Returns whether it existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;
    /// Lists keys starting with `prefix`, sorted.
    async fn keys(&self, prefix: &str) -> Vec<String>;
}

/// In-memory storage backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, serde_json::Value>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PluginStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> AppResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn keys(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

/// A plugin's view of the shared store, isolated by key prefix.
#[derive(Debug, Clone)]
pub struct ScopedStorage {
    /// Backing store.
    inner: Arc<dyn PluginStorage>,
    /// Key prefix for plugin isolation.
    prefix: String,
}

impl ScopedStorage {
    /// Creates a view of `inner` scoped to `plugin_id`.
    pub fn new(inner: Arc<dyn PluginStorage>, plugin_id: &str) -> Self {
        Self {
            inner,
            prefix: format!("plugin:{}:", plugin_id),
        }
    }

    /// Returns the full key for a scoped key.
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Gets a value.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.get(&self.full_key(key)).await
    }

    /// Sets a value.
    pub async fn set(&self, key: &str, value: serde_json::Value) -> AppResult<()> {
        self.inner.set(&self.full_key(key), value).await
    }

    /// Deletes a value.
    pub async fn delete(&self, key: &str) -> AppResult<bool> {
        self.inner.delete(&self.full_key(key)).await
    }

    /// Lists this plugin's keys starting with `prefix`, without the scope prefix.
    pub async fn keys(&self, prefix: &str) -> Vec<String> {
        self.inner
            .keys(&self.full_key(prefix))
            .await
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_owned))
            .collect()
    }
}
