//! Plugin system configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the handlers of a single dispatch are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Every handler is spawned up front and raced against its own ceiling.
    #[default]
    Concurrent,
    /// Each handler settles before the next one is initiated.
    Sequential,
}

/// How per-handler failures affect the overall dispatch result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The dispatch reports success; failures are only logged and reported.
    #[default]
    Lenient,
    /// The dispatch returns an error when any handler failed.
    Strict,
}

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSystemConfig {
    /// Maximum time to wait on a single handler invocation, in milliseconds.
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,
    /// Scheduling of handlers within one dispatch.
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
    /// Aggregation of handler failures.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Per-plugin settings, keyed by plugin ID. Exposed read-only to plugins.
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl PluginSystemConfig {
    /// Returns the handler ceiling as a `Duration`.
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for PluginSystemConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: default_handler_timeout_ms(),
            dispatch_mode: DispatchMode::default(),
            failure_policy: FailurePolicy::default(),
            settings: HashMap::new(),
        }
    }
}

fn default_handler_timeout_ms() -> u64 {
    5_000
}
