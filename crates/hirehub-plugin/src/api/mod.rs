//! Plugin API — context and services exposed to plugin code.

pub mod context;
pub mod services;

pub use context::{PluginContext, PluginLogger};
pub use services::{MemoryStorage, PluginStorage, ScopedStorage};
