//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use hirehub_core::error::AppError;
pub use hirehub_core::result::AppResult;

pub use crate::api::context::{PluginContext, PluginLogger};
pub use crate::api::services::{PluginStorage, ScopedStorage};
pub use crate::error::{HandlerFailure, HookError, PluginError};
pub use crate::hooks::definitions::{ExecutionContext, HookName, HookPayload, names};
pub use crate::hooks::registry::{HandlerResult, HookHandler};
pub use crate::registry::{Plugin, PluginInfo, PluginState};
pub use crate::traits::FnHandler;

pub use crate::hook_payload;
