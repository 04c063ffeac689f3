//! # hirehub-plugin
//!
//! Plugin framework for HireHub. Provides:
//!
//! - Plugin lifecycle management (initialize, start, stop) with rejection of
//!   duplicate IDs and of plugins whose lifecycle calls fail
//! - Hook registry keyed by dot-namespaced names, in registration order
//! - Hook dispatcher with per-handler timeouts and panic containment
//! - Plugin context exposing logging, settings, storage, and hook registration

pub mod api;
pub mod error;
pub mod hooks;
pub mod macros;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod traits;

pub use api::context::PluginContext;
pub use error::{AggregateError, HandlerFailure, HookError, PluginError};
pub use hooks::definitions::{ExecutionContext, HookName, HookPayload};
pub use hooks::dispatcher::{DispatchReport, HandlerOutcome, HandlerStatus, HookDispatcher};
pub use hooks::registry::{HookHandler, HookRegistry};
pub use manager::PluginManager;
pub use registry::{Plugin, PluginRegistry};
pub use tokio_util::sync::CancellationToken;
