//! Hook system — registry, dispatcher, and hook definitions.

pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{ExecutionContext, HookName, HookPayload};
pub use dispatcher::{DispatchReport, EngineOptions, HandlerOutcome, HandlerStatus, HookDispatcher};
pub use registry::{HandlerResult, HookHandler, HookRegistry};
