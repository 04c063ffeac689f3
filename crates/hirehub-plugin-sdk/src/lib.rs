//! # hirehub-plugin-sdk
//!
//! SDK for developing plugins for HireHub.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hirehub_plugin_sdk::prelude::*;
//!
//! #[derive(Debug)]
//! struct Greeter;
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn id(&self) -> &str { "greeter" }
//!     fn name(&self) -> &str { "Greeter" }
//!     fn version(&self) -> &str { "1.0.0" }
//!
//!     async fn initialize(&self, ctx: &PluginContext) -> AppResult<()> {
//!         let handler = FnHandler::arc("greet-candidate", |_ctx, payload| {
//!             let email = payload.get_str("email").map(str::to_owned);
//!             async move {
//!                 tracing::info!(?email, "Welcome aboard");
//!                 Ok(None)
//!             }
//!         });
//!         ctx.register_hook(names::CANDIDATE_CREATED, handler).await?;
//!         Ok(())
//!     }
//! }
//! ```

/// Prelude for convenient imports.
pub mod prelude {
    pub use hirehub_plugin::prelude::*;

    pub use serde_json::{Value, json};
}

pub use hirehub_core;
pub use hirehub_plugin;
