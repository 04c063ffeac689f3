//! Closure-based hook handlers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::hooks::definitions::{ExecutionContext, HookPayload};
use crate::hooks::registry::{HandlerResult, HookHandler};

type HandlerFn =
    dyn Fn(&ExecutionContext, &HookPayload) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A closure-based hook handler for quick handler creation.
///
/// The closure runs synchronously with borrowed arguments and returns an
/// owned future, so anything the future needs must be extracted or cloned
/// before it is returned.
///
/// ```rust,ignore
/// let handler = FnHandler::new("notify-recruiter", |_ctx, payload| {
///     let job_id = payload.get_str("job_id").map(str::to_owned);
///     async move {
///         tracing::info!(?job_id, "Notifying recruiter");
///         Ok(None)
///     }
/// });
/// ```
pub struct FnHandler {
    /// Handler name.
    name: String,
    /// Handler function.
    handler: Arc<HandlerFn>,
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl FnHandler {
    /// Creates a new closure-based handler.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExecutionContext, &HookPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Arc<HandlerFn> = Arc::new(
            move |ctx: &ExecutionContext, payload: &HookPayload| -> BoxFuture<'static, HandlerResult> {
                Box::pin(handler(ctx, payload))
            },
        );

        Self {
            name: name.into(),
            handler,
        }
    }

    /// Creates the handler and wraps it as an `Arc<dyn HookHandler>`.
    pub fn arc<F, Fut>(name: impl Into<String>, handler: F) -> Arc<dyn HookHandler>
    where
        F: Fn(&ExecutionContext, &HookPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Arc::new(Self::new(name, handler))
    }
}

#[async_trait]
impl HookHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, payload: &HookPayload) -> HandlerResult {
        (self.handler)(ctx, payload).await
    }
}
