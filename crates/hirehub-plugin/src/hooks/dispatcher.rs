//! Hook dispatcher — the execution engine.
//!
//! Every dispatch works on a snapshot of the handlers registered for the
//! hook when the dispatch began. Each handler invocation:
//!
//! - runs as its own tokio task, so a panic is contained at the task
//!   boundary and reported as [`HandlerFailure::Panic`] (a task cancelled
//!   by the runtime is reported as [`HandlerFailure::Cancelled`]);
//! - is raced against the ceiling (the configured handler timeout, or the
//!   time left before the context deadline if that is sooner). On timeout
//!   the engine cancels the handler's child token and stops waiting. The
//!   task itself is not aborted: a handler that ignores its token keeps
//!   running in the background until it finishes on its own.
//!
//! Handlers are initiated in registration order. In
//! [`DispatchMode::Concurrent`] all of them are spawned before any is
//! awaited, so completion order and side-effect visibility between them are
//! unspecified. [`DispatchMode::Sequential`] settles each handler before
//! initiating the next.
//!
//! Handlers must not block the executor thread; blocking work belongs in
//! `tokio::task::spawn_blocking`, otherwise the ceiling cannot be enforced
//! on a current-thread runtime.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use hirehub_core::config::{DispatchMode, FailurePolicy, PluginSystemConfig};

use super::definitions::{ExecutionContext, HookPayload};
use super::registry::{HandlerResult, HookRegistry, RegisteredHandler};
use crate::error::{AggregateError, HandlerFailure};

/// Default per-handler ceiling.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine behaviour, usually derived from [`PluginSystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum time to wait on one handler invocation.
    pub handler_timeout: Duration,
    /// Scheduling of handlers within one dispatch.
    pub mode: DispatchMode,
    /// Whether handler failures fail the dispatch.
    pub failure_policy: FailurePolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            mode: DispatchMode::Concurrent,
            failure_policy: FailurePolicy::Lenient,
        }
    }
}

impl From<&PluginSystemConfig> for EngineOptions {
    fn from(config: &PluginSystemConfig) -> Self {
        Self {
            handler_timeout: config.handler_timeout(),
            mode: config.dispatch_mode,
            failure_policy: config.failure_policy,
        }
    }
}

/// How a single handler invocation settled.
#[derive(Debug, Clone)]
pub enum HandlerStatus {
    /// The handler returned successfully.
    Completed {
        /// Optional output produced by the handler.
        output: Option<serde_json::Value>,
    },
    /// The handler errored, panicked, or timed out.
    Failed(HandlerFailure),
    /// The dispatch was cancelled (or its deadline passed) before this
    /// handler was initiated.
    Skipped,
}

/// Outcome of one handler within a dispatch.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    /// Position of the handler in the registration-order snapshot.
    pub index: usize,
    /// Handler name.
    pub handler: String,
    /// Plugin that registered the handler, if any.
    pub owner: Option<String>,
    /// When the handler task was spawned; `None` if it was skipped.
    pub started_at: Option<Instant>,
    /// Time from initiation until the engine stopped waiting.
    pub elapsed: Duration,
    /// Final status.
    pub status: HandlerStatus,
}

impl HandlerOutcome {
    /// Returns whether the handler completed successfully.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, HandlerStatus::Completed { .. })
    }

    /// Returns the failure, if the handler failed.
    pub fn failure(&self) -> Option<&HandlerFailure> {
        match &self.status {
            HandlerStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns the handler output, if it completed with one.
    pub fn output(&self) -> Option<&serde_json::Value> {
        match &self.status {
            HandlerStatus::Completed { output } => output.as_ref(),
            _ => None,
        }
    }
}

/// Per-handler outcomes of one dispatch, in registration order.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Hook that was dispatched.
    pub hook: String,
    /// Trace ID of the dispatch context.
    pub trace_id: Uuid,
    /// One outcome per handler in the snapshot.
    pub outcomes: Vec<HandlerOutcome>,
    /// Wall time of the whole dispatch.
    pub elapsed: Duration,
}

impl DispatchReport {
    fn empty(hook: &str, trace_id: Uuid) -> Self {
        Self {
            hook: hook.to_string(),
            trace_id,
            outcomes: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Returns whether every handler completed successfully.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(HandlerOutcome::is_completed)
    }

    /// Iterates over the outcomes of failed handlers.
    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.failure().is_some())
    }

    /// Number of failed handlers.
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Number of handlers that completed successfully.
    pub fn completed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    /// Number of handlers skipped because of cancellation.
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, HandlerStatus::Skipped))
            .count()
    }

    /// Finds the first outcome for a handler name.
    pub fn outcome(&self, handler: &str) -> Option<&HandlerOutcome> {
        self.outcomes.iter().find(|o| o.handler == handler)
    }
}

/// A spawned handler the engine is still racing against its ceiling.
struct Invocation {
    index: usize,
    handler: String,
    owner: Option<String>,
    started_at: Instant,
    ceiling: Duration,
    token: CancellationToken,
    task: JoinHandle<HandlerResult>,
}

enum Initiated {
    Running(Invocation),
    Skipped(HandlerOutcome),
}

/// Dispatches hooks to all registered handlers.
#[derive(Debug)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
    /// Engine behaviour.
    options: EngineOptions,
}

impl HookDispatcher {
    /// Creates a dispatcher with default options.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self::with_options(registry, EngineOptions::default())
    }

    /// Creates a dispatcher with explicit options.
    pub fn with_options(registry: Arc<HookRegistry>, options: EngineOptions) -> Self {
        Self { registry, options }
    }

    /// Returns the engine options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Dispatches `payload` to every handler registered for `hook` and
    /// returns once all of them have settled.
    ///
    /// Under [`FailurePolicy::Lenient`] this always returns `Ok`; inspect
    /// the report for per-handler failures. Under [`FailurePolicy::Strict`]
    /// any failed handler turns the result into an [`AggregateError`].
    pub async fn execute_hooks(
        &self,
        hook: &str,
        ctx: &ExecutionContext,
        payload: HookPayload,
    ) -> Result<DispatchReport, AggregateError> {
        let report = self.dispatch(hook, ctx, payload).await;
        Self::apply_policy(self.options.failure_policy, report)
    }

    /// Like [`execute_hooks`](Self::execute_hooks), but strict regardless of
    /// the configured policy.
    pub async fn execute_hooks_strict(
        &self,
        hook: &str,
        ctx: &ExecutionContext,
        payload: HookPayload,
    ) -> Result<DispatchReport, AggregateError> {
        let report = self.dispatch(hook, ctx, payload).await;
        Self::apply_policy(FailurePolicy::Strict, report)
    }

    fn apply_policy(
        policy: FailurePolicy,
        report: DispatchReport,
    ) -> Result<DispatchReport, AggregateError> {
        match policy {
            FailurePolicy::Strict if report.failure_count() > 0 => Err(AggregateError { report }),
            _ => Ok(report),
        }
    }

    async fn dispatch(
        &self,
        hook: &str,
        ctx: &ExecutionContext,
        payload: HookPayload,
    ) -> DispatchReport {
        let dispatch_start = Instant::now();
        let handlers = self.registry.snapshot(hook).await;

        if handlers.is_empty() {
            debug!(hook = %hook, "No handlers registered, nothing to dispatch");
            return DispatchReport::empty(hook, ctx.trace_id());
        }

        debug!(
            hook = %hook,
            trace_id = %ctx.trace_id(),
            handler_count = handlers.len(),
            mode = ?self.options.mode,
            "Dispatching hook"
        );

        let payload = Arc::new(payload);
        let outcomes = match self.options.mode {
            DispatchMode::Concurrent => {
                let initiated: Vec<Initiated> = handlers
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| self.initiate(hook, index, entry, ctx, &payload))
                    .collect();
                join_all(
                    initiated
                        .into_iter()
                        .map(|invocation| Self::settle(hook, invocation)),
                )
                .await
            }
            DispatchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(handlers.len());
                for (index, entry) in handlers.into_iter().enumerate() {
                    let invocation = self.initiate(hook, index, entry, ctx, &payload);
                    outcomes.push(Self::settle(hook, invocation).await);
                }
                outcomes
            }
        };

        let report = DispatchReport {
            hook: hook.to_string(),
            trace_id: ctx.trace_id(),
            outcomes,
            elapsed: dispatch_start.elapsed(),
        };

        let failed = report.failure_count();
        if failed > 0 {
            warn!(
                hook = %hook,
                trace_id = %report.trace_id,
                failed,
                total = report.outcomes.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Hook dispatch finished with handler failures"
            );
        } else {
            debug!(
                hook = %hook,
                completed = report.completed_count(),
                skipped = report.skipped_count(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Hook dispatch finished"
            );
        }

        report
    }

    fn initiate(
        &self,
        hook: &str,
        index: usize,
        entry: RegisteredHandler,
        ctx: &ExecutionContext,
        payload: &Arc<HookPayload>,
    ) -> Initiated {
        let RegisteredHandler { handler, owner } = entry;
        let handler_name = handler.name().to_string();

        if ctx.is_cancelled() || ctx.is_expired() {
            debug!(
                hook = %hook,
                handler = %handler_name,
                "Dispatch cancelled before handler started, skipping"
            );
            return Initiated::Skipped(HandlerOutcome {
                index,
                handler: handler_name,
                owner,
                started_at: None,
                elapsed: Duration::ZERO,
                status: HandlerStatus::Skipped,
            });
        }

        let ceiling = ctx
            .remaining()
            .map(|remaining| remaining.min(self.options.handler_timeout))
            .unwrap_or(self.options.handler_timeout);

        let handler_ctx = ctx.for_handler();
        let token = handler_ctx.cancellation_token().clone();
        let payload = Arc::clone(payload);

        let started_at = Instant::now();
        let task = tokio::spawn(async move { handler.handle(&handler_ctx, &payload).await });

        Initiated::Running(Invocation {
            index,
            handler: handler_name,
            owner,
            started_at,
            ceiling,
            token,
            task,
        })
    }

    async fn settle(hook: &str, initiated: Initiated) -> HandlerOutcome {
        let mut invocation = match initiated {
            Initiated::Skipped(outcome) => return outcome,
            Initiated::Running(invocation) => invocation,
        };

        let deadline = invocation.started_at + invocation.ceiling;
        let result = tokio::time::timeout_at(deadline, &mut invocation.task).await;
        let plugin_id = invocation.owner.as_deref().unwrap_or("host");

        let status = match result {
            Ok(Ok(Ok(output))) => {
                debug!(hook = %hook, handler = %invocation.handler, "Handler completed");
                HandlerStatus::Completed { output }
            }
            Ok(Ok(Err(e))) => {
                warn!(
                    hook = %hook,
                    handler = %invocation.handler,
                    plugin_id = %plugin_id,
                    error = %e,
                    "Hook handler returned an error"
                );
                HandlerStatus::Failed(HandlerFailure::Error(e))
            }
            Ok(Err(join_error)) => {
                let failure = join_failure(join_error);
                if let HandlerFailure::Panic(message) = &failure {
                    error!(
                        hook = %hook,
                        handler = %invocation.handler,
                        plugin_id = %plugin_id,
                        panic = %message,
                        "Hook handler panicked"
                    );
                } else {
                    warn!(
                        hook = %hook,
                        handler = %invocation.handler,
                        plugin_id = %plugin_id,
                        "Hook handler task was cancelled"
                    );
                }
                HandlerStatus::Failed(failure)
            }
            Err(_) => {
                invocation.token.cancel();
                warn!(
                    hook = %hook,
                    handler = %invocation.handler,
                    plugin_id = %plugin_id,
                    timeout_ms = invocation.ceiling.as_millis() as u64,
                    "Hook handler timed out, no longer waiting on it"
                );
                HandlerStatus::Failed(HandlerFailure::Timeout(invocation.ceiling))
            }
        };

        HandlerOutcome {
            index: invocation.index,
            elapsed: invocation.started_at.elapsed(),
            handler: invocation.handler,
            owner: invocation.owner,
            started_at: Some(invocation.started_at),
            status,
        }
    }
}

/// Classifies a handler task that ended without producing a result.
fn join_failure(join_error: JoinError) -> HandlerFailure {
    if join_error.is_panic() {
        HandlerFailure::Panic(panic_message(join_error.into_panic()))
    } else {
        HandlerFailure::Cancelled
    }
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}
