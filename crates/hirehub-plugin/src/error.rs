//! Error types for plugin lifecycle, hook registration, and dispatch.

use std::time::Duration;

use thiserror::Error;

use hirehub_core::error::{AppError, ErrorKind};

use crate::hooks::dispatcher::DispatchReport;

/// Errors surfaced by the plugin lifecycle manager.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin reported an empty identifier.
    #[error("Plugin ID must not be empty")]
    InvalidId,

    /// A plugin with the same identifier is already registered (or registering).
    #[error("Plugin '{0}' is already registered")]
    AlreadyExists(String),

    /// The plugin's `initialize` call failed; the plugin was not added.
    #[error("Plugin '{id}' failed to initialize: {source}")]
    InitializationFailed {
        /// Plugin ID.
        id: String,
        /// Error returned by the plugin.
        #[source]
        source: AppError,
    },

    /// The plugin's `start` call failed; the plugin was stopped and not added.
    #[error("Plugin '{id}' failed to start: {source}")]
    StartFailed {
        /// Plugin ID.
        id: String,
        /// Error returned by the plugin.
        #[source]
        source: AppError,
    },

    /// No live plugin has this identifier.
    #[error("Plugin '{0}' not found")]
    NotFound(String),
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        let kind = match &err {
            PluginError::InvalidId => ErrorKind::Validation,
            PluginError::AlreadyExists(_) => ErrorKind::Conflict,
            PluginError::NotFound(_) => ErrorKind::NotFound,
            PluginError::InitializationFailed { .. } | PluginError::StartFailed { .. } => {
                ErrorKind::Plugin
            }
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

/// Errors surfaced by hook registration.
#[derive(Debug, Error)]
pub enum HookError {
    /// Hook names must be non-empty; no other structural check is made.
    #[error("Hook name must not be empty")]
    EmptyName,

    /// The plugin's context was revoked: the plugin was rejected or removed.
    #[error("Plugin '{0}' is no longer registered; its context has been revoked")]
    Revoked(String),
}

impl From<HookError> for AppError {
    fn from(err: HookError) -> Self {
        let kind = match &err {
            HookError::EmptyName => ErrorKind::Validation,
            HookError::Revoked(_) => ErrorKind::Plugin,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

/// Why a single handler invocation did not complete successfully.
#[derive(Debug, Clone, Error)]
pub enum HandlerFailure {
    /// The handler returned an ordinary error.
    #[error("handler error: {0}")]
    Error(AppError),

    /// The handler panicked; the panic was contained at its task boundary.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// The handler did not settle within the ceiling.
    #[error("handler timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The handler task was cancelled before it settled, e.g. because the
    /// runtime is shutting down.
    #[error("handler task was cancelled")]
    Cancelled,
}

impl HandlerFailure {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::Panic(_) => "panic",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<HandlerFailure> for AppError {
    fn from(failure: HandlerFailure) -> Self {
        match failure {
            HandlerFailure::Error(e) => e,
            HandlerFailure::Timeout(_) => AppError::timeout(failure.to_string()),
            HandlerFailure::Panic(_) | HandlerFailure::Cancelled => {
                AppError::plugin(failure.to_string())
            }
        }
    }
}

/// Returned by a strict-mode dispatch when at least one handler failed.
///
/// The full per-handler report is carried so callers can decide what to do
/// with the handlers that did succeed.
#[derive(Debug, Error)]
#[error("{} of {} handler(s) failed for hook '{}'", .report.failure_count(), .report.outcomes.len(), .report.hook)]
pub struct AggregateError {
    /// Per-handler outcomes of the dispatch.
    pub report: DispatchReport,
}

impl From<AggregateError> for AppError {
    /// Maps to [`ErrorKind::Timeout`] when every failure was a timeout.
    fn from(err: AggregateError) -> Self {
        let all_timeouts = err
            .report
            .failures()
            .all(|outcome| matches!(outcome.failure(), Some(HandlerFailure::Timeout(_))));
        if all_timeouts {
            AppError::timeout(err.to_string())
        } else {
            AppError::plugin(err.to_string())
        }
    }
}
