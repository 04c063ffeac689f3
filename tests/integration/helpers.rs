//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use hirehub_core::config::PluginSystemConfig;
use hirehub_core::error::AppError;
use hirehub_core::result::AppResult;
use hirehub_plugin::traits::FnHandler;
use hirehub_plugin::{HookHandler, Plugin, PluginContext, PluginManager};

/// Creates a manager with the given handler ceiling.
pub fn manager_with_timeout(ms: u64) -> PluginManager {
    let config = PluginSystemConfig {
        handler_timeout_ms: ms,
        ..PluginSystemConfig::default()
    };
    PluginManager::new(&config)
}

/// Which lifecycle call a [`TestPlugin`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Nothing,
    Initialize,
    /// `initialize` panics after registering its hook.
    InitializePanic,
    Start,
    Stop,
}

/// Instrumented plugin that counts lifecycle calls.
#[derive(Debug)]
pub struct TestPlugin {
    pub id: String,
    pub fail_at: FailAt,
    /// Hook registered during `initialize` (before any failure).
    pub hook: Option<&'static str>,
    /// Sleep inside `initialize`, after the hook is registered.
    pub init_delay: Option<Duration>,
    pub initialized: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    /// Shared log of `stop` calls, by plugin ID.
    pub stop_log: Option<Arc<Mutex<Vec<String>>>>,
    /// Settings seen during `initialize`.
    pub seen_config: Mutex<Option<serde_json::Value>>,
    /// Clone of the context received in `initialize`.
    pub kept_context: Mutex<Option<PluginContext>>,
}

impl TestPlugin {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            fail_at: FailAt::Nothing,
            hook: None,
            init_delay: None,
            initialized: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            stop_log: None,
            seen_config: Mutex::new(None),
            kept_context: Mutex::new(None),
        }
    }

    pub fn failing_at(mut self, fail_at: FailAt) -> Self {
        self.fail_at = fail_at;
        self
    }

    pub fn with_hook(mut self, hook: &'static str) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    pub fn with_stop_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.stop_log = Some(log);
        self
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.initialized.load(Ordering::SeqCst),
            self.started.load(Ordering::SeqCst),
            self.stopped.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl Plugin for TestPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Test Plugin"
    }

    fn version(&self) -> &str {
        "0.0.1"
    }

    async fn initialize(&self, ctx: &PluginContext) -> AppResult<()> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        *self.seen_config.lock().await = Some(ctx.config().clone());
        *self.kept_context.lock().await = Some(ctx.clone());

        if let Some(hook) = self.hook {
            ctx.register_hook(hook, noop_handler(&format!("{}-handler", self.id)))
                .await?;
        }

        if let Some(delay) = self.init_delay {
            tokio::time::sleep(delay).await;
        }

        match self.fail_at {
            FailAt::Initialize => Err(AppError::internal("initialize exploded")),
            FailAt::InitializePanic => panic!("initialize panicked"),
            _ => Ok(()),
        }
    }

    async fn start(&self, _ctx: &PluginContext) -> AppResult<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == FailAt::Start {
            return Err(AppError::internal("start exploded"));
        }
        Ok(())
    }

    async fn stop(&self, _ctx: &PluginContext) -> AppResult<()> {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.stop_log {
            log.lock().await.push(self.id.clone());
        }
        if self.fail_at == FailAt::Stop {
            return Err(AppError::internal("stop exploded"));
        }
        Ok(())
    }
}

/// A handler that does nothing.
pub fn noop_handler(name: &str) -> Arc<dyn HookHandler> {
    FnHandler::arc(name.to_string(), |_ctx, _payload| async { Ok(None) })
}

/// A handler that appends its name to `log` after `delay`.
pub fn logging_handler(
    name: &'static str,
    delay: Duration,
    log: Arc<Mutex<Vec<&'static str>>>,
) -> Arc<dyn HookHandler> {
    FnHandler::arc(name, move |_ctx, _payload| {
        let log = Arc::clone(&log);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            log.lock().await.push(name);
            Ok(None)
        }
    })
}
