//! HireHub host — wires the plugin system together and fires sample events.
//!
//! The HTTP surface and domain services live elsewhere; this binary brings
//! up the plugin manager, installs the compiled-in plugins, dispatches a
//! few business events, and shuts the plugins down again.

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use hirehub_core::config::AppConfig;
use hirehub_core::error::AppError;
use hirehub_plugin::hooks::definitions::names;
use hirehub_plugin::traits::FnHandler;
use hirehub_plugin::{DispatchReport, ExecutionContext, HookPayload, PluginManager};
use plugin_audit_trail::AuditTrailPlugin;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("HIREHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting HireHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Plugin system ────────────────────────────────────
    tracing::info!(
        timeout_ms = config.plugins.handler_timeout_ms,
        mode = ?config.plugins.dispatch_mode,
        policy = ?config.plugins.failure_policy,
        "Initializing plugin system..."
    );
    let plugins = PluginManager::new(&config.plugins);

    // ── Step 2: Compiled-in plugins ──────────────────────────────
    plugins
        .register_plugin(Arc::new(AuditTrailPlugin::new()))
        .await?;

    // ── Step 3: Host-owned handlers ──────────────────────────────
    plugins
        .register_hook(
            names::CANDIDATE_CREATED,
            FnHandler::arc("notify-recruiter", |_ctx, payload| {
                let candidate = payload.get_str("candidate_id").map(str::to_owned);
                async move {
                    tracing::info!(?candidate, "Recruiter notified of new candidate");
                    Ok(None)
                }
            }),
        )
        .await?;

    for info in plugins.list_plugins().await {
        tracing::info!(plugin_id = %info.id, version = %info.version, "Plugin ready");
    }

    // ── Step 4: Sample business events ───────────────────────────
    let recruiter = Uuid::new_v4();
    let events = [
        (
            names::JOB_CREATED,
            HookPayload::new(json!({ "job_id": "job-1", "title": "Platform Engineer" })),
        ),
        (
            names::CANDIDATE_CREATED,
            HookPayload::new(json!({
                "candidate_id": "cand-7",
                "job_id": "job-1",
                "email": "ada@example.com",
            })),
        ),
    ];

    for (hook, payload) in events {
        let ctx = ExecutionContext::new().with_metadata("source", "hirehub-host");
        let report = plugins
            .execute_hooks(hook, &ctx, payload.with_actor(recruiter))
            .await?;
        log_report(&report);
    }

    // ── Step 5: Shutdown ─────────────────────────────────────────
    plugins.shutdown_all().await;
    tracing::info!("HireHub stopped");
    Ok(())
}

fn log_report(report: &DispatchReport) {
    tracing::info!(
        hook = %report.hook,
        trace_id = %report.trace_id,
        completed = report.completed_count(),
        failed = report.failure_count(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Event dispatched"
    );
    for outcome in report.failures() {
        if let Some(failure) = outcome.failure() {
            tracing::warn!(
                hook = %report.hook,
                handler = %outcome.handler,
                kind = failure.label(),
                "{}",
                failure
            );
        }
    }
}
