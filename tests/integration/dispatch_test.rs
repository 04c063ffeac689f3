//! Integration tests for hook dispatch through the plugin manager.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::time::Instant;

use hirehub_core::config::{FailurePolicy, PluginSystemConfig};
use hirehub_plugin::hooks::definitions::names;
use hirehub_plugin::traits::FnHandler;
use hirehub_plugin::{
    ExecutionContext, HandlerFailure, HandlerStatus, HookPayload, PluginManager,
};

use helpers::{TestPlugin, logging_handler, manager_with_timeout};

#[tokio::test(start_paused = true)]
async fn test_slow_handler_times_out_while_fast_one_completes() {
    let manager = manager_with_timeout(5_000);
    let log = Arc::new(Mutex::new(Vec::new()));
    manager
        .register_hook(
            names::JOB_CREATED,
            logging_handler("A", Duration::ZERO, Arc::clone(&log)),
        )
        .await
        .unwrap();
    manager
        .register_hook(
            names::JOB_CREATED,
            logging_handler("B", Duration::from_secs(30), Arc::clone(&log)),
        )
        .await
        .unwrap();

    let started = Instant::now();
    let report = manager
        .execute_hooks(
            names::JOB_CREATED,
            &ExecutionContext::new(),
            HookPayload::new(serde_json::json!({"job_id": "job-1"})),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_millis(5_100));
    assert_eq!(*log.lock().await, vec!["A"]);
    assert!(report.outcome("A").unwrap().is_completed());
    assert!(matches!(
        report.outcome("B").unwrap().failure(),
        Some(HandlerFailure::Timeout(_))
    ));
}

#[tokio::test]
async fn test_panicking_handler_does_not_crash_dispatch() {
    let manager = PluginManager::default();
    let finished = Arc::new(AtomicUsize::new(0));

    manager
        .register_hook(
            names::CANDIDATE_CREATED,
            FnHandler::arc("expects-object", |_ctx, payload| {
                let name = payload.data["name"].as_str().unwrap().to_uppercase();
                async move { Ok(Some(serde_json::json!(name))) }
            }),
        )
        .await
        .unwrap();
    {
        let finished = Arc::clone(&finished);
        manager
            .register_hook(
                names::CANDIDATE_CREATED,
                FnHandler::arc("second", move |_ctx, _payload| {
                    let finished = Arc::clone(&finished);
                    async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok(None)
                    }
                }),
            )
            .await
            .unwrap();
    }

    let report = manager
        .execute_hooks(
            names::CANDIDATE_CREATED,
            &ExecutionContext::new(),
            HookPayload::new(serde_json::json!(["unexpected", "shape"])),
        )
        .await
        .expect("lenient dispatch reports success");

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(matches!(
        report.outcome("expects-object").unwrap().failure(),
        Some(HandlerFailure::Panic(_))
    ));
    assert!(report.outcome("second").unwrap().is_completed());
}

#[tokio::test]
async fn test_initiation_follows_registration_not_completion() {
    let manager = PluginManager::default();
    let sequence = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(Vec::new()));

    for index in 0..5usize {
        let sequence = Arc::clone(&sequence);
        let started = Arc::clone(&started);
        let completed = Arc::clone(&completed);
        manager
            .register_hook(
                names::INTERVIEW_SCHEDULED,
                FnHandler::arc(format!("h{index}"), move |_ctx, _payload| {
                    let sequence = Arc::clone(&sequence);
                    let started = Arc::clone(&started);
                    let completed = Arc::clone(&completed);
                    async move {
                        let ticket = sequence.fetch_add(1, Ordering::SeqCst);
                        started.lock().await.push((index, ticket));
                        // Later registrations finish first.
                        tokio::time::sleep(Duration::from_millis(5 * (5 - index as u64))).await;
                        completed.lock().await.push(index);
                        Ok(None)
                    }
                }),
            )
            .await
            .unwrap();
    }

    let report = manager
        .execute_hooks(
            names::INTERVIEW_SCHEDULED,
            &ExecutionContext::new(),
            HookPayload::empty(),
        )
        .await
        .unwrap();

    let started = started.lock().await.clone();
    for (index, ticket) in &started {
        assert_eq!(index, ticket);
    }
    assert_eq!(*completed.lock().await, vec![4, 3, 2, 1, 0]);
    let handlers: Vec<&str> = report.outcomes.iter().map(|o| o.handler.as_str()).collect();
    assert_eq!(handlers, vec!["h0", "h1", "h2", "h3", "h4"]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_duplicate_handler_runs_twice_until_one_is_removed() {
    let manager = PluginManager::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let handler = {
        let calls = Arc::clone(&calls);
        FnHandler::arc("counter", move |_ctx, _payload| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
    };

    manager
        .register_hook(names::JOB_UPDATED, Arc::clone(&handler))
        .await
        .unwrap();
    manager
        .register_hook(names::JOB_UPDATED, Arc::clone(&handler))
        .await
        .unwrap();

    let ctx = ExecutionContext::new();
    manager
        .execute_hooks(names::JOB_UPDATED, &ctx, HookPayload::empty())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    manager
        .unregister_hook(names::JOB_UPDATED, &handler)
        .await
        .unwrap();
    manager
        .execute_hooks(names::JOB_UPDATED, &ctx, HookPayload::empty())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unregistered_plugin_no_longer_receives_dispatch() {
    let manager = PluginManager::default();
    manager
        .register_plugin(Arc::new(TestPlugin::new("p1").with_hook(names::JOB_CLOSED)))
        .await
        .unwrap();

    let report = manager
        .execute_hooks(names::JOB_CLOSED, &ExecutionContext::new(), HookPayload::empty())
        .await
        .unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].owner.as_deref(), Some("p1"));

    manager.unregister_plugin("p1").await.unwrap();

    let report = manager
        .execute_hooks(names::JOB_CLOSED, &ExecutionContext::new(), HookPayload::empty())
        .await
        .unwrap();
    assert!(report.outcomes.is_empty());
}

#[tokio::test]
async fn test_strict_policy_from_config() {
    let config = PluginSystemConfig {
        failure_policy: FailurePolicy::Strict,
        ..PluginSystemConfig::default()
    };
    let manager = PluginManager::new(&config);
    manager
        .register_hook(
            names::CANDIDATE_STAGE_CHANGED,
            FnHandler::arc("rejects", |_ctx, _payload| async {
                Err(hirehub_core::error::AppError::validation("stage unknown"))
            }),
        )
        .await
        .unwrap();

    let err = manager
        .execute_hooks(
            names::CANDIDATE_STAGE_CHANGED,
            &ExecutionContext::new(),
            HookPayload::empty(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.report.failure_count(), 1);
    assert!(matches!(
        err.report.outcomes[0].status,
        HandlerStatus::Failed(HandlerFailure::Error(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_dispatch_does_not_block_plugin_registration() {
    let manager = Arc::new(manager_with_timeout(2_000));
    let (entered_tx, entered_rx) = oneshot::channel::<()>();
    let entered_tx = Arc::new(std::sync::Mutex::new(Some(entered_tx)));

    manager
        .register_hook(
            names::INTERVIEW_FEEDBACK_SUBMITTED,
            FnHandler::arc("slow-scorer", move |_ctx, _payload| {
                let entered_tx = Arc::clone(&entered_tx);
                async move {
                    if let Some(tx) = entered_tx.lock().unwrap().take() {
                        let _ = tx.send(());
                    }
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(None)
                }
            }),
        )
        .await
        .unwrap();

    let dispatch = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .execute_hooks(
                    names::INTERVIEW_FEEDBACK_SUBMITTED,
                    &ExecutionContext::new(),
                    HookPayload::empty(),
                )
                .await
        })
    };

    entered_rx.await.unwrap();

    tokio::time::timeout(
        Duration::from_millis(200),
        manager.register_plugin(Arc::new(TestPlugin::new("late").with_hook(names::JOB_CREATED))),
    )
    .await
    .expect("registration must not wait for the in-flight dispatch")
    .unwrap();
    assert!(!dispatch.is_finished());

    let report = dispatch.await.unwrap().unwrap();
    assert!(report.is_clean());
}
