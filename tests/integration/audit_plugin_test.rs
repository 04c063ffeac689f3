//! Integration tests for the audit trail plugin running inside the manager.

use std::sync::Arc;

use serde_json::json;

use hirehub_core::config::PluginSystemConfig;
use hirehub_plugin::api::services::ScopedStorage;
use hirehub_plugin::hooks::definitions::names;
use hirehub_plugin::{ExecutionContext, HookPayload, PluginError, PluginManager};
use plugin_audit_trail::{AuditTrailPlugin, PLUGIN_ID, read_entries};

fn manager_with_settings(settings: serde_json::Value) -> PluginManager {
    let mut config = PluginSystemConfig::default();
    config.settings.insert(PLUGIN_ID.to_string(), settings);
    PluginManager::new(&config)
}

fn audit_storage(manager: &PluginManager) -> ScopedStorage {
    ScopedStorage::new(Arc::clone(manager.storage()), PLUGIN_ID)
}

#[tokio::test]
async fn test_records_redacted_entries_for_default_hooks() {
    let manager = manager_with_settings(json!({"redact": ["email", "phone"]}));
    manager
        .register_plugin(Arc::new(AuditTrailPlugin::new()))
        .await
        .unwrap();

    assert_eq!(manager.handler_count(names::CANDIDATE_CREATED).await, 1);
    assert_eq!(manager.handler_count(names::INTERVIEW_BEFORE_SCHEDULE).await, 0);

    let actor = uuid::Uuid::new_v4();
    let ctx = ExecutionContext::new();
    let report = manager
        .execute_hooks(
            names::CANDIDATE_CREATED,
            &ctx,
            HookPayload::new(json!({
                "candidate_id": "c-42",
                "email": "grace@example.com",
                "phone": "555-0100",
            }))
            .with_actor(actor),
        )
        .await
        .unwrap();
    assert!(report.is_clean());

    let entries = read_entries(&audit_storage(&manager)).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].hook, names::CANDIDATE_CREATED);
    assert_eq!(entries[0].trace_id, ctx.trace_id());
    assert_eq!(entries[0].actor_id, Some(actor));
    assert_eq!(entries[0].data, json!({"candidate_id": "c-42"}));

    let output = report
        .outcome("audit-trail:candidate.created")
        .and_then(|outcome| outcome.output())
        .cloned()
        .unwrap();
    assert_eq!(output["entry_id"], json!(entries[0].id));
}

#[tokio::test]
async fn test_hooks_setting_limits_audited_hooks() {
    let manager = manager_with_settings(json!({"hooks": [names::JOB_CLOSED]}));
    let plugin = Arc::new(AuditTrailPlugin::new());
    manager.register_plugin(plugin.clone()).await.unwrap();

    assert_eq!(plugin.audited_hooks().await, vec![names::JOB_CLOSED]);
    assert_eq!(manager.handler_count(names::JOB_CREATED).await, 0);

    let ctx = ExecutionContext::new();
    for hook in [names::JOB_CREATED, names::JOB_CLOSED] {
        manager
            .execute_hooks(hook, &ctx, HookPayload::new(json!({"job_id": "job-7"})))
            .await
            .unwrap();
    }

    let entries = read_entries(&audit_storage(&manager)).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].hook, names::JOB_CLOSED);
}

#[tokio::test]
async fn test_invalid_setting_rejects_plugin() {
    let manager = manager_with_settings(json!({"hooks": 42}));

    let result = manager
        .register_plugin(Arc::new(AuditTrailPlugin::new()))
        .await;

    assert!(matches!(
        result,
        Err(PluginError::InitializationFailed { ref id, .. }) if id == PLUGIN_ID
    ));
    assert_eq!(manager.plugin_count().await, 0);
    assert!(manager.registered_hooks().await.is_empty());
}

#[tokio::test]
async fn test_unregister_removes_audit_handlers() {
    let manager = PluginManager::default();
    manager
        .register_plugin(Arc::new(AuditTrailPlugin::new()))
        .await
        .unwrap();
    assert!(!manager.registered_hooks().await.is_empty());

    manager.unregister_plugin(PLUGIN_ID).await.unwrap();

    assert!(manager.registered_hooks().await.is_empty());
    manager
        .execute_hooks(
            names::JOB_CREATED,
            &ExecutionContext::new(),
            HookPayload::empty(),
        )
        .await
        .unwrap();
    assert!(read_entries(&audit_storage(&manager)).await.is_empty());
}
