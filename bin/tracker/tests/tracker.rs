//! Integration tests for the tracker engine.
//!
//! Every test runs against in-memory storage and a scripted chain client.


use balance::{AlertConfig, AlertTrigger};
use setup::{
    harness, tracker_over, usdt, usdt_query, FailingStore, RecordingSink, ScriptedClient,
};
use std::{sync::Arc, time::Duration};
use snapshot::ImportMode;
use store::{LiveState, StorageError, MAX_REFRESH_SECS, PERMISSION_DENIED_MESSAGE};
use tracker::{signal::Permission, FetchStatus, TrackerError};

#[tokio::test]
async fn test_add_query_fetches_and_alerts() {
    let h = harness(Some(usdt(50)), AlertTrigger::EveryCycle, Permission::Granted);

    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::below("100")))
        .await
        .unwrap();

    let pending = h.tracker.query(&handle.id).unwrap();
    assert!(pending.is_loading);
    assert_eq!(pending.balance, "");

    let status = handle.fetch.await.unwrap();
    assert_eq!(
        status,
        FetchStatus::Updated {
            alerting: true,
            triggered: true
        }
    );

    let query = h.tracker.query(&handle.id).unwrap();
    assert!(!query.is_loading);
    assert_eq!(query.balance, "50.0");
    assert_eq!(query.decimals, Some(6));
    assert_eq!(query.symbol_resolved, "USDT");
    assert_eq!(query.name_resolved, "Tether USD");
    assert!(query.is_alerting);
    assert!(query.alert_triggered_at.is_some());
    assert!(query.last_updated.is_some());

    assert_eq!(
        h.sink.events(),
        vec![
            "speak:Alert, ops, Ethereum, USDT: balance below 100".to_string(),
            "notify:Balance alert:Ethereum USDT 50.0\n0x0000...dEaD".to_string(),
            "beep".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_every_cycle_refires_while_alerting() {
    let h = harness(Some(usdt(50)), AlertTrigger::EveryCycle, Permission::Granted);
    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::below("100")))
        .await
        .unwrap();
    handle.fetch.await.unwrap();

    let status = h.tracker.refresh_one(&handle.id).await.unwrap();
    assert_eq!(
        status,
        FetchStatus::Updated {
            alerting: true,
            triggered: true
        }
    );
    assert_eq!(h.sink.events().len(), 6);
}

#[tokio::test]
async fn test_edge_trigger_fires_on_entry_only() {
    let h = harness(Some(usdt(50)), AlertTrigger::Edge, Permission::Granted);
    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::below("100")))
        .await
        .unwrap();
    handle.fetch.await.unwrap();
    assert_eq!(h.sink.events().len(), 3);

    let status = h.tracker.refresh_one(&handle.id).await.unwrap();
    assert_eq!(
        status,
        FetchStatus::Updated {
            alerting: true,
            triggered: false
        }
    );
    assert_eq!(h.sink.events().len(), 3);

    h.client.set_balance(Some(usdt(150)));
    h.tracker.refresh_one(&handle.id).await.unwrap();
    assert!(!h.tracker.query(&handle.id).unwrap().is_alerting);
    assert_eq!(h.tracker.alert_history(&handle.id), Some(false));

    h.client.set_balance(Some(usdt(20)));
    let status = h.tracker.refresh_one(&handle.id).await.unwrap();
    assert_eq!(
        status,
        FetchStatus::Updated {
            alerting: true,
            triggered: true
        }
    );
    assert_eq!(h.sink.events().len(), 6);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_balance() {
    let h = harness(Some(usdt(50)), AlertTrigger::EveryCycle, Permission::Granted);
    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::default()))
        .await
        .unwrap();
    handle.fetch.await.unwrap();

    h.client.set_balance(None);
    let status = h.tracker.refresh_one(&handle.id).await.unwrap();
    assert_eq!(status, FetchStatus::Failed);

    let query = h.tracker.query(&handle.id).unwrap();
    assert_eq!(query.balance, "50.0");
    assert!(!query.is_loading);
    assert!(query
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("connection refused")));
    assert!(h.sink.events().is_empty());

    h.client.set_balance(Some(usdt(60)));
    h.tracker.refresh_one(&handle.id).await.unwrap();
    let query = h.tracker.query(&handle.id).unwrap();
    assert_eq!(query.balance, "60.0");
    assert_eq!(query.last_error, None);
}

#[tokio::test]
async fn test_invalid_query_is_rejected() {
    let h = harness(Some(usdt(1)), AlertTrigger::EveryCycle, Permission::Granted);
    let mut input = usdt_query("ops", AlertConfig::default());
    input.holder = "0x1234".to_string();

    let err = h.tracker.add_query(input).await.unwrap_err();
    assert!(matches!(err, TrackerError::Create(_)));
    assert_eq!(h.tracker.query_count(), 0);
}

#[tokio::test]
async fn test_remove_query_forgets_history() {
    let h = harness(Some(usdt(50)), AlertTrigger::Edge, Permission::Granted);
    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::below("100")))
        .await
        .unwrap();
    handle.fetch.await.unwrap();
    assert_eq!(h.tracker.alert_history(&handle.id), Some(true));

    let removed = h.tracker.remove_query(&handle.id).await.unwrap();
    assert_eq!(removed.id, handle.id);
    assert!(h.tracker.query(&handle.id).is_none());
    assert_eq!(h.tracker.alert_history(&handle.id), None);

    let err = h.tracker.refresh_one(&handle.id).await.unwrap_err();
    assert!(matches!(err, TrackerError::UnknownQuery(_)));
}

#[tokio::test]
async fn test_toggle_alert_with_denied_permission() {
    let h = harness(Some(usdt(50)), AlertTrigger::EveryCycle, Permission::Denied);
    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::below("100")))
        .await
        .unwrap();
    handle.fetch.await.unwrap();

    let enabled = h.tracker.toggle_alert(&handle.id).await.unwrap();
    assert!(!enabled);

    let query = h.tracker.query(&handle.id).unwrap();
    assert!(!query.alert.enabled);
    assert!(!query.is_alerting);
    assert_eq!(query.alert_triggered_at, None);
    assert_eq!(query.last_error.as_deref(), Some(PERMISSION_DENIED_MESSAGE));
    assert_eq!(h.tracker.alert_history(&handle.id), None);

    let enabled = h.tracker.toggle_alert(&handle.id).await.unwrap();
    assert!(enabled);
}

#[tokio::test]
async fn test_refresh_project_only_touches_its_queries() {
    let h = harness(Some(usdt(5)), AlertTrigger::EveryCycle, Permission::Granted);
    for project in ["ops", "ops", "treasury"] {
        let handle = h
            .tracker
            .add_query(usdt_query(project, AlertConfig::default()))
            .await
            .unwrap();
        handle.fetch.await.unwrap();
    }
    assert_eq!(h.client.balance_calls(), 3);

    assert_eq!(h.tracker.refresh_project("ops").await, 2);
    assert_eq!(h.client.balance_calls(), 5);

    assert_eq!(h.tracker.refresh_all().await, 3);
    assert_eq!(h.client.balance_calls(), 8);

    let summaries = h.tracker.summaries();
    let ops = summaries.iter().find(|s| s.name == "ops").unwrap();
    assert_eq!(ops.query_ids.len(), 2);
    assert_eq!(ops.total_text, "10.0 USDT");
}

#[tokio::test]
async fn test_state_is_persisted() {
    let h = harness(Some(usdt(50)), AlertTrigger::EveryCycle, Permission::Granted);
    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::default()))
        .await
        .unwrap();
    handle.fetch.await.unwrap();
    h.tracker.persist().await.unwrap();

    let reloaded = LiveState::load(&h.storage).unwrap();
    assert_eq!(reloaded.queries.len(), 1);
    assert!(reloaded.projects.contains("ops"));
    assert_eq!(reloaded.queries.get(&handle.id).unwrap().balance, "50.0");
}

#[tokio::test]
async fn test_failed_save_still_runs_first_fetch() {
    let client = ScriptedClient::new(Some(usdt(50)));
    let tracker = tracker_over(
        Arc::new(FailingStore),
        client.clone(),
        RecordingSink::new(Permission::Granted),
        AlertTrigger::EveryCycle,
    );

    let handle = tracker
        .add_query(usdt_query("ops", AlertConfig::default()))
        .await
        .unwrap();
    let status = handle.fetch.await.unwrap();
    assert_eq!(
        status,
        FetchStatus::Updated {
            alerting: false,
            triggered: false
        }
    );
    assert_eq!(client.balance_calls(), 1);

    let query = tracker.query(&handle.id).unwrap();
    assert!(!query.is_loading);
    assert_eq!(query.balance, "50.0");

    let err = tracker.persist().await.unwrap_err();
    assert!(matches!(err, TrackerError::Storage(StorageError::Io { .. })));
}

#[tokio::test]
async fn test_import_merge_then_replace() {
    let h = harness(Some(usdt(50)), AlertTrigger::EveryCycle, Permission::Granted);
    let handle = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::below("100")))
        .await
        .unwrap();
    handle.fetch.await.unwrap();

    let exported = h.tracker.export().to_json().unwrap();

    let report = h.tracker.import(&exported, ImportMode::Merge).await.unwrap();
    assert_eq!(report.queries_imported, 1);
    assert_eq!(report.ids_rewritten, 1);
    assert_eq!(h.tracker.query_count(), 2);
    assert!(h.tracker.query(&handle.id).is_some());
    assert_eq!(h.tracker.alert_history(&handle.id), Some(true));

    let report = h.tracker.import(&exported, ImportMode::Replace).await.unwrap();
    assert!(report.queries_replaced);
    assert_eq!(h.tracker.query_count(), 1);
    assert_eq!(h.tracker.alert_history(&handle.id), None);
}

#[tokio::test]
async fn test_import_rejects_non_object() {
    let h = harness(Some(usdt(50)), AlertTrigger::EveryCycle, Permission::Granted);
    let before = h.tracker.export();

    let err = h.tracker.import("[1, 2, 3]", ImportMode::Replace).await.unwrap_err();
    assert!(matches!(err, TrackerError::Import(_)));
    assert_eq!(h.tracker.export().queries, before.queries);
}

#[tokio::test]
async fn test_set_refresh_validates_interval() {
    let h = harness(None, AlertTrigger::EveryCycle, Permission::Granted);
    let before = h.tracker.refresh_settings();

    let err = h.tracker.set_refresh(None, Some(-5.0)).await.unwrap_err();
    assert!(matches!(err, TrackerError::InvalidRefreshInterval(_)));
    assert_eq!(h.tracker.refresh_settings(), before);

    let settings = h.tracker.set_refresh(Some(false), Some(2.0)).await.unwrap();
    assert!(!settings.enabled);
    assert_eq!(settings.interval().as_secs(), 5);
    assert_eq!(*h.tracker.subscribe_refresh().borrow(), settings);
}

#[tokio::test]
async fn test_huge_refresh_interval_is_capped() {
    let h = harness(None, AlertTrigger::EveryCycle, Permission::Granted);

    let settings = h.tracker.set_refresh(Some(true), Some(1e30)).await.unwrap();
    assert_eq!(settings.interval(), Duration::from_secs(MAX_REFRESH_SECS));

    h.tracker
        .import(r#"{"refreshSeconds": 1e300}"#, ImportMode::Merge)
        .await
        .unwrap();
    assert_eq!(
        h.tracker.refresh_settings().interval(),
        Duration::from_secs(MAX_REFRESH_SECS)
    );
}

#[tokio::test]
async fn test_chain_edits_only_affect_new_queries() {
    let h = harness(Some(usdt(1)), AlertTrigger::EveryCycle, Permission::Granted);
    let first = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::default()))
        .await
        .unwrap();
    first.fetch.await.unwrap();

    h.tracker
        .set_chain_endpoint("ETH", "https://eth.example/rpc")
        .await
        .unwrap();
    assert!(h.tracker.set_chain_endpoint("ETH", "not a url").await.is_err());

    let second = h
        .tracker
        .add_query(usdt_query("ops", AlertConfig::default()))
        .await
        .unwrap();
    second.fetch.await.unwrap();

    let first = h.tracker.query(&first.id).unwrap();
    let second = h.tracker.query(&second.id).unwrap();
    assert_eq!(first.target.endpoint(), "https://ethereum.publicnode.com");
    assert_eq!(second.target.endpoint(), "https://eth.example/rpc");
}
