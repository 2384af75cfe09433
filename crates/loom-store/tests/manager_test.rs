//! Integration suite for the state manager over the in-memory backend.
//!
//! Covers connection lifecycle, retry/backoff behavior, content-addressed
//! deduplication, and cancellation, all without a live store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use loom_store::{
    DocId, Error, FieldMap, MemoryConnector, MemoryDocumentStore, RetryPolicy, Settings,
    StateManager, WriteRequest,
};

fn fields(value: serde_json::Value) -> FieldMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn test_policy() -> RetryPolicy {
    RetryPolicy::new()
        .max_attempts(4)
        .base_delay(Duration::from_millis(250))
        .growth_factor(2.0)
        .max_delay(Duration::from_millis(8_000))
        .jitter(false)
}

struct Harness {
    manager: StateManager,
    store: MemoryDocumentStore,
    connector: Arc<MemoryConnector>,
}

fn harness() -> Harness {
    let store = MemoryDocumentStore::new();
    let connector = Arc::new(MemoryConnector::new(store.clone()));
    let manager = StateManager::new(Settings::default(), connector.clone())
        .with_retry_policy(test_policy());
    Harness {
        manager,
        store,
        connector,
    }
}

#[tokio::test]
async fn connection_setup_runs_exactly_once_across_operations() {
    let h = harness();

    h.manager
        .write("notes", WriteRequest::assigned("a", fields(json!({"x": 1}))))
        .await
        .unwrap();
    h.manager.read("notes", "a").await.unwrap();
    h.manager.delete("notes", "a").await.unwrap();

    assert_eq!(h.connector.connect_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_access_opens_one_session() {
    let h = harness();
    let manager = Arc::new(h.manager);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move { manager.connect().await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.connector.connect_count(), 1);
}

#[tokio::test]
async fn global_accessor_is_idempotent() {
    let h = harness();
    let other = harness();

    let first = StateManager::init_global(h.manager);
    let second = StateManager::init_global(other.manager);

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(
        &first,
        &StateManager::global().expect("global installed")
    ));
}

#[tokio::test]
async fn content_addressed_id_is_key_order_independent() {
    let h = harness();

    let a = h
        .manager
        .write(
            "insights",
            WriteRequest::content_addressed(fields(json!({"a": 1, "b": 2}))),
        )
        .await
        .unwrap();
    let b = h
        .manager
        .write(
            "insights",
            WriteRequest::content_addressed(fields(json!({"b": 2, "a": 1}))),
        )
        .await
        .unwrap();

    assert_eq!(a.id, b.id);
    assert!(b.deduplicated);

    let changed = h
        .manager
        .write(
            "insights",
            WriteRequest::content_addressed(fields(json!({"a": 1, "b": 3}))),
        )
        .await
        .unwrap();
    assert_ne!(changed.id, a.id);
}

#[tokio::test]
async fn duplicate_content_addressed_write_is_a_no_op() {
    let h = harness();
    let payload = fields(json!({"domain": "quantum_computing", "score": 0.9}));

    let first = h
        .manager
        .write("insights", WriteRequest::content_addressed(payload.clone()))
        .await
        .unwrap();
    let second = h
        .manager
        .write("insights", WriteRequest::content_addressed(payload))
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert!(second.deduplicated);
    assert_eq!(second.updated_at, first.updated_at);
    assert_eq!(h.store.document_count(), 1);
    assert_eq!(h.store.call_count("set"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_writes_converge_to_one_record() {
    let h = harness();
    let manager = Arc::new(h.manager);
    let payload = fields(json!({"domain": "materials_science", "insight": "x"}));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let manager = manager.clone();
        let payload = payload.clone();
        handles.push(tokio::spawn(async move {
            manager
                .write("insights", WriteRequest::content_addressed(payload))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.store.document_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_with_growing_backoff() {
    let h = harness();
    h.manager.connect().await.unwrap();
    h.store
        .inject_failures(|| Error::TransientStore("unavailable".into()), 2);

    let start = tokio::time::Instant::now();
    let result = h.manager.read("notes", "missing").await.unwrap();

    assert_eq!(result, None);
    assert_eq!(h.store.call_count("get"), 3);
    // 250ms then 500ms; the second backoff is never shorter than the first.
    assert_eq!(start.elapsed(), Duration::from_millis(750));
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let h = harness();
    h.manager.connect().await.unwrap();
    h.store
        .inject_failure(Error::PermanentStore("permission denied".into()));

    let result = h.manager.read("notes", "doc").await;
    assert!(matches!(result, Err(Error::PermanentStore(_))));
    assert_eq!(h.store.call_count("get"), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_terminal_error() {
    let h = harness();
    h.manager.connect().await.unwrap();
    h.store
        .inject_failures(|| Error::TransientStore("unavailable".into()), 16);

    let result = h.manager.read("notes", "doc").await;
    assert_eq!(h.store.call_count("get"), 4);
    match result {
        Err(Error::RetryExhausted { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected RetryExhausted, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn delete_of_absent_document_succeeds() {
    let h = harness();
    h.manager.delete("notes", "never-written").await.unwrap();
}

#[tokio::test]
async fn read_of_absent_document_is_not_found_not_error() {
    let h = harness();
    let result = h.manager.read("notes", "never-written").await.unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn connection_fault_invalidates_handle_and_reconnects() {
    let h = harness();
    h.manager.connect().await.unwrap();
    assert_eq!(h.manager.reconnect_count(), 0);

    h.store
        .inject_failure(Error::Connection("session expired".into()));
    let result = h.manager.read("notes", "doc").await;
    assert!(matches!(result, Err(Error::Connection(_))));
    assert_eq!(h.manager.reconnect_count(), 1);
    assert!(!h.manager.is_connected().await);

    // Next operation dials a fresh session and succeeds.
    h.manager.read("notes", "doc").await.unwrap();
    assert_eq!(h.connector.connect_count(), 2);
    assert!(h.manager.is_connected().await);
}

#[tokio::test]
async fn failed_connect_is_not_poisoned() {
    let h = harness();
    h.connector
        .inject_connect_failure(Error::Config("unreadable credentials".into()));

    let result = h.manager.connect().await;
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(!h.manager.is_connected().await);

    // A later attempt is permitted and succeeds.
    h.manager.connect().await.unwrap();
    assert!(h.manager.is_connected().await);
}

#[tokio::test(start_paused = true)]
async fn transient_dial_failures_are_retried_for_the_connect_step() {
    let h = harness();
    h.connector
        .inject_connect_failure(Error::Connection("dial refused".into()));
    h.connector
        .inject_connect_failure(Error::TransientStore("dial timeout".into()));

    h.manager.connect().await.unwrap();
    assert_eq!(h.connector.connect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_dial_surfaces_connection_error() {
    let h = harness();
    for _ in 0..8 {
        h.connector
            .inject_connect_failure(Error::Connection("dial refused".into()));
    }

    let result = h.manager.connect().await;
    assert!(matches!(result, Err(Error::Connection(_))));
    assert_eq!(h.connector.connect_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_inflight_backoff_promptly() {
    let h = harness();
    h.manager.connect().await.unwrap();
    h.store
        .inject_failures(|| Error::TransientStore("unavailable".into()), 16);

    let manager = Arc::new(h.manager);
    let reader = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.read("notes", "doc").await })
    };

    // Let the first attempt fail and the backoff sleep begin.
    tokio::task::yield_now().await;
    manager.shutdown().await;

    let result = reader.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled(_))));
}

#[tokio::test]
async fn operations_after_shutdown_fail_with_cancelled() {
    let h = harness();
    h.manager.connect().await.unwrap();
    h.manager.shutdown().await;

    assert!(matches!(
        h.manager.read("notes", "doc").await,
        Err(Error::Cancelled(_))
    ));
    assert!(matches!(
        h.manager
            .write("notes", WriteRequest::assigned("a", fields(json!({"x": 1}))))
            .await,
        Err(Error::Cancelled(_))
    ));
    assert!(matches!(
        h.manager.delete("notes", "doc").await,
        Err(Error::Cancelled(_))
    ));
}

#[tokio::test]
async fn reads_always_consult_the_store() {
    let h = harness();
    h.manager
        .write("notes", WriteRequest::assigned("doc", fields(json!({"x": 1}))))
        .await
        .unwrap();

    h.manager.read("notes", "doc").await.unwrap();
    h.manager.read("notes", "doc").await.unwrap();

    // Two reads, two store consultations; nothing is served from a cache.
    assert_eq!(h.store.call_count("get"), 3); // 1 dedup check + 2 reads
}

#[tokio::test]
async fn write_with_explicit_doc_id_variants() {
    let h = harness();

    let assigned = h
        .manager
        .write(
            "notes",
            WriteRequest {
                id: DocId::Assigned("chosen".into()),
                fields: fields(json!({"x": 1})),
            },
        )
        .await
        .unwrap();
    assert_eq!(assigned.id, "chosen");

    let addressed = h
        .manager
        .write(
            "notes",
            WriteRequest::content_addressed_in("domains", fields(json!({"x": 1}))),
        )
        .await
        .unwrap();
    assert!(addressed.id.starts_with("domains:blake3:"));
}
