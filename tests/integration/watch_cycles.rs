//! End-to-end watch cycles: collect → diff → store swap → dispatch.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil::watcher::{SnapshotStore, WatcherHandle};
use vigil::{Category, ResourceStatus};

use crate::helpers::{
    ScriptStep, ScriptedCollector, bad, fast_dispatcher, ok, record, render_options,
    webhook_backend,
};

/// The watcher never ticks on its own within the test window.
const TEST_INTERVAL: Duration = Duration::from_secs(3600);

fn spawn_watcher(
    steps: Vec<ScriptStep>,
    server_url: &str,
    store: SnapshotStore,
) -> WatcherHandle {
    WatcherHandle::spawn(
        Box::new(ScriptedCollector::new(Category::Services, steps)),
        store,
        Arc::new(fast_dispatcher(vec![webhook_backend(server_url)])),
        render_options("*test-host* (systemd)", true),
        TEST_INTERVAL,
    )
}

#[tokio::test]
async fn healthy_first_cycle_stays_silent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let watcher = spawn_watcher(
        vec![ScriptStep::Inventory(vec![ok("a.service"), ok("b.service")])],
        &server.uri(),
        store.clone(),
    );

    let dispatched = watcher.check_now().await.unwrap();
    assert!(!dispatched);

    // the baseline is still stored for the dashboard
    let snapshot = store.get(Category::Services).await.unwrap();
    assert_eq!(snapshot.len(), 2);

    watcher.shutdown().await;
}

#[tokio::test]
async fn resource_bad_at_startup_is_reported_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let watcher = spawn_watcher(
        vec![ScriptStep::Inventory(vec![ok("a.service"), bad("b.service")])],
        &server.uri(),
        store.clone(),
    );

    assert!(watcher.check_now().await.unwrap());
    // unchanged second cycle stays silent
    assert!(!watcher.check_now().await.unwrap());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let payload: serde_json::Value = requests[0].body_json().unwrap();
    let message = payload["message"].as_str().unwrap();
    assert!(message.contains("*b.service*: inactive!"));
    assert!(message.contains("|ALL| - 2, |OK| - 1, |BAD| - 1"));

    watcher.shutdown().await;
}

#[tokio::test]
async fn unchanged_cycles_never_repeat_notifications() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let watcher = spawn_watcher(
        vec![
            ScriptStep::Inventory(vec![ok("a.service"), ok("b.service")]),
            ScriptStep::Inventory(vec![ok("a.service"), bad("b.service")]),
        ],
        &server.uri(),
        store.clone(),
    );

    assert!(!watcher.check_now().await.unwrap()); // baseline
    assert!(watcher.check_now().await.unwrap()); // b flips bad
    assert!(!watcher.check_now().await.unwrap()); // steady
    assert!(!watcher.check_now().await.unwrap()); // steady

    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    watcher.shutdown().await;
}

#[tokio::test]
async fn recovery_is_reported_as_green() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let watcher = spawn_watcher(
        vec![
            ScriptStep::Inventory(vec![bad("b.service")]),
            ScriptStep::Inventory(vec![ok("b.service")]),
        ],
        &server.uri(),
        store.clone(),
    );

    assert!(watcher.check_now().await.unwrap()); // bad at startup
    assert!(watcher.check_now().await.unwrap()); // recovery

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let payload: serde_json::Value = requests[1].body_json().unwrap();
    let message = payload["message"].as_str().unwrap();
    assert!(message.contains("*b.service*: active!"));
    assert!(message.contains("|ALL| - 1, |OK| - 1, |BAD| - 0"));

    watcher.shutdown().await;
}

#[tokio::test]
async fn disappearance_is_reported_and_next_cycles_are_clean() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let watcher = spawn_watcher(
        vec![
            ScriptStep::Inventory(vec![ok("a.service"), ok("c.service")]),
            ScriptStep::Inventory(vec![ok("a.service")]),
        ],
        &server.uri(),
        store.clone(),
    );

    assert!(!watcher.check_now().await.unwrap()); // baseline
    assert!(watcher.check_now().await.unwrap()); // c disappears
    assert!(!watcher.check_now().await.unwrap()); // steady

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let payload: serde_json::Value = requests[0].body_json().unwrap();
    let message = payload["message"].as_str().unwrap();
    assert!(message.contains("*c.service*: removed!"));
    assert!(message.contains("|ALL| - 1, |OK| - 1, |BAD| - 0"));

    let snapshot = store.get(Category::Services).await.unwrap();
    assert_eq!(snapshot.len(), 1);

    watcher.shutdown().await;
}

#[tokio::test]
async fn failed_collection_skips_cycle_and_keeps_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let watcher = spawn_watcher(
        vec![
            ScriptStep::Inventory(vec![ok("a.service")]),
            ScriptStep::Fail("engine unreachable"),
            ScriptStep::Inventory(vec![ok("a.service")]),
        ],
        &server.uri(),
        store.clone(),
    );

    assert!(!watcher.check_now().await.unwrap()); // baseline
    assert!(watcher.check_now().await.is_err()); // failed pass

    // the stored snapshot survives the failed cycle
    assert_eq!(store.get(Category::Services).await.unwrap().len(), 1);

    // and the recovery cycle diffs against it without phantom events
    assert!(!watcher.check_now().await.unwrap());
    assert_eq!(server.received_requests().await.unwrap().len(), 0);

    watcher.shutdown().await;
}

#[tokio::test]
async fn container_watcher_reports_state_words() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let watcher = WatcherHandle::spawn(
        Box::new(ScriptedCollector::new(
            Category::Containers,
            vec![
                ScriptStep::Inventory(vec![record(
                    "web",
                    ResourceStatus::Other("running".into()),
                )]),
                ScriptStep::Inventory(vec![record(
                    "web",
                    ResourceStatus::Other("exited".into()),
                )]),
            ],
        )),
        store.clone(),
        Arc::new(fast_dispatcher(vec![webhook_backend(&server.uri())])),
        render_options("*test-host* (.containers)", false),
        TEST_INTERVAL,
    );

    assert!(!watcher.check_now().await.unwrap()); // baseline: running is not a change
    assert!(watcher.check_now().await.unwrap()); // exited

    let requests = server.received_requests().await.unwrap();
    let payload: serde_json::Value = requests[0].body_json().unwrap();
    let message = payload["message"].as_str().unwrap();
    assert!(message.contains("*web*: exited!"));
    assert!(!message.contains("|ALL|"));

    watcher.shutdown().await;
}
