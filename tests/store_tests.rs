use std::rc::Rc;

use form_designer::binding::registry::BindingId;
use form_designer::error::StoreError;
use form_designer::store::adapter::{ChangeHandler, StoreAdapter};
use form_designer::store::file_store::FileStore;
use form_designer::store::memory::MemoryStore;
use form_designer::store::null::NullStore;

fn id(s: &str) -> BindingId {
    BindingId(s.to_string())
}

fn noop() -> ChangeHandler {
    Rc::new(|_: &BindingId| {})
}

// ============================================================================
// MemoryStore
// ============================================================================

#[tokio::test(flavor = "current_thread")]
async fn memory_store_reads_back_writes() {
    let store = MemoryStore::new();
    assert_eq!(store.read("Sheet1!A1").await.unwrap(), "");

    store.write("Sheet1!A1", "42").await.unwrap();
    assert_eq!(store.read("Sheet1!A1").await.unwrap(), "42");
    assert_eq!(store.writes().len(), 1);
    assert_eq!(store.reads_of("Sheet1!A1"), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn memory_store_subscription_needs_a_binding() {
    let store = MemoryStore::new();
    let err = store.subscribe(&id("bind_x"), noop()).unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));

    let binding = store.ensure_binding("Sheet1!A1", &id("bind_x")).await.unwrap();
    assert_eq!(binding, id("bind_x"));
    assert_eq!(store.binding_address(&binding).as_deref(), Some("Sheet1!A1"));

    store.subscribe(&binding, noop()).unwrap();
    assert!(store.is_subscribed(&binding));
    store.unsubscribe(&binding);
    store.unsubscribe(&binding);
    assert!(!store.is_subscribed(&binding));
}

#[tokio::test(flavor = "current_thread")]
async fn memory_store_external_change_notifies_by_address() {
    let store = MemoryStore::new();
    let hits = Rc::new(std::cell::Cell::new(0));

    store.ensure_binding("Sheet1!A1", &id("a")).await.unwrap();
    store.ensure_binding("Sheet1!B1", &id("b")).await.unwrap();
    let counter = Rc::clone(&hits);
    store
        .subscribe(&id("a"), Rc::new(move |_: &BindingId| counter.set(counter.get() + 1)))
        .unwrap();
    store.subscribe(&id("b"), noop()).unwrap();

    assert_eq!(store.set_external("Sheet1!A1", "x"), 1);
    assert_eq!(hits.get(), 1);
    assert_eq!(store.value("Sheet1!A1").as_deref(), Some("x"));
    assert_eq!(store.delivered_notifications(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn memory_store_failure_injection() {
    let store = MemoryStore::new();
    store.fail_writes_to("Sheet1!A1");
    assert!(store.write("Sheet1!A1", "v").await.is_err());
    assert!(store.write("Sheet1!A2", "v").await.is_ok());
    assert_eq!(store.value("Sheet1!A1"), None);

    store.fail_reads(true);
    assert!(store.read("Sheet1!A2").await.is_err());
}

// ============================================================================
// NullStore
// ============================================================================

#[tokio::test(flavor = "current_thread")]
async fn null_store_accepts_everything_and_holds_nothing() {
    let store = NullStore;
    assert!(!store.is_ready());
    store.write("Sheet1!A1", "v").await.unwrap();
    assert_eq!(store.read("Sheet1!A1").await.unwrap(), "");
    assert_eq!(
        store.ensure_binding("Sheet1!A1", &id("bind_a")).await.unwrap(),
        id("bind_a")
    );
    store.subscribe(&id("bind_a"), noop()).unwrap();
}

// ============================================================================
// FileStore
// ============================================================================

#[tokio::test(flavor = "current_thread")]
async fn file_store_persists_values_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = FileStore::new(&path);
    assert_eq!(store.read("Sheet1!A1").await.unwrap(), "", "missing file is empty");
    store.write("Sheet1!A1", "one").await.unwrap();
    store.write("Sheet1!B1", "two").await.unwrap();

    let reopened = FileStore::new(&path);
    assert_eq!(reopened.read("Sheet1!A1").await.unwrap(), "one");
    assert_eq!(reopened.load().unwrap().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn file_store_has_no_notifications() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("store.json"));

    assert!(!store.is_ready());
    let binding = store.ensure_binding("Sheet1!A1", &id("bind_a")).await.unwrap();
    assert_eq!(store.subscribe(&binding, noop()), Err(StoreError::Unavailable));
}

#[tokio::test(flavor = "current_thread")]
async fn file_store_reports_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "[not an object]").unwrap();

    let store = FileStore::new(&path);
    assert!(matches!(store.read("Sheet1!A1").await, Err(StoreError::Io(_))));
    assert!(store.write("Sheet1!A1", "v").await.is_err());
}
