use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use serde_json::Value;
use tokio::time::timeout;

use super::*;

#[test]
fn upsert_keys_objects_by_namespace_and_name() {
    let cache = InMemoryCache::<Value>::new();

    let key = cache
        .upsert(json!({ "metadata": { "name": "web", "namespace": "default" } }))
        .unwrap();

    assert_eq!(key, "default/web");
    assert!(cache.contains_key("default/web").unwrap());
    assert_eq!(
        cache.get_by_key("default/web").unwrap().unwrap()["metadata"]["name"],
        "web"
    );
}

#[test]
fn upsert_rejects_objects_without_a_name() {
    let cache = InMemoryCache::<Value>::new();

    assert!(cache.upsert(json!({ "metadata": {} })).is_err());
    assert!(cache.is_empty());
}

#[test]
fn remove_makes_key_unknown() {
    let cache = InMemoryCache::<Value>::new();
    cache.insert("node-1", json!({ "metadata": { "name": "node-1" } }));

    assert!(cache.remove("node-1").is_some());
    assert_eq!(cache.get_by_key("node-1").unwrap(), None);
    assert!(!cache.contains_key("node-1").unwrap());
}

#[tokio::test]
async fn wait_for_cache_sync_returns_once_marked() {
    let cache = Arc::new(InMemoryCache::<Value>::new());

    let waiter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.wait_for_cache_sync().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    cache.mark_synced();

    let ready = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(ready, vec![true]);
    assert!(cache.is_synced());
}

#[tokio::test]
async fn wait_for_cache_sync_is_immediate_when_already_synced() {
    let cache = InMemoryCache::<Value>::new();
    cache.mark_synced();

    let ready = timeout(Duration::from_millis(50), cache.wait_for_cache_sync())
        .await
        .unwrap();

    assert_eq!(ready, vec![true]);
}
