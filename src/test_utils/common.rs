use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cache::MockResourceCache;
use crate::meta_namespace_key;
use crate::Dispatcher;
use crate::EventQueue;
use crate::ObjectFilter;
use crate::Selector;

pub fn pod(
    namespace: &str,
    name: &str,
) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
        },
        "spec": {
            "containers": [{ "name": "app", "image": "nginx:1.27" }]
        }
    })
}

pub fn pod_selector() -> Selector {
    Selector::new("v1", "Pod")
}

/// A cache that knows `objects` and reports every informer synced.
pub fn mock_cache_with(objects: Vec<Value>) -> MockResourceCache {
    let objects: HashMap<String, Value> = objects
        .into_iter()
        .map(|obj| (meta_namespace_key(&obj).unwrap(), obj))
        .collect();

    let mut cache = MockResourceCache::new();
    cache
        .expect_get_by_key()
        .returning(move |key| Ok(objects.get(key).cloned()));
    cache.expect_wait_for_cache_sync().returning(|| vec![true]);
    cache
}

pub fn dispatcher<H: crate::EventHandler<Value>>(
    controller_id: &str,
    selector: &Selector,
    cache: MockResourceCache,
    handler: Arc<H>,
) -> (Arc<EventQueue>, Dispatcher<MockResourceCache, H>) {
    let queue = Arc::new(EventQueue::new());
    let dispatcher = Dispatcher::new(
        controller_id.into(),
        queue.clone(),
        Arc::new(cache),
        Arc::new(ObjectFilter::new(selector)),
        handler,
    );
    (queue, dispatcher)
}

pub fn never_cancelled() -> CancellationToken {
    CancellationToken::new()
}
