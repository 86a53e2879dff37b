use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::*;

#[tokio::test]
async fn pop_returns_events_in_insertion_order() {
    let queue = EventQueue::new();
    let cancel = CancellationToken::new();
    let events = vec![
        Event::create("default/a"),
        Event::update("default/b"),
        Event::delete("default/c"),
        Event::create("default/d"),
    ];

    for event in &events {
        queue.insert(event.clone());
    }
    assert_eq!(queue.len(), 4);

    for expected in events {
        assert_eq!(queue.pop(&cancel).await, Some(expected));
    }
    assert!(queue.is_empty());
}

#[tokio::test]
async fn insert_after_expiry_is_a_noop() {
    let queue = EventQueue::new();
    queue.insert(Event::create("a"));
    queue.set_expired();

    queue.insert(Event::create("b"));

    assert_eq!(queue.len(), 1);
    assert!(queue.is_expired());
}

#[tokio::test]
async fn pop_after_expiry_returns_none_without_blocking() {
    let queue = EventQueue::new();
    let cancel = CancellationToken::new();
    queue.insert(Event::create("a"));
    queue.set_expired();
    queue.set_expired();

    let popped = timeout(Duration::from_millis(50), queue.pop(&cancel))
        .await
        .expect("pop must not block on an expired queue");

    assert_eq!(popped, None);
}

#[tokio::test]
async fn blocked_pop_wakes_on_insert() {
    let queue = Arc::new(EventQueue::new());
    let cancel = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.pop(&cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.insert(Event::update("ns/x"));

    let popped = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
    assert_eq!(popped, Some(Event::update("ns/x")));
}

#[tokio::test]
async fn blocked_pop_wakes_on_expiry() {
    let queue = Arc::new(EventQueue::new());
    let cancel = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.pop(&cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.set_expired();

    let popped = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
    assert_eq!(popped, None);
}

#[tokio::test]
async fn blocked_pop_wakes_on_cancel() {
    let queue = Arc::new(EventQueue::new());
    let cancel = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.pop(&cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let popped = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
    assert_eq!(popped, None);
    // cancellation does not expire the queue
    assert!(!queue.is_expired());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_lose_no_events() {
    let queue = Arc::new(EventQueue::new());
    let cancel = CancellationToken::new();
    let producers = 4;
    let per_producer = 250;

    let mut handles = Vec::new();
    for p in 0..producers {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..per_producer {
                queue.insert(Event::create(format!("p{p}/{i}")));
                tokio::task::yield_now().await;
            }
        }));
    }

    let mut received = Vec::new();
    while received.len() < producers * per_producer {
        let event = timeout(Duration::from_secs(5), queue.pop(&cancel))
            .await
            .expect("consumer starved")
            .expect("queue expired unexpectedly");
        received.push(event.key);
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // per-producer order is preserved
    for p in 0..producers {
        let prefix = format!("p{p}/");
        let seen: Vec<usize> = received
            .iter()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(seen, (0..per_producer).collect::<Vec<_>>());
    }
    assert!(queue.is_empty());
}

#[test]
fn expire_if_drained_only_expires_an_empty_queue() {
    let queue = EventQueue::new();
    queue.insert(Event::delete("a"));

    assert!(!queue.expire_if_drained());
    assert!(!queue.is_expired());

    let queue = EventQueue::new();
    assert!(queue.expire_if_drained());
    assert!(queue.is_expired());
}
