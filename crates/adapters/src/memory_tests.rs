// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn queue_is_fifo() {
    let broker = MemoryBroker::new();
    broker.push_back("q", "a".to_string()).await.unwrap();
    broker.push_back("q", "b".to_string()).await.unwrap();
    assert_eq!(broker.queue_len("q").await.unwrap(), 2);

    let first = broker.pop_front("q", Duration::from_millis(10)).await.unwrap();
    let second = broker.pop_front("q", Duration::from_millis(10)).await.unwrap();
    assert_eq!(first.as_deref(), Some("a"));
    assert_eq!(second.as_deref(), Some("b"));
    assert_eq!(broker.queue_len("q").await.unwrap(), 0);
}

#[tokio::test]
async fn pop_times_out_on_empty_queue() {
    let broker = MemoryBroker::new();
    let got = broker.pop_front("empty", Duration::from_millis(30)).await.unwrap();
    assert!(got.is_none());
}

#[tokio::test]
async fn pop_sees_a_concurrent_push() {
    let broker = MemoryBroker::new();
    let pusher = broker.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        pusher.push_back("q", "late".to_string()).await.unwrap();
    });
    let got = broker.pop_front("q", Duration::from_millis(500)).await.unwrap();
    assert_eq!(got.as_deref(), Some("late"));
}

#[tokio::test]
async fn publish_reaches_live_subscribers_only() {
    let broker = MemoryBroker::new();
    broker.publish("c", "before".to_string()).await.unwrap();

    let mut sub = broker.subscribe("c").await.unwrap();
    broker.publish("c", "after".to_string()).await.unwrap();

    let got = sub.next_message(Duration::from_millis(200)).await.unwrap();
    assert_eq!(got.as_deref(), Some("after"));
    let nothing = sub.next_message(Duration::from_millis(30)).await.unwrap();
    assert!(nothing.is_none());
}

#[tokio::test]
async fn keys_expire_after_ttl() {
    let broker = MemoryBroker::new();
    broker.set_key("workers:a", "1.0".to_string(), Duration::from_millis(25)).await.unwrap();
    broker.set_key("workers:b", "2.0".to_string(), Duration::from_secs(60)).await.unwrap();

    let mut live = broker.keys_with_prefix("workers:").await.unwrap();
    live.sort();
    assert_eq!(live, vec!["workers:a", "workers:b"]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(broker.get_key("workers:a").await.unwrap().is_none());
    let live = broker.keys_with_prefix("workers:").await.unwrap();
    assert_eq!(live, vec!["workers:b"]);
}

#[tokio::test]
async fn dispatch_lock_is_exclusive_until_dropped() {
    let broker = MemoryBroker::new();
    let guard = broker.try_dispatch_lock("schedule-dispatch:rbt-1");
    assert!(guard.is_some());
    assert!(broker.try_dispatch_lock("schedule-dispatch:rbt-1").is_none());
    // A different name is independent.
    assert!(broker.try_dispatch_lock("schedule-dispatch:rbt-2").is_some());

    drop(guard);
    assert!(broker.try_dispatch_lock("schedule-dispatch:rbt-1").is_some());
}
