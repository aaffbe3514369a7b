// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{Fixture, PUBSUB_PREFIX};
use bf_core::{FakeClock, LogFrame, LogLevel};
use std::time::Duration;

async fn fixture_with_run() -> (Fixture, LogFanout<FakeClock>, RunId) {
    let fx = Fixture::new();
    let robot = fx.seed_robot("fanout-bot");
    let version = fx.seed_version(&robot.id, "1.0.0");
    let registry = fx.registry();
    let run = registry
        .create_run(
            &robot.id,
            crate::registry::ExecuteRequest { version_id: Some(version.id), ..Default::default() },
            crate::registry::RunOrigin::manual(None),
        )
        .await
        .unwrap();
    let fanout = LogFanout::new(
        fx.store.clone(),
        fx.broker_arc(),
        PUBSUB_PREFIX.to_string(),
        fx.clock.clone(),
    );
    let run_id = run.id;
    (fx, fanout, run_id)
}

#[tokio::test]
async fn append_persists_then_publishes() {
    let (fx, fanout, run_id) = fixture_with_run().await;
    let mut sub = fx
        .broker
        .subscribe(&run_log_channel(PUBSUB_PREFIX, &run_id))
        .await
        .unwrap();

    let entry = fanout.append(&run_id, LogLevel::Info, "Execution started.").await.unwrap();
    assert_eq!(entry.message, "Execution started.");

    // Persisted row.
    let rows = fx.store.run_logs(&run_id, 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, entry.id);

    // Live frame with the same content.
    let payload = sub.next_message(Duration::from_millis(300)).await.unwrap().unwrap();
    let frame: LogFrame = serde_json::from_str(&payload).unwrap();
    assert_eq!(frame.run_id, run_id);
    assert_eq!(frame.level, LogLevel::Info);
    assert_eq!(frame.message, "Execution started.");
    assert!(frame.timestamp.ends_with('Z'));
}

#[tokio::test]
async fn append_order_matches_persisted_id_order() {
    let (fx, fanout, run_id) = fixture_with_run().await;
    for i in 0..5 {
        fanout.append(&run_id, LogLevel::Info, &format!("line {i}")).await.unwrap();
    }
    let rows = fx.store.run_logs(&run_id, 10).unwrap();
    let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    let messages: Vec<_> = rows.iter().map(|r| r.message.clone()).collect();
    assert_eq!(messages, vec!["line 0", "line 1", "line 2", "line 3", "line 4"]);
}

#[tokio::test]
async fn append_to_unknown_run_fails_without_publishing() {
    let fx = Fixture::new();
    let fanout = LogFanout::new(
        fx.store.clone(),
        fx.broker_arc(),
        PUBSUB_PREFIX.to_string(),
        fx.clock.clone(),
    );
    let ghost = RunId::generate();
    let mut sub = fx
        .broker
        .subscribe(&run_log_channel(PUBSUB_PREFIX, &ghost))
        .await
        .unwrap();

    assert!(fanout.append(&ghost, LogLevel::Info, "nope").await.is_err());
    assert!(sub.next_message(Duration::from_millis(60)).await.unwrap().is_none());
}
