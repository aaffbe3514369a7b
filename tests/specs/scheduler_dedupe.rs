// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-replica scheduler dedupe against one shared store.

use crate::harness::Harness;
use bf_core::TriggerType;
use bf_engine::{SchedulerConfig, SchedulerLoop};
use bf_storage::RunFilter;

fn replica(harness: &Harness) -> SchedulerLoop<bf_core::SystemClock> {
    SchedulerLoop::new(
        harness.store.clone(),
        harness.broker_arc(),
        harness.registry(),
        harness.clock,
        SchedulerConfig::default(),
    )
}

/// Park until the current minute has comfortably more than `need` seconds
/// left, so a test's ticks cannot straddle a minute boundary.
async fn await_minute_headroom(need: u64) {
    loop {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let into_minute = (now_ms % 60_000) / 1_000;
        if 60 - into_minute > need {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_replicas_dispatch_exactly_once_per_minute() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("cron-bot", "exit 0\n");
    let mut schedule = harness.schedule(&robot.id, 30, 0, 1);
    // One PENDING run gates later minutes too, keeping the count stable.
    schedule.max_concurrency = 1;
    harness.store.update_schedule(schedule).unwrap();
    await_minute_headroom(10).await;

    let replica_a = replica(&harness);
    let replica_b = replica(&harness);

    let (a, b) = tokio::join!(replica_a.tick(), replica_b.tick());
    assert_eq!(a.dispatched + b.dispatched, 1, "a={a:?} b={b:?}");

    // Repeated ticks inside the same minute never double-dispatch.
    for _ in 0..3 {
        let (a, b) = tokio::join!(replica_a.tick(), replica_b.tick());
        assert_eq!(a.dispatched + b.dispatched, 0);
    }

    let filter = RunFilter { trigger_type: Some(TriggerType::Scheduled), ..Default::default() };
    let (runs, total) = harness.store.list_runs(&filter, 0, 10);
    assert_eq!(total, 1);
    assert_eq!(runs[0].attempt, 1);
    assert_eq!(runs[0].robot_id, robot.id);
}
