// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock timeout enforcement.

use crate::harness::Harness;
use bf_core::{LogLevel, RunStatus};
use bf_engine::{ExecuteRequest, RunOrigin};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn timeout_fails_the_run_with_the_timeout_marker() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("stuck-bot", "sleep 30\n");
    let schedule = harness.schedule(&robot.id, 2, 0, 1);
    harness.start_worker();

    let run = harness
        .registry()
        .create_run(
            &robot.id,
            ExecuteRequest::default(),
            RunOrigin::scheduled(schedule.id.clone()),
        )
        .await
        .unwrap();

    let finished = harness
        .wait_for_run(&run.id, Duration::from_secs(20), |r| r.is_terminal())
        .await;
    assert_eq!(finished.status, RunStatus::Failed);
    assert_eq!(finished.error_message.as_deref(), Some("TIMEOUT"));
    assert!(finished.duration_seconds.unwrap() >= 2.0);

    let logs = harness.store.run_logs(&run.id, 200).unwrap();
    assert!(logs
        .iter()
        .any(|l| l.level == LogLevel::Error && l.message == "TIMEOUT: exceeded 2 seconds."));

    // retry_count=0: the failure produces no successor.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let (_, total) = harness.store.list_runs(&Default::default(), 0, 10);
    assert_eq!(total, 1);
}
