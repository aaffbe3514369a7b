// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry chains for schedule-owned failures.

use crate::harness::Harness;
use bf_core::{RunStatus, TriggerType};
use bf_engine::{ExecuteRequest, RunOrigin};
use bf_storage::RunFilter;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn failed_run_retries_until_the_attempt_budget_is_spent() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("failing-bot", "exit 1\n");
    let schedule = harness.schedule(&robot.id, 30, 2, 1);
    harness.start_worker();

    let root = harness
        .registry()
        .create_run(
            &robot.id,
            ExecuteRequest::default(),
            RunOrigin::scheduled(schedule.id.clone()),
        )
        .await
        .unwrap();
    assert_eq!(root.attempt, 1);

    let filter = RunFilter { robot_id: Some(robot.id.clone()), ..Default::default() };

    // Root plus exactly two RETRY successors, each one attempt later.
    harness
        .wait_until(Duration::from_secs(30), "three terminal runs", || {
            let (runs, total) = harness.store.list_runs(&filter, 0, 10);
            total == 3 && runs.iter().all(|r| r.is_terminal())
        })
        .await;

    // Settle to prove the chain stops at the budget.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let (runs, total) = harness.store.list_runs(&filter, 0, 10);
    assert_eq!(total, 3);

    let mut attempts: Vec<u32> = runs.iter().map(|r| r.attempt).collect();
    attempts.sort_unstable();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert!(runs.iter().all(|r| r.status == RunStatus::Failed));
    assert!(runs
        .iter()
        .all(|r| r.error_message.as_deref() == Some("Process returned exit code 1")));

    for run in &runs {
        let expected = if run.attempt == 1 { TriggerType::Scheduled } else { TriggerType::Retry };
        assert_eq!(run.trigger_type, expected, "attempt {}", run.attempt);
        assert_eq!(run.schedule_id.as_ref(), Some(&schedule.id));
    }

    // Each predecessor logged the retry hand-off.
    let root_logs = harness.store.run_logs(&root.id, 200).unwrap();
    assert!(root_logs.iter().any(|l| l.message.starts_with("Retry scheduled: attempt=2")));
}
