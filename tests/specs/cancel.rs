// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation of a running child.

use crate::harness::Harness;
use bf_core::{DomainError, RunStatus};
use bf_engine::{EngineError, ExecuteRequest, RunOrigin};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn cancel_terminates_the_run_within_budget() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("sleepy-bot", "sleep 60\n");
    harness.start_worker();
    let registry = harness.registry();

    let run = registry
        .create_run(&robot.id, ExecuteRequest::default(), RunOrigin::manual(None))
        .await
        .unwrap();

    harness
        .wait_for_run(&run.id, Duration::from_secs(20), |r| r.status == RunStatus::Running)
        .await;

    let first = registry.request_cancel(&run.id, "operator").unwrap();
    assert!(first.cancel_requested);
    // Idempotent second call succeeds and changes nothing.
    let second = registry.request_cancel(&run.id, "someone-else").unwrap();
    assert_eq!(second.canceled_by.as_deref(), Some("operator"));

    let canceled = harness
        .wait_for_run(&run.id, Duration::from_secs(10), |r| r.is_terminal())
        .await;
    assert_eq!(canceled.status, RunStatus::Canceled);
    assert!(canceled.canceled_at_ms.is_some());
    assert!(canceled.error_message.is_none());

    let logs = harness.store.run_logs(&run.id, 200).unwrap();
    assert!(logs.iter().any(|l| l.message == "Execution canceled by user"));
    assert!(logs.iter().any(|l| l.message == "Execution marked as CANCELED."));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_of_a_finished_run_conflicts() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("quick-bot", "exit 0\n");
    harness.start_worker();
    let registry = harness.registry();

    let run = registry
        .create_run(&robot.id, ExecuteRequest::default(), RunOrigin::manual(None))
        .await
        .unwrap();
    harness
        .wait_for_run(&run.id, Duration::from_secs(20), |r| r.is_terminal())
        .await;

    let err = registry.request_cancel(&run.id, "operator").unwrap_err();
    assert!(matches!(err, EngineError::Domain(DomainError::Conflict(_))));
}
