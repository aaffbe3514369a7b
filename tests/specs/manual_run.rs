// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy-path manual execution.

use crate::harness::Harness;
use bf_core::{LogLevel, RunStatus, TriggerType};
use bf_engine::{ExecuteRequest, RunOrigin};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn manual_run_succeeds_with_logs_and_artifacts() {
    let harness = Harness::new();
    let (robot, version) = harness.robot_with_script("happy-bot", "echo ok\nexit 0\n");
    harness.start_worker();

    let run = harness
        .registry()
        .create_run(
            &robot.id,
            ExecuteRequest::default(),
            RunOrigin::manual(Some("operator".to_string())),
        )
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Pending);
    assert_eq!(run.trigger_type, TriggerType::Manual);
    assert_eq!(run.robot_version_id, version.id);

    let finished = harness
        .wait_for_run(&run.id, Duration::from_secs(20), |r| r.is_terminal())
        .await;
    assert_eq!(finished.status, RunStatus::Success);
    assert!(finished.error_message.is_none());
    assert!(finished.started_at_ms.is_some());
    assert!(finished.duration_seconds.unwrap() >= 0.0);
    assert_eq!(finished.host_name.as_deref(), Some("spec-host"));
    assert!(finished.process_id.is_none());

    let logs = harness.store.run_logs(&run.id, 100).unwrap();
    let info_lines: Vec<_> = logs
        .iter()
        .filter(|l| l.level == LogLevel::Info)
        .map(|l| l.message.as_str())
        .collect();
    assert!(info_lines.len() >= 2, "expected at least 2 INFO lines: {info_lines:?}");
    assert!(info_lines.contains(&"Execution started."));
    assert!(info_lines.contains(&"ok"), "captured stdout missing: {info_lines:?}");
    assert!(info_lines.contains(&"Execution finished successfully."));

    // Exactly one produced artifact: the run.log. The extracted workspace
    // is input, not output.
    let artifacts = harness.store.run_artifacts(&run.id);
    assert_eq!(artifacts.len(), 1, "artifacts: {artifacts:?}");
    assert_eq!(artifacts[0].name, "run.log");
    assert!(artifacts[0].file_path.exists());
    assert!(artifacts[0].size_bytes > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn stderr_lines_are_captured_as_errors() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("noisy-bot", "echo warn >&2\nexit 0\n");
    harness.start_worker();

    let run = harness
        .registry()
        .create_run(&robot.id, ExecuteRequest::default(), RunOrigin::manual(None))
        .await
        .unwrap();
    harness
        .wait_for_run(&run.id, Duration::from_secs(20), |r| r.is_terminal())
        .await;

    let logs = harness.store.run_logs(&run.id, 100).unwrap();
    assert!(logs
        .iter()
        .any(|l| l.level == LogLevel::Error && l.message == "warn"));
}

#[tokio::test(flavor = "multi_thread")]
async fn runtime_env_reaches_the_child() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("env-bot", "echo \"GREETING=$GREETING\"\n");
    harness.start_worker();

    let run = harness
        .registry()
        .create_run(
            &robot.id,
            ExecuteRequest {
                runtime_env: [("GREETING".to_string(), "hello".to_string())].into(),
                ..Default::default()
            },
            RunOrigin::manual(None),
        )
        .await
        .unwrap();
    let finished = harness
        .wait_for_run(&run.id, Duration::from_secs(20), |r| r.is_terminal())
        .await;
    assert_eq!(finished.status, RunStatus::Success);

    let logs = harness.store.run_logs(&run.id, 100).unwrap();
    assert!(logs.iter().any(|l| l.message == "GREETING=hello"));
}
