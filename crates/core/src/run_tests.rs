// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    pending = { RunStatus::Pending, false },
    running = { RunStatus::Running, false },
    success = { RunStatus::Success, true },
    failed = { RunStatus::Failed, true },
    canceled = { RunStatus::Canceled, true },
)]
fn terminal_statuses(status: RunStatus, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn status_serializes_screaming() {
    assert_eq!(serde_json::to_string(&RunStatus::Pending).unwrap(), "\"PENDING\"");
    assert_eq!(serde_json::to_string(&RunStatus::Canceled).unwrap(), "\"CANCELED\"");
    assert_eq!(RunStatus::Failed.to_string(), "FAILED");
}

#[test]
fn trigger_type_serializes_screaming() {
    assert_eq!(serde_json::to_string(&TriggerType::Scheduled).unwrap(), "\"SCHEDULED\"");
    let back: TriggerType = serde_json::from_str("\"RETRY\"").unwrap();
    assert_eq!(back, TriggerType::Retry);
}

#[test]
fn run_round_trips_through_json() {
    let run = Run {
        id: RunId::from_string("run-1"),
        robot_id: RobotId::from_string("rbt-1"),
        robot_version_id: VersionId::from_string("ver-1"),
        status: RunStatus::Pending,
        trigger_type: TriggerType::Manual,
        attempt: 1,
        schedule_id: None,
        service_id: None,
        env_name: EnvName::Prod,
        parameters: serde_json::json!({"key": "value"}),
        queued_at_ms: 42,
        started_at_ms: None,
        finished_at_ms: None,
        duration_seconds: None,
        host_name: None,
        process_id: None,
        cancel_requested: false,
        canceled_by: None,
        canceled_at_ms: None,
        error_message: None,
        triggered_by: Some("operator".into()),
    };
    let json = serde_json::to_string(&run).unwrap();
    let back: Run = serde_json::from_str(&json).unwrap();
    assert_eq!(back, run);
}
