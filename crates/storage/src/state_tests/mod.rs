// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applier-level tests: every handler must be idempotent under replay.

use super::FleetState;
use bf_core::{
    AlertEvent, AlertId, AlertSeverity, AlertType, Event, LogLevel, RobotId, Run, RunId, RunLog,
    RunStatus, TriggerType, VersionId,
};

mod runs;

fn pending_run(id: &str) -> Run {
    Run {
        id: RunId::from_string(id),
        robot_id: RobotId::from_string("rbt-1"),
        robot_version_id: VersionId::from_string("ver-1"),
        status: RunStatus::Pending,
        trigger_type: TriggerType::Manual,
        attempt: 1,
        schedule_id: None,
        service_id: None,
        env_name: bf_core::EnvName::Test,
        parameters: serde_json::Value::Null,
        queued_at_ms: 1,
        started_at_ms: None,
        finished_at_ms: None,
        duration_seconds: None,
        host_name: None,
        process_id: None,
        cancel_requested: false,
        canceled_by: None,
        canceled_at_ms: None,
        error_message: None,
        triggered_by: None,
    }
}

#[test]
fn double_application_is_idempotent() {
    let events = vec![
        Event::RunCreated { run: pending_run("run-1") },
        Event::RunStarted {
            run_id: RunId::from_string("run-1"),
            host_name: "h".to_string(),
            started_at_ms: 10,
        },
        Event::LogAppended {
            entry: RunLog {
                id: 1,
                run_id: RunId::from_string("run-1"),
                timestamp_ms: 11,
                level: LogLevel::Info,
                message: "hello".to_string(),
            },
        },
        Event::RunFinished {
            run_id: RunId::from_string("run-1"),
            status: RunStatus::Success,
            finished_at_ms: 20,
            error_message: None,
        },
    ];

    let mut once = FleetState::new();
    for e in &events {
        once.apply_event(e);
    }

    let mut twice = FleetState::new();
    for e in &events {
        twice.apply_event(e);
        twice.apply_event(e);
    }

    let a = once.run("run-1").unwrap();
    let b = twice.run("run-1").unwrap();
    assert_eq!(a, b);
    assert_eq!(once.run_logs["run-1"].len(), twice.run_logs["run-1"].len());
}

#[test]
fn alert_open_drops_duplicates_even_with_new_ids() {
    let mut state = FleetState::new();
    let open = |id: &str| Event::AlertOpened {
        alert: AlertEvent {
            id: AlertId::from_string(id),
            robot_id: RobotId::from_string("rbt-1"),
            run_id: None,
            alert_type: AlertType::Late,
            severity: AlertSeverity::Warn,
            message: "late".to_string(),
            metadata: serde_json::Value::Null,
            created_at_ms: 1,
            resolved_at_ms: None,
        },
    };
    state.apply_event(&open("alr-1"));
    state.apply_event(&open("alr-2"));
    assert_eq!(state.alerts.len(), 1);

    state.apply_event(&Event::AlertResolved { alert_id: AlertId::from_string("alr-1"), at_ms: 9 });
    state.apply_event(&open("alr-3"));
    assert_eq!(state.alerts.len(), 2);
}
