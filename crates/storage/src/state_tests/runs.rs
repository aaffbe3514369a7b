// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn terminal_status_is_a_sink() {
    let mut state = FleetState::new();
    state.apply_event(&Event::RunCreated { run: pending_run("run-1") });
    state.apply_event(&Event::RunStarted {
        run_id: RunId::from_string("run-1"),
        host_name: "h".to_string(),
        started_at_ms: 1_000,
    });
    state.apply_event(&Event::RunFinished {
        run_id: RunId::from_string("run-1"),
        status: RunStatus::Canceled,
        finished_at_ms: 3_000,
        error_message: None,
    });

    // A late FAILED finish (duplicate lease, crashed worker) is ignored.
    state.apply_event(&Event::RunFinished {
        run_id: RunId::from_string("run-1"),
        status: RunStatus::Failed,
        finished_at_ms: 9_000,
        error_message: Some("late".to_string()),
    });

    let run = state.run("run-1").unwrap();
    assert_eq!(run.status, RunStatus::Canceled);
    assert_eq!(run.finished_at_ms, Some(3_000));
    assert_eq!(run.duration_seconds, Some(2.0));
    assert_eq!(run.canceled_at_ms, Some(3_000));
}

#[test]
fn cancel_request_is_monotonic() {
    let mut state = FleetState::new();
    state.apply_event(&Event::RunCreated { run: pending_run("run-1") });
    state.apply_event(&Event::RunStarted {
        run_id: RunId::from_string("run-1"),
        host_name: "h".to_string(),
        started_at_ms: 1,
    });
    state.apply_event(&Event::RunCancelRequested {
        run_id: RunId::from_string("run-1"),
        actor: "alice".to_string(),
        at_ms: 5,
    });
    state.apply_event(&Event::RunCancelRequested {
        run_id: RunId::from_string("run-1"),
        actor: "bob".to_string(),
        at_ms: 9,
    });

    let run = state.run("run-1").unwrap();
    assert!(run.cancel_requested);
    assert_eq!(run.canceled_by.as_deref(), Some("alice"));
    assert_eq!(run.canceled_at_ms, Some(5));
}

#[test]
fn started_only_applies_to_pending_runs() {
    let mut state = FleetState::new();
    state.apply_event(&Event::RunCreated { run: pending_run("run-1") });
    state.apply_event(&Event::RunStarted {
        run_id: RunId::from_string("run-1"),
        host_name: "first".to_string(),
        started_at_ms: 10,
    });
    // Replayed duplicate with different data does not clobber the original.
    state.apply_event(&Event::RunStarted {
        run_id: RunId::from_string("run-1"),
        host_name: "second".to_string(),
        started_at_ms: 99,
    });

    let run = state.run("run-1").unwrap();
    assert_eq!(run.host_name.as_deref(), Some("first"));
    assert_eq!(run.started_at_ms, Some(10));
}

#[test]
fn stale_log_entries_are_dropped_on_replay() {
    let mut state = FleetState::new();
    state.apply_event(&Event::RunCreated { run: pending_run("run-1") });
    let entry = |id: u64, msg: &str| Event::LogAppended {
        entry: RunLog {
            id,
            run_id: RunId::from_string("run-1"),
            timestamp_ms: id,
            level: LogLevel::Info,
            message: msg.to_string(),
        },
    };
    state.apply_event(&entry(1, "a"));
    state.apply_event(&entry(2, "b"));
    state.apply_event(&entry(2, "b"));
    state.apply_event(&entry(1, "a"));

    let ids: Vec<u64> = state.run_logs["run-1"].iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(state.next_log_id, 3);
}
