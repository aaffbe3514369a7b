// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle, log, and artifact event application.

use super::FleetState;
use bf_core::{Event, RunStatus};

pub(super) fn apply(state: &mut FleetState, event: &Event) {
    match event {
        Event::RunCreated { run } => {
            state
                .runs
                .entry(run.id.as_str().to_string())
                .or_insert_with(|| run.clone());
        }

        Event::RunStarted { run_id, host_name, started_at_ms } => {
            if let Some(run) = state.runs.get_mut(run_id.as_str()) {
                if run.status == RunStatus::Pending {
                    run.status = RunStatus::Running;
                    run.started_at_ms = Some(*started_at_ms);
                    run.host_name = Some(host_name.clone());
                }
            }
        }

        Event::RunProcess { run_id, process_id } => {
            if let Some(run) = state.runs.get_mut(run_id.as_str()) {
                if !run.is_terminal() {
                    run.process_id = *process_id;
                }
            }
        }

        Event::RunCancelRequested { run_id, actor, at_ms } => {
            if let Some(run) = state.runs.get_mut(run_id.as_str()) {
                // Monotonic: the first request wins and is never cleared.
                if !run.cancel_requested {
                    run.cancel_requested = true;
                    run.canceled_by = Some(actor.clone());
                    run.canceled_at_ms = Some(*at_ms);
                }
            }
        }

        Event::RunFinished { run_id, status, finished_at_ms, error_message } => {
            if let Some(run) = state.runs.get_mut(run_id.as_str()) {
                // Terminal status is a sink.
                if run.is_terminal() {
                    return;
                }
                run.status = *status;
                run.finished_at_ms = Some(*finished_at_ms);
                run.duration_seconds = run
                    .started_at_ms
                    .map(|started| finished_at_ms.saturating_sub(started) as f64 / 1000.0);
                run.process_id = None;
                run.error_message = error_message.clone();
                if *status == RunStatus::Canceled {
                    run.canceled_at_ms = Some(*finished_at_ms);
                    run.error_message = None;
                }
            }
        }

        Event::LogAppended { entry } => {
            let logs = state.run_logs.entry(entry.run_id.as_str().to_string()).or_default();
            // Replay guard: ids are monotonic, so a duplicate or stale entry
            // never lands after a newer one.
            if logs.last().map_or(true, |last| last.id < entry.id) {
                logs.push(entry.clone());
            }
            state.next_log_id = state.next_log_id.max(entry.id + 1);
        }

        Event::ArtifactRecorded { artifact } => {
            let files = state.artifacts.entry(artifact.run_id.as_str().to_string()).or_default();
            if !files.iter().any(|f| f.file_path == artifact.file_path) {
                files.push(artifact.clone());
            }
        }

        _ => {}
    }
}
