// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registry event application.

use super::FleetState;
use bf_core::Event;

pub(super) fn apply(state: &mut FleetState, event: &Event) {
    match event {
        Event::WorkerUpserted { worker } => {
            state.workers.insert(worker.id.as_str().to_string(), worker.clone());
        }

        Event::WorkerHeartbeat { worker_id, at_ms } => {
            if let Some(worker) = state.workers.get_mut(worker_id.as_str()) {
                worker.last_heartbeat_ms = *at_ms;
            }
        }

        Event::WorkerStatusChanged { worker_id, status } => {
            if let Some(worker) = state.workers.get_mut(worker_id.as_str()) {
                worker.status = *status;
            }
        }

        _ => {}
    }
}
