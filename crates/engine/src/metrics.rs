// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric names and recording helpers.
//!
//! Recorded through the `metrics` facade; the embedder decides the exporter.

use bf_core::RunStatus;

pub const RUNS_TOTAL: &str = "botfleet_runs_total";
pub const RUNS_FAILED_TOTAL: &str = "botfleet_runs_failed_total";
pub const RUN_DURATION_SECONDS: &str = "botfleet_run_duration_seconds";
pub const QUEUE_DEPTH: &str = "botfleet_queue_depth";
pub const WORKER_HEARTBEAT_UNIX: &str = "botfleet_worker_heartbeat_unix";

/// Count a completed run and observe its duration.
pub fn record_run_completed(status: RunStatus, duration_seconds: Option<f64>) {
    ::metrics::counter!(RUNS_TOTAL).increment(1);
    if status == RunStatus::Failed {
        ::metrics::counter!(RUNS_FAILED_TOTAL).increment(1);
    }
    if let Some(duration) = duration_seconds {
        ::metrics::histogram!(RUN_DURATION_SECONDS).record(duration);
    }
}

/// Current broker queue depth.
pub fn set_queue_depth(depth: usize) {
    ::metrics::gauge!(QUEUE_DEPTH).set(depth as f64);
}

/// Last heartbeat timestamp for one worker label.
pub fn record_worker_heartbeat(worker: &str, epoch_seconds: f64) {
    ::metrics::gauge!(WORKER_HEARTBEAT_UNIX, "worker" => worker.to_string()).set(epoch_seconds);
}
