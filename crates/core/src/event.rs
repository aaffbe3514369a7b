// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events that drive state transitions.
//!
//! Events are facts about what happened; the materialized state in
//! `bf-storage` is derived from them. Serializes with
//! `{"type": "domain:action", ...fields}` so the WAL stays readable.

use crate::alert::AlertEvent;
use crate::artifact::ArtifactFile;
use crate::id::{AlertId, RobotId, RunId, VersionId, WorkerId};
use crate::robot::{Robot, RobotVersion};
use crate::run::{Run, RunStatus};
use crate::runlog::RunLog;
use crate::schedule::Schedule;
use crate::sla::SlaRule;
use crate::worker::{WorkerRecord, WorkerStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- robot registry --
    #[serde(rename = "robot:registered")]
    RobotRegistered { robot: Robot },

    #[serde(rename = "robot:version_added")]
    VersionAdded { version: RobotVersion },

    /// Activating a version deactivates the robot's other versions in the
    /// same application step.
    #[serde(rename = "robot:version_activated")]
    VersionActivated { robot_id: RobotId, version_id: VersionId },

    // -- schedules and SLA rules --
    #[serde(rename = "schedule:upserted")]
    ScheduleUpserted { schedule: Schedule },

    #[serde(rename = "schedule:deleted")]
    ScheduleDeleted { robot_id: RobotId },

    #[serde(rename = "sla:upserted")]
    SlaRuleUpserted { rule: SlaRule },

    // -- run lifecycle --
    #[serde(rename = "run:created")]
    RunCreated { run: Run },

    #[serde(rename = "run:started")]
    RunStarted { run_id: RunId, host_name: String, started_at_ms: u64 },

    #[serde(rename = "run:process")]
    RunProcess {
        run_id: RunId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        process_id: Option<u32>,
    },

    #[serde(rename = "run:cancel_requested")]
    RunCancelRequested { run_id: RunId, actor: String, at_ms: u64 },

    /// Terminal transition. `duration_seconds` and `canceled_at` are derived
    /// during application; a second finish for the same run is ignored.
    #[serde(rename = "run:finished")]
    RunFinished {
        run_id: RunId,
        status: RunStatus,
        finished_at_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },

    // -- logs and artifacts --
    #[serde(rename = "log:appended")]
    LogAppended { entry: RunLog },

    #[serde(rename = "artifact:recorded")]
    ArtifactRecorded { artifact: ArtifactFile },

    // -- alerts --
    /// Dropped during application if an unresolved alert already exists for
    /// the same `(robot, alert_type)`.
    #[serde(rename = "alert:opened")]
    AlertOpened { alert: AlertEvent },

    #[serde(rename = "alert:resolved")]
    AlertResolved { alert_id: AlertId, at_ms: u64 },

    // -- workers --
    #[serde(rename = "worker:upserted")]
    WorkerUpserted { worker: WorkerRecord },

    #[serde(rename = "worker:heartbeat")]
    WorkerHeartbeat { worker_id: WorkerId, at_ms: u64 },

    #[serde(rename = "worker:status_changed")]
    WorkerStatusChanged { worker_id: WorkerId, status: WorkerStatus },
}

impl Event {
    /// Stable name for tracing and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Event::RobotRegistered { .. } => "robot:registered",
            Event::VersionAdded { .. } => "robot:version_added",
            Event::VersionActivated { .. } => "robot:version_activated",
            Event::ScheduleUpserted { .. } => "schedule:upserted",
            Event::ScheduleDeleted { .. } => "schedule:deleted",
            Event::SlaRuleUpserted { .. } => "sla:upserted",
            Event::RunCreated { .. } => "run:created",
            Event::RunStarted { .. } => "run:started",
            Event::RunProcess { .. } => "run:process",
            Event::RunCancelRequested { .. } => "run:cancel_requested",
            Event::RunFinished { .. } => "run:finished",
            Event::LogAppended { .. } => "log:appended",
            Event::ArtifactRecorded { .. } => "artifact:recorded",
            Event::AlertOpened { .. } => "alert:opened",
            Event::AlertResolved { .. } => "alert:resolved",
            Event::WorkerUpserted { .. } => "worker:upserted",
            Event::WorkerHeartbeat { .. } => "worker:heartbeat",
            Event::WorkerStatusChanged { .. } => "worker:status_changed",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
