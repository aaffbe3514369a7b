// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized fleet state built from event replay.

mod alerts;
mod robots;
mod runs;
mod workers;

use bf_core::{
    AlertEvent, AlertType, ArtifactFile, Event, Robot, RobotId, RobotVersion, Run, RunLog,
    Schedule, SlaRule, WorkerRecord,
};
use std::collections::HashMap;

/// All persisted entities, derived from the WAL.
///
/// # Idempotency requirement
///
/// Every event handler MUST be idempotent: applying the same event twice must
/// produce the same state as applying it once. Replay after a crash can
/// deliver an event whose effects are already visible. Guidelines:
///
/// - use assignment instead of `+=`-style mutation
/// - guard inserts with existence checks
/// - guard terminal transitions on the current status
#[derive(Debug, Default, Clone)]
pub struct FleetState {
    pub robots: HashMap<String, Robot>,
    pub versions: HashMap<String, RobotVersion>,
    /// Keyed by schedule id; at most one entry per robot.
    pub schedules: HashMap<String, Schedule>,
    /// Keyed by rule id; at most one entry per robot.
    pub sla_rules: HashMap<String, SlaRule>,
    pub runs: HashMap<String, Run>,
    /// Ascending-id log lines per run.
    pub run_logs: HashMap<String, Vec<RunLog>>,
    pub artifacts: HashMap<String, Vec<ArtifactFile>>,
    pub alerts: HashMap<String, AlertEvent>,
    pub workers: HashMap<String, WorkerRecord>,
    /// Next monotonic run-log id to assign.
    pub next_log_id: u64,
}

impl FleetState {
    pub fn new() -> Self {
        Self { next_log_id: 1, ..Self::default() }
    }

    /// Apply an event to derive state changes.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::RobotRegistered { .. }
            | Event::VersionAdded { .. }
            | Event::VersionActivated { .. }
            | Event::ScheduleUpserted { .. }
            | Event::ScheduleDeleted { .. }
            | Event::SlaRuleUpserted { .. } => robots::apply(self, event),

            Event::RunCreated { .. }
            | Event::RunStarted { .. }
            | Event::RunProcess { .. }
            | Event::RunCancelRequested { .. }
            | Event::RunFinished { .. }
            | Event::LogAppended { .. }
            | Event::ArtifactRecorded { .. } => runs::apply(self, event),

            Event::AlertOpened { .. } | Event::AlertResolved { .. } => alerts::apply(self, event),

            Event::WorkerUpserted { .. }
            | Event::WorkerHeartbeat { .. }
            | Event::WorkerStatusChanged { .. } => workers::apply(self, event),
        }
    }

    pub fn robot(&self, id: &str) -> Option<&Robot> {
        self.robots.get(id)
    }

    pub fn version(&self, id: &str) -> Option<&RobotVersion> {
        self.versions.get(id)
    }

    /// The robot's single active version, if any.
    pub fn active_version(&self, robot_id: &RobotId) -> Option<&RobotVersion> {
        self.versions
            .values()
            .find(|v| &v.robot_id == robot_id && v.is_active)
    }

    pub fn run(&self, id: &str) -> Option<&Run> {
        self.runs.get(id)
    }

    pub fn schedule_for_robot(&self, robot_id: &RobotId) -> Option<&Schedule> {
        self.schedules.values().find(|s| &s.robot_id == robot_id)
    }

    pub fn sla_rule_for_robot(&self, robot_id: &RobotId) -> Option<&SlaRule> {
        self.sla_rules.values().find(|r| &r.robot_id == robot_id)
    }

    /// The unresolved alert for `(robot, type)`, if one exists.
    pub fn unresolved_alert(&self, robot_id: &RobotId, alert_type: AlertType) -> Option<&AlertEvent> {
        self.alerts.values().find(|a| {
            &a.robot_id == robot_id && a.alert_type == alert_type && !a.is_resolved()
        })
    }
}

#[cfg(test)]
#[path = "../state_tests/mod.rs"]
mod tests;
