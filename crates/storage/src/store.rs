// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository-style store over the WAL and materialized state.
//!
//! Each mutating method validates against the current state, commits exactly
//! the events it needs (WAL append + apply under one lock), and returns the
//! post-commit entity. Lock order is always WAL before state.

use crate::state::FleetState;
use crate::wal::{Wal, WalError};
use bf_core::robot::is_valid_semver;
use bf_core::{
    AlertEvent, AlertId, AlertType, ArtifactFile, DomainError, Event, LogLevel, Robot, RobotId,
    RobotVersion, Run, RunId, RunLog, RunStatus, Schedule, SlaRule, TriggerType, VersionId,
    WorkerId, WorkerRecord, WorkerStatus,
};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage error: {0}")]
    Wal(#[from] WalError),
}

/// Filter for [`Store::list_runs`].
#[derive(Debug, Default, Clone)]
pub struct RunFilter {
    pub robot_id: Option<RobotId>,
    pub service_id: Option<String>,
    pub trigger_type: Option<TriggerType>,
    pub status: Option<RunStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatusFilter {
    Open,
    Resolved,
}

/// Filter for [`Store::list_alerts`].
#[derive(Debug, Default, Clone)]
pub struct AlertFilter {
    pub status: Option<AlertStatusFilter>,
    pub alert_type: Option<AlertType>,
    pub robot_id: Option<RobotId>,
}

/// Source of truth for the fleet.
pub struct Store {
    wal: Mutex<Wal>,
    state: RwLock<FleetState>,
}

impl Store {
    /// Open or create a store at the given WAL path, replaying history.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let (wal, events) = Wal::open(path)?;
        let mut state = FleetState::new();
        for event in &events {
            state.apply_event(event);
        }
        tracing::debug!(path = %path.display(), replayed = events.len(), "store opened");
        Ok(Self { wal: Mutex::new(wal), state: RwLock::new(state) })
    }

    /// Snapshot accessor for read-only queries.
    pub fn read<R>(&self, f: impl FnOnce(&FleetState) -> R) -> R {
        f(&self.state.read())
    }

    fn begin(&self) -> (MutexGuard<'_, Wal>, RwLockWriteGuard<'_, FleetState>) {
        (self.wal.lock(), self.state.write())
    }

    fn commit(
        wal: &mut Wal,
        state: &mut FleetState,
        event: Event,
    ) -> Result<(), StoreError> {
        wal.append(&event)?;
        state.apply_event(&event);
        Ok(())
    }

    // -- robots and versions --

    pub fn create_robot(&self, robot: Robot) -> Result<Robot, StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.robots.values().any(|r| r.name == robot.name) {
            return Err(DomainError::Duplicate(format!("robot name {:?}", robot.name)).into());
        }
        Self::commit(&mut wal, &mut state, Event::RobotRegistered { robot: robot.clone() })?;
        Ok(robot)
    }

    pub fn get_robot(&self, id: &RobotId) -> Result<Robot, StoreError> {
        self.read(|s| s.robot(id.as_str()).cloned())
            .ok_or_else(|| DomainError::RobotNotFound.into())
    }

    pub fn list_robots(&self) -> Vec<Robot> {
        let mut robots = self.read(|s| s.robots.values().cloned().collect::<Vec<_>>());
        robots.sort_by(|a, b| a.name.cmp(&b.name));
        robots
    }

    pub fn add_version(&self, version: RobotVersion) -> Result<RobotVersion, StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.robot(version.robot_id.as_str()).is_none() {
            return Err(DomainError::RobotNotFound.into());
        }
        if !is_valid_semver(&version.version) {
            return Err(DomainError::Invalid(format!("invalid semver {:?}", version.version)).into());
        }
        let exists = state
            .versions
            .values()
            .any(|v| v.robot_id == version.robot_id && v.version == version.version);
        if exists {
            return Err(DomainError::Duplicate(format!(
                "version {:?} already exists for this robot",
                version.version
            ))
            .into());
        }
        Self::commit(&mut wal, &mut state, Event::VersionAdded { version: version.clone() })?;
        Ok(version)
    }

    pub fn activate_version(
        &self,
        robot_id: &RobotId,
        version_id: &VersionId,
    ) -> Result<RobotVersion, StoreError> {
        let (mut wal, mut state) = self.begin();
        let owned = state
            .version(version_id.as_str())
            .map(|v| &v.robot_id == robot_id)
            .unwrap_or(false);
        if !owned {
            return Err(DomainError::VersionNotFound.into());
        }
        Self::commit(
            &mut wal,
            &mut state,
            Event::VersionActivated { robot_id: robot_id.clone(), version_id: version_id.clone() },
        )?;
        state
            .version(version_id.as_str())
            .cloned()
            .ok_or_else(|| DomainError::VersionNotFound.into())
    }

    pub fn get_version(&self, id: &VersionId) -> Result<RobotVersion, StoreError> {
        self.read(|s| s.version(id.as_str()).cloned())
            .ok_or_else(|| DomainError::VersionNotFound.into())
    }

    pub fn list_versions(&self, robot_id: &RobotId) -> Vec<RobotVersion> {
        let mut versions = self.read(|s| {
            s.versions
                .values()
                .filter(|v| &v.robot_id == robot_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        versions.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        versions
    }

    /// Resolve the version a run should execute: the requested one (which
    /// must belong to the robot) or the robot's active version.
    pub fn resolve_version(
        &self,
        robot_id: &RobotId,
        requested: Option<&VersionId>,
    ) -> Result<RobotVersion, StoreError> {
        self.read(|s| {
            if s.robot(robot_id.as_str()).is_none() {
                return Err(DomainError::RobotNotFound.into());
            }
            match requested {
                Some(version_id) => match s.version(version_id.as_str()) {
                    Some(v) if &v.robot_id == robot_id => Ok(v.clone()),
                    _ => Err(DomainError::VersionNotFound.into()),
                },
                None => s
                    .active_version(robot_id)
                    .cloned()
                    .ok_or_else(|| DomainError::NoRunnableVersion.into()),
            }
        })
    }

    // -- schedules --

    pub fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, StoreError> {
        schedule.validate()?;
        let (mut wal, mut state) = self.begin();
        if state.robot(schedule.robot_id.as_str()).is_none() {
            return Err(DomainError::RobotNotFound.into());
        }
        if state.schedule_for_robot(&schedule.robot_id).is_some() {
            return Err(DomainError::Duplicate("robot already has a schedule".to_string()).into());
        }
        Self::commit(&mut wal, &mut state, Event::ScheduleUpserted { schedule: schedule.clone() })?;
        Ok(schedule)
    }

    pub fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, StoreError> {
        schedule.validate()?;
        let (mut wal, mut state) = self.begin();
        let exists = state
            .schedule_for_robot(&schedule.robot_id)
            .map(|s| s.id == schedule.id)
            .unwrap_or(false);
        if !exists {
            return Err(DomainError::ScheduleNotFound.into());
        }
        Self::commit(&mut wal, &mut state, Event::ScheduleUpserted { schedule: schedule.clone() })?;
        Ok(schedule)
    }

    pub fn delete_schedule(&self, robot_id: &RobotId) -> Result<(), StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.schedule_for_robot(robot_id).is_none() {
            return Err(DomainError::ScheduleNotFound.into());
        }
        Self::commit(&mut wal, &mut state, Event::ScheduleDeleted { robot_id: robot_id.clone() })
    }

    pub fn schedule_for_robot(&self, robot_id: &RobotId) -> Option<Schedule> {
        self.read(|s| s.schedule_for_robot(robot_id).cloned())
    }

    pub fn schedule(&self, id: &bf_core::ScheduleId) -> Option<Schedule> {
        self.read(|s| s.schedules.get(id.as_str()).cloned())
    }

    pub fn enabled_schedules(&self) -> Vec<Schedule> {
        self.read(|s| s.schedules.values().filter(|s| s.enabled).cloned().collect())
    }

    // -- SLA rules --

    pub fn create_sla_rule(&self, rule: SlaRule) -> Result<SlaRule, StoreError> {
        rule.validate()?;
        let (mut wal, mut state) = self.begin();
        if state.robot(rule.robot_id.as_str()).is_none() {
            return Err(DomainError::RobotNotFound.into());
        }
        if state.sla_rule_for_robot(&rule.robot_id).is_some() {
            return Err(DomainError::Duplicate("robot already has an SLA rule".to_string()).into());
        }
        Self::commit(&mut wal, &mut state, Event::SlaRuleUpserted { rule: rule.clone() })?;
        Ok(rule)
    }

    pub fn update_sla_rule(&self, rule: SlaRule) -> Result<SlaRule, StoreError> {
        rule.validate()?;
        let (mut wal, mut state) = self.begin();
        let exists = state
            .sla_rule_for_robot(&rule.robot_id)
            .map(|r| r.id == rule.id)
            .unwrap_or(false);
        if !exists {
            return Err(DomainError::SlaRuleNotFound.into());
        }
        Self::commit(&mut wal, &mut state, Event::SlaRuleUpserted { rule: rule.clone() })?;
        Ok(rule)
    }

    pub fn sla_rule_for_robot(&self, robot_id: &RobotId) -> Option<SlaRule> {
        self.read(|s| s.sla_rule_for_robot(robot_id).cloned())
    }

    pub fn sla_rules(&self) -> Vec<SlaRule> {
        self.read(|s| s.sla_rules.values().cloned().collect())
    }

    // -- runs --

    /// Persist a freshly built PENDING run. The caller publishes the broker
    /// message only after this returns: the row must be durable first.
    pub fn create_run(&self, run: Run) -> Result<Run, StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.run(run.id.as_str()).is_some() {
            return Err(DomainError::Duplicate(format!("run {}", run.id)).into());
        }
        Self::commit(&mut wal, &mut state, Event::RunCreated { run: run.clone() })?;
        Ok(run)
    }

    pub fn get_run(&self, run_id: &RunId) -> Result<Run, StoreError> {
        self.read(|s| s.run(run_id.as_str()).cloned())
            .ok_or_else(|| DomainError::RunNotFound.into())
    }

    /// Transition PENDING → RUNNING. A duplicate delivery of an already
    /// running run is a no-op; a terminal run is a conflict.
    pub fn mark_run_running(
        &self,
        run_id: &RunId,
        host_name: &str,
        at_ms: u64,
    ) -> Result<Run, StoreError> {
        let (mut wal, mut state) = self.begin();
        let status = state
            .run(run_id.as_str())
            .map(|r| r.status)
            .ok_or(DomainError::RunNotFound)?;
        match status {
            RunStatus::Pending => {
                Self::commit(
                    &mut wal,
                    &mut state,
                    Event::RunStarted {
                        run_id: run_id.clone(),
                        host_name: host_name.to_string(),
                        started_at_ms: at_ms,
                    },
                )?;
            }
            RunStatus::Running => {}
            _ => {
                return Err(DomainError::Conflict(format!("run is {status}")).into());
            }
        }
        state
            .run(run_id.as_str())
            .cloned()
            .ok_or_else(|| DomainError::RunNotFound.into())
    }

    pub fn set_run_process(&self, run_id: &RunId, process_id: Option<u32>) -> Result<(), StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.run(run_id.as_str()).is_none() {
            return Err(DomainError::RunNotFound.into());
        }
        Self::commit(
            &mut wal,
            &mut state,
            Event::RunProcess { run_id: run_id.clone(), process_id },
        )
    }

    /// Request cancellation. Allowed only from RUNNING; idempotent for runs
    /// that are already flagged or already CANCELED.
    pub fn request_cancel(&self, run_id: &RunId, actor: &str, at_ms: u64) -> Result<Run, StoreError> {
        let (mut wal, mut state) = self.begin();
        let run = state
            .run(run_id.as_str())
            .cloned()
            .ok_or(DomainError::RunNotFound)?;
        match run.status {
            RunStatus::Running => {
                if !run.cancel_requested {
                    Self::commit(
                        &mut wal,
                        &mut state,
                        Event::RunCancelRequested {
                            run_id: run_id.clone(),
                            actor: actor.to_string(),
                            at_ms,
                        },
                    )?;
                }
            }
            RunStatus::Canceled => {}
            other => {
                return Err(DomainError::Conflict(format!(
                    "cannot cancel a run in status {other}"
                ))
                .into());
            }
        }
        state
            .run(run_id.as_str())
            .cloned()
            .ok_or_else(|| DomainError::RunNotFound.into())
    }

    /// Terminal transition. Returns `false` when the run was already
    /// terminal (idempotent finalization for at-least-once delivery).
    pub fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        finished_at_ms: u64,
        error_message: Option<String>,
    ) -> Result<bool, StoreError> {
        if !status.is_terminal() {
            return Err(DomainError::Invalid(format!("{status} is not a terminal status")).into());
        }
        let (mut wal, mut state) = self.begin();
        let run = state
            .run(run_id.as_str())
            .ok_or(DomainError::RunNotFound)?;
        if run.is_terminal() {
            return Ok(false);
        }
        Self::commit(
            &mut wal,
            &mut state,
            Event::RunFinished { run_id: run_id.clone(), status, finished_at_ms, error_message },
        )?;
        Ok(true)
    }

    /// Newest-queued-first page plus the unpaged total.
    pub fn list_runs(&self, filter: &RunFilter, offset: usize, limit: usize) -> (Vec<Run>, usize) {
        let mut runs = self.read(|s| {
            s.runs
                .values()
                .filter(|r| filter.robot_id.as_ref().map_or(true, |id| &r.robot_id == id))
                .filter(|r| filter.service_id.as_ref().map_or(true, |id| r.service_id.as_ref() == Some(id)))
                .filter(|r| filter.trigger_type.map_or(true, |t| r.trigger_type == t))
                .filter(|r| filter.status.map_or(true, |st| r.status == st))
                .cloned()
                .collect::<Vec<_>>()
        });
        let total = runs.len();
        runs.sort_by(|a, b| b.queued_at_ms.cmp(&a.queued_at_ms).then(b.id.cmp(&a.id)));
        (runs.into_iter().skip(offset).take(limit).collect(), total)
    }

    /// PENDING + RUNNING runs for a robot (the scheduler's concurrency gate).
    pub fn count_active_runs(&self, robot_id: &RobotId) -> usize {
        self.read(|s| {
            s.runs
                .values()
                .filter(|r| &r.robot_id == robot_id)
                .filter(|r| matches!(r.status, RunStatus::Pending | RunStatus::Running))
                .count()
        })
    }

    /// SCHEDULED runs queued for a schedule inside the minute starting at
    /// `minute_start_ms` (the scheduler's cross-replica dedupe).
    pub fn count_scheduled_in_minute(
        &self,
        schedule_id: &bf_core::ScheduleId,
        minute_start_ms: u64,
    ) -> usize {
        let minute_end_ms = minute_start_ms + 60_000;
        self.read(|s| {
            s.runs
                .values()
                .filter(|r| r.schedule_id.as_ref() == Some(schedule_id))
                .filter(|r| r.trigger_type == TriggerType::Scheduled)
                .filter(|r| r.queued_at_ms >= minute_start_ms && r.queued_at_ms < minute_end_ms)
                .count()
        })
    }

    /// The robot's most recently queued runs, newest first.
    pub fn recent_runs(&self, robot_id: &RobotId, limit: usize) -> Vec<Run> {
        let mut runs = self.read(|s| {
            s.runs
                .values()
                .filter(|r| &r.robot_id == robot_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        runs.sort_by(|a, b| b.queued_at_ms.cmp(&a.queued_at_ms).then(b.id.cmp(&a.id)));
        runs.truncate(limit);
        runs
    }

    pub fn last_run(&self, robot_id: &RobotId) -> Option<Run> {
        self.recent_runs(robot_id, 1).into_iter().next()
    }

    pub fn count_runs_queued_since(&self, robot_id: &RobotId, since_ms: u64) -> usize {
        self.read(|s| {
            s.runs
                .values()
                .filter(|r| &r.robot_id == robot_id && r.queued_at_ms >= since_ms)
                .count()
        })
    }

    // -- run logs and artifacts --

    /// Append a log line with the next monotonic id. The caller publishes to
    /// the broker only after this returns.
    pub fn append_run_log(
        &self,
        run_id: &RunId,
        level: LogLevel,
        message: &str,
        timestamp_ms: u64,
    ) -> Result<RunLog, StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.run(run_id.as_str()).is_none() {
            return Err(DomainError::RunNotFound.into());
        }
        let entry = RunLog {
            id: state.next_log_id,
            run_id: run_id.clone(),
            timestamp_ms,
            level,
            message: message.to_string(),
        };
        Self::commit(&mut wal, &mut state, Event::LogAppended { entry: entry.clone() })?;
        Ok(entry)
    }

    /// The last `limit` persisted lines for a run, in ascending id order.
    pub fn run_logs(&self, run_id: &RunId, limit: usize) -> Result<Vec<RunLog>, StoreError> {
        self.read(|s| {
            if s.run(run_id.as_str()).is_none() {
                return Err(DomainError::RunNotFound.into());
            }
            let logs = s.run_logs.get(run_id.as_str()).cloned().unwrap_or_default();
            let skip = logs.len().saturating_sub(limit);
            Ok(logs.into_iter().skip(skip).collect())
        })
    }

    pub fn record_artifact(&self, artifact: ArtifactFile) -> Result<(), StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.run(artifact.run_id.as_str()).is_none() {
            return Err(DomainError::RunNotFound.into());
        }
        Self::commit(&mut wal, &mut state, Event::ArtifactRecorded { artifact })
    }

    pub fn run_artifacts(&self, run_id: &RunId) -> Vec<ArtifactFile> {
        self.read(|s| s.artifacts.get(run_id.as_str()).cloned().unwrap_or_default())
    }

    // -- alerts --

    /// Deduplicating upsert: returns `None` when an unresolved alert for the
    /// same `(robot, type)` already exists.
    pub fn open_alert(&self, alert: AlertEvent) -> Result<Option<AlertEvent>, StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.robot(alert.robot_id.as_str()).is_none() {
            return Err(DomainError::RobotNotFound.into());
        }
        if state.unresolved_alert(&alert.robot_id, alert.alert_type).is_some() {
            return Ok(None);
        }
        Self::commit(&mut wal, &mut state, Event::AlertOpened { alert: alert.clone() })?;
        Ok(Some(alert))
    }

    /// Idempotent: resolving an already-resolved alert returns it unchanged.
    pub fn resolve_alert(&self, alert_id: &AlertId, at_ms: u64) -> Result<AlertEvent, StoreError> {
        let (mut wal, mut state) = self.begin();
        let alert = state
            .alerts
            .get(alert_id.as_str())
            .cloned()
            .ok_or(DomainError::AlertNotFound)?;
        if !alert.is_resolved() {
            Self::commit(
                &mut wal,
                &mut state,
                Event::AlertResolved { alert_id: alert_id.clone(), at_ms },
            )?;
        }
        state
            .alerts
            .get(alert_id.as_str())
            .cloned()
            .ok_or_else(|| DomainError::AlertNotFound.into())
    }

    /// Newest-first alert listing.
    pub fn list_alerts(&self, filter: &AlertFilter, limit: usize) -> Vec<AlertEvent> {
        let mut alerts = self.read(|s| {
            s.alerts
                .values()
                .filter(|a| match filter.status {
                    Some(AlertStatusFilter::Open) => !a.is_resolved(),
                    Some(AlertStatusFilter::Resolved) => a.is_resolved(),
                    None => true,
                })
                .filter(|a| filter.alert_type.map_or(true, |t| a.alert_type == t))
                .filter(|a| filter.robot_id.as_ref().map_or(true, |id| &a.robot_id == id))
                .cloned()
                .collect::<Vec<_>>()
        });
        alerts.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then(b.id.cmp(&a.id)));
        alerts.truncate(limit);
        alerts
    }

    // -- workers --

    /// Refresh a worker's heartbeat, registering it as RUNNING if unseen.
    pub fn upsert_worker_heartbeat(
        &self,
        id: &WorkerId,
        name: &str,
        hostname: &str,
        version: &str,
        at_ms: u64,
    ) -> Result<WorkerRecord, StoreError> {
        let (mut wal, mut state) = self.begin();
        if state.workers.contains_key(id.as_str()) {
            Self::commit(
                &mut wal,
                &mut state,
                Event::WorkerHeartbeat { worker_id: id.clone(), at_ms },
            )?;
        } else {
            let worker = WorkerRecord {
                id: id.clone(),
                name: name.to_string(),
                hostname: hostname.to_string(),
                status: WorkerStatus::Running,
                last_heartbeat_ms: at_ms,
                version: version.to_string(),
            };
            Self::commit(&mut wal, &mut state, Event::WorkerUpserted { worker })?;
        }
        state
            .workers
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| DomainError::WorkerNotFound.into())
    }

    pub fn set_worker_status(
        &self,
        id: &WorkerId,
        status: WorkerStatus,
    ) -> Result<WorkerRecord, StoreError> {
        let (mut wal, mut state) = self.begin();
        if !state.workers.contains_key(id.as_str()) {
            return Err(DomainError::WorkerNotFound.into());
        }
        Self::commit(
            &mut wal,
            &mut state,
            Event::WorkerStatusChanged { worker_id: id.clone(), status },
        )?;
        state
            .workers
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| DomainError::WorkerNotFound.into())
    }

    pub fn worker(&self, id: &WorkerId) -> Option<WorkerRecord> {
        self.read(|s| s.workers.get(id.as_str()).cloned())
    }

    pub fn workers(&self) -> Vec<WorkerRecord> {
        self.read(|s| s.workers.values().cloned().collect())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
