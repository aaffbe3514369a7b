// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SLA monitor loop (C7): lateness and failure-streak per robot, queue
//! backlog and stale workers fleet-wide. Every condition opens a
//! deduplicated alert.

use crate::metrics;
use crate::scheduler::local_time;
use bf_adapters::Broker;
use bf_core::schedule::parse_hhmm;
use bf_core::{
    AlertEvent, AlertId, AlertSeverity, AlertType, Clock, RobotId, RunId, RunStatus, SlaRule,
    WorkerStatus,
};
use bf_storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SlaMonitorConfig {
    pub interval: Duration,
    /// Consecutive FAILED runs that open a FAILURE_STREAK alert.
    pub failure_streak_threshold: usize,
    pub queue_backlog_threshold: usize,
    pub worker_stale_seconds: u64,
    pub queue_name: String,
    pub heartbeat_prefix: String,
    pub app_timezone: String,
}

impl Default for SlaMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            failure_streak_threshold: 3,
            queue_backlog_threshold: 50,
            worker_stale_seconds: 120,
            queue_name: "botfleet:runs:queue".to_string(),
            heartbeat_prefix: "botfleet:workers".to_string(),
            app_timezone: "UTC".to_string(),
        }
    }
}

/// Outcome counters for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlaCycle {
    pub checked_rules: usize,
    pub created_alerts: usize,
}

pub struct SlaMonitor<C: Clock> {
    store: Arc<Store>,
    broker: Arc<dyn Broker>,
    clock: C,
    config: SlaMonitorConfig,
}

impl<C: Clock> SlaMonitor<C> {
    pub fn new(
        store: Arc<Store>,
        broker: Arc<dyn Broker>,
        clock: C,
        config: SlaMonitorConfig,
    ) -> Self {
        Self { store, broker, clock, config }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_seconds = self.config.interval.as_secs(),
            "sla monitor started",
        );
        loop {
            let cycle = self.tick().await;
            tracing::info!(
                checked_rules = cycle.checked_rules,
                created_alerts = cycle.created_alerts,
                "sla cycle complete",
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
        tracing::info!("sla monitor stopped");
    }

    pub async fn tick(&self) -> SlaCycle {
        let mut created = 0usize;
        let rules = self.store.sla_rules();

        for rule in &rules {
            if rule.alert_on_late && self.is_robot_late(rule) {
                created += usize::from(self.open_alert(
                    rule.robot_id.clone(),
                    None,
                    AlertType::Late,
                    AlertSeverity::Warn,
                    format!("Robot {} is late based on configured SLA.", rule.robot_id),
                    serde_json::json!({
                        "expected_run_every_minutes": rule.expected_run_every_minutes,
                        "expected_daily_time": rule.expected_daily_time,
                        "late_after_minutes": rule.late_after_minutes,
                    }),
                ));
            }

            if rule.alert_on_failure && self.has_failure_streak(&rule.robot_id) {
                created += usize::from(self.open_alert(
                    rule.robot_id.clone(),
                    None,
                    AlertType::FailureStreak,
                    AlertSeverity::Critical,
                    format!(
                        "Robot {} reached failure streak >= {}.",
                        rule.robot_id, self.config.failure_streak_threshold
                    ),
                    serde_json::json!({
                        "failure_streak_threshold": self.config.failure_streak_threshold,
                    }),
                ));
            }
        }

        created += self.evaluate_queue_backlog().await;
        created += self.evaluate_worker_down().await;

        SlaCycle { checked_rules: rules.len(), created_alerts: created }
    }

    fn is_robot_late(&self, rule: &SlaRule) -> bool {
        let now_ms = self.clock.epoch_ms();

        if let Some(expected_every) = rule.expected_run_every_minutes {
            let Some(last) = self.store.last_run(&rule.robot_id) else {
                // Never ran at all: late by definition.
                return true;
            };
            let elapsed_minutes = now_ms.saturating_sub(last.queued_at_ms) as f64 / 60_000.0;
            return elapsed_minutes > (expected_every + rule.late_after_minutes) as f64;
        }

        if let Some(daily) = &rule.expected_daily_time {
            // Evaluate in the robot's schedule timezone when it has one.
            let tz_name = self
                .store
                .schedule_for_robot(&rule.robot_id)
                .map(|s| s.timezone)
                .unwrap_or_else(|| self.config.app_timezone.clone());
            let Some(local_now) = local_time(now_ms, &tz_name, &self.config.app_timezone) else {
                return false;
            };
            let Ok(minutes) = parse_hhmm(daily) else { return false };
            let Some(target) = chrono::NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
            else {
                return false;
            };
            let Some(expected_local) = local_now
                .date_naive()
                .and_time(target)
                .and_local_timezone(local_now.timezone())
                .earliest()
            else {
                return false;
            };
            let late_local = expected_local + chrono::Duration::minutes(rule.late_after_minutes as i64);
            if local_now <= late_local {
                return false;
            }
            let expected_utc_ms =
                expected_local.with_timezone(&chrono::Utc).timestamp_millis().max(0) as u64;
            return self.store.count_runs_queued_since(&rule.robot_id, expected_utc_ms) == 0;
        }

        false
    }

    fn has_failure_streak(&self, robot_id: &RobotId) -> bool {
        let threshold = self.config.failure_streak_threshold;
        if threshold == 0 {
            return false;
        }
        let runs = self.store.recent_runs(robot_id, threshold);
        runs.len() >= threshold && runs.iter().all(|r| r.status == RunStatus::Failed)
    }

    async fn evaluate_queue_backlog(&self) -> usize {
        let depth = match self.broker.queue_len(&self.config.queue_name).await {
            Ok(depth) => depth,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read queue depth");
                return 0;
            }
        };
        metrics::set_queue_depth(depth);
        if depth <= self.config.queue_backlog_threshold {
            return 0;
        }
        let Some(robot_id) = self.system_alert_robot() else { return 0 };
        usize::from(self.open_alert(
            robot_id,
            None,
            AlertType::QueueBacklog,
            AlertSeverity::Warn,
            format!("Queue depth is high ({depth})."),
            serde_json::json!({
                "queue_depth": depth,
                "threshold": self.config.queue_backlog_threshold,
            }),
        ))
    }

    async fn evaluate_worker_down(&self) -> usize {
        let now_seconds = self.clock.epoch_seconds();
        let stale_after = self.config.worker_stale_seconds;
        let prefix = format!("{}:", self.config.heartbeat_prefix);
        let mut stale: Vec<String> = Vec::new();

        // Broker heartbeat keys: value is epoch seconds.
        if let Ok(keys) = self.broker.keys_with_prefix(&prefix).await {
            for key in keys {
                let Ok(Some(value)) = self.broker.get_key(&key).await else { continue };
                let Ok(beat) = value.parse::<f64>() else { continue };
                if now_seconds - beat > stale_after as f64 {
                    stale.push(key.trim_start_matches(&prefix).to_string());
                }
            }
        }

        // Worker rows: a STOPPED worker drained deliberately and is not down.
        let now_ms = self.clock.epoch_ms();
        for worker in self.store.workers() {
            if worker.status == WorkerStatus::Stopped {
                continue;
            }
            if now_ms.saturating_sub(worker.last_heartbeat_ms) > stale_after * 1_000
                && !stale.contains(&worker.name)
            {
                stale.push(worker.name);
            }
        }

        if stale.is_empty() {
            return 0;
        }
        let Some(robot_id) = self.system_alert_robot() else { return 0 };
        usize::from(self.open_alert(
            robot_id,
            None,
            AlertType::WorkerDown,
            AlertSeverity::Critical,
            "Worker heartbeat is stale.".to_string(),
            serde_json::json!({
                "stale_workers": stale,
                "stale_after_seconds": stale_after,
            }),
        ))
    }

    /// Fleet-wide alerts attach to any enabled-schedule robot, else any
    /// robot, to keep the alert table uniform.
    fn system_alert_robot(&self) -> Option<RobotId> {
        if let Some(schedule) = self.store.enabled_schedules().into_iter().next() {
            return Some(schedule.robot_id);
        }
        self.store.list_robots().into_iter().next().map(|r| r.id)
    }

    fn open_alert(
        &self,
        robot_id: RobotId,
        run_id: Option<RunId>,
        alert_type: AlertType,
        severity: AlertSeverity,
        message: String,
        metadata: serde_json::Value,
    ) -> bool {
        let alert = AlertEvent {
            id: AlertId::generate(),
            robot_id,
            run_id,
            alert_type,
            severity,
            message,
            metadata,
            created_at_ms: self.clock.epoch_ms(),
            resolved_at_ms: None,
        };
        match self.store.open_alert(alert) {
            Ok(Some(alert)) => {
                tracing::warn!(
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    robot_id = %alert.robot_id,
                    message = %alert.message,
                    "alert opened",
                );
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "failed to open alert");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "sla_tests.rs"]
mod tests;
