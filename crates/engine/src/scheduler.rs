// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler loop (C6): evaluate enabled cron schedules each tick.
//!
//! Dispatch order per schedule: cron match → execution window → named
//! dispatch lock → per-minute dedupe → concurrency gate → enqueue. The
//! dedupe makes dispatch per-minute exactly-once across replicas sharing
//! the store.

use crate::registry::{ExecuteRequest, RunOrigin, RunRegistry};
use bf_adapters::Broker;
use bf_core::{Clock, CronExpr, EnvName, Schedule};
use bf_storage::Store;
use chrono::{Datelike, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Fallback when a schedule's timezone name does not resolve.
    pub app_timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(60), app_timezone: "UTC".to_string() }
    }
}

/// Outcome counters for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerCycle {
    pub dispatched: usize,
    pub skipped_window: usize,
    pub skipped_concurrency: usize,
    pub skipped_duplicate: usize,
}

pub struct SchedulerLoop<C: Clock> {
    store: Arc<Store>,
    broker: Arc<dyn Broker>,
    registry: RunRegistry<C>,
    clock: C,
    config: SchedulerConfig,
}

impl<C: Clock> SchedulerLoop<C> {
    pub fn new(
        store: Arc<Store>,
        broker: Arc<dyn Broker>,
        registry: RunRegistry<C>,
        clock: C,
        config: SchedulerConfig,
    ) -> Self {
        Self { store, broker, registry, clock, config }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_seconds = self.config.interval.as_secs(),
            "scheduler started",
        );
        loop {
            let cycle = self.tick().await;
            tracing::info!(
                dispatched = cycle.dispatched,
                skipped_window = cycle.skipped_window,
                skipped_concurrency = cycle.skipped_concurrency,
                skipped_duplicate = cycle.skipped_duplicate,
                "scheduler cycle complete",
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
        tracing::info!("scheduler stopped");
    }

    /// Evaluate every enabled schedule once.
    pub async fn tick(&self) -> SchedulerCycle {
        let mut cycle = SchedulerCycle::default();
        let now_ms = self.clock.epoch_ms();
        for schedule in self.store.enabled_schedules() {
            if let Err(e) = self.evaluate(&schedule, now_ms, &mut cycle).await {
                tracing::warn!(
                    robot_id = %schedule.robot_id,
                    error = %e,
                    "failed to dispatch scheduled run",
                );
            }
        }
        cycle
    }

    async fn evaluate(
        &self,
        schedule: &Schedule,
        now_ms: u64,
        cycle: &mut SchedulerCycle,
    ) -> Result<(), crate::error::EngineError> {
        let Some(local) = local_time(now_ms, &schedule.timezone, &self.config.app_timezone) else {
            return Ok(());
        };
        let cron = match CronExpr::parse(&schedule.cron_expr) {
            Ok(cron) => cron,
            Err(e) => {
                tracing::warn!(
                    robot_id = %schedule.robot_id,
                    cron = %schedule.cron_expr,
                    error = %e,
                    "stored cron expression does not parse, skipping",
                );
                return Ok(());
            }
        };
        if !cron.matches(
            local.minute(),
            local.hour(),
            local.day(),
            local.month(),
            local.weekday().num_days_from_sunday(),
        ) {
            return Ok(());
        }

        if !schedule.window_contains(local.hour() * 60 + local.minute())? {
            cycle.skipped_window += 1;
            return Ok(());
        }

        // Single-resource mutual exclusion per robot. Contention means
        // another replica is dispatching; skip this cycle.
        let lock_name = format!("schedule-dispatch:{}", schedule.robot_id);
        let Some(_guard) = self.broker.try_dispatch_lock(&lock_name) else {
            return Ok(());
        };

        let minute_start_ms = now_ms - now_ms % 60_000;
        if self.store.count_scheduled_in_minute(&schedule.id, minute_start_ms) > 0 {
            cycle.skipped_duplicate += 1;
            return Ok(());
        }

        if self.store.count_active_runs(&schedule.robot_id) >= schedule.max_concurrency as usize {
            cycle.skipped_concurrency += 1;
            return Ok(());
        }

        let request = ExecuteRequest { env_name: EnvName::Prod, ..Default::default() };
        let run = self
            .registry
            .create_run(&schedule.robot_id, request, RunOrigin::scheduled(schedule.id.clone()))
            .await?;
        cycle.dispatched += 1;
        tracing::info!(
            run_id = %run.id,
            robot_id = %schedule.robot_id,
            schedule_id = %schedule.id,
            "scheduled run dispatched",
        );
        Ok(())
    }
}

/// Convert an epoch-ms instant into a zoned local time, falling back to the
/// app timezone and then UTC for unresolvable names.
pub(crate) fn local_time(
    now_ms: u64,
    tz_name: &str,
    fallback: &str,
) -> Option<chrono::DateTime<chrono_tz::Tz>> {
    let tz: chrono_tz::Tz = tz_name
        .parse()
        .or_else(|_| fallback.parse())
        .unwrap_or(chrono_tz::UTC);
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(now_ms as i64)
        .map(|dt| dt.with_timezone(&tz))
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
