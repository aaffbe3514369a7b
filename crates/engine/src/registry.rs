// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run registry (C3): validate, persist, and enqueue runs.

use crate::error::EngineError;
use crate::metrics;
use bf_adapters::{Broker, EnvStore};
use bf_core::{
    Clock, DomainError, EnvName, Run, RunId, RunLog, RunMessage, RunStatus, RobotId, ScheduleId,
    TriggerType, VersionId,
};
use bf_storage::{RunFilter, Store};
use std::collections::HashMap;
use std::sync::Arc;

/// Caller-supplied execution request.
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest {
    /// Explicit version to run; defaults to the robot's active version.
    pub version_id: Option<VersionId>,
    pub runtime_arguments: Vec<String>,
    pub runtime_env: HashMap<String, String>,
    pub env_name: EnvName,
}

/// Trigger metadata for a new run.
#[derive(Debug, Clone)]
pub struct RunOrigin {
    pub trigger_type: TriggerType,
    pub attempt: u32,
    pub schedule_id: Option<ScheduleId>,
    pub service_id: Option<String>,
    pub parameters: serde_json::Value,
    pub triggered_by: Option<String>,
    /// Epoch seconds the message becomes eligible for lease (retry backoff).
    pub not_before_ts: Option<f64>,
}

impl RunOrigin {
    pub fn manual(triggered_by: Option<String>) -> Self {
        Self {
            trigger_type: TriggerType::Manual,
            attempt: 1,
            schedule_id: None,
            service_id: None,
            parameters: serde_json::Value::Null,
            triggered_by,
            not_before_ts: None,
        }
    }

    pub fn scheduled(schedule_id: ScheduleId) -> Self {
        Self {
            trigger_type: TriggerType::Scheduled,
            attempt: 1,
            schedule_id: Some(schedule_id),
            service_id: None,
            parameters: serde_json::Value::Null,
            triggered_by: None,
            not_before_ts: None,
        }
    }
}

/// Front door for run creation and run queries.
#[derive(Clone)]
pub struct RunRegistry<C: Clock> {
    store: Arc<Store>,
    broker: Arc<dyn Broker>,
    env_store: Arc<dyn EnvStore>,
    queue_name: String,
    clock: C,
}

impl<C: Clock> RunRegistry<C> {
    pub fn new(
        store: Arc<Store>,
        broker: Arc<dyn Broker>,
        env_store: Arc<dyn EnvStore>,
        queue_name: String,
        clock: C,
    ) -> Self {
        Self { store, broker, env_store, queue_name, clock }
    }

    /// Create a PENDING run and hand its job to the broker.
    ///
    /// The run row is committed before the publish. A crash between the two
    /// leaves an orphan PENDING run; recovery for that window is outside the
    /// core.
    pub async fn create_run(
        &self,
        robot_id: &RobotId,
        request: ExecuteRequest,
        origin: RunOrigin,
    ) -> Result<Run, EngineError> {
        let version = self.store.resolve_version(robot_id, request.version_id.as_ref())?;

        let defined = self.env_store.defined_keys(robot_id, request.env_name).await?;
        let missing: Vec<String> = version
            .required_env_keys
            .iter()
            .filter(|key| !defined.contains(*key))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::MissingEnv { keys: missing }.into());
        }

        let run = Run {
            id: RunId::generate(),
            robot_id: robot_id.clone(),
            robot_version_id: version.id.clone(),
            status: RunStatus::Pending,
            trigger_type: origin.trigger_type,
            attempt: origin.attempt,
            schedule_id: origin.schedule_id.clone(),
            service_id: origin.service_id.clone(),
            env_name: request.env_name,
            parameters: origin.parameters.clone(),
            queued_at_ms: self.clock.epoch_ms(),
            started_at_ms: None,
            finished_at_ms: None,
            duration_seconds: None,
            host_name: None,
            process_id: None,
            cancel_requested: false,
            canceled_by: None,
            canceled_at_ms: None,
            error_message: None,
            triggered_by: origin.triggered_by.clone(),
        };
        let run = self.store.create_run(run)?;

        let message = RunMessage {
            run_id: run.id.clone(),
            robot_id: robot_id.clone(),
            robot_version_id: version.id,
            runtime_arguments: request.runtime_arguments,
            runtime_env: request.runtime_env,
            trigger_type: origin.trigger_type,
            attempt: origin.attempt,
            service_id: origin.service_id,
            schedule_id: origin.schedule_id,
            parameters_json: origin.parameters,
            env_name: request.env_name,
            not_before_ts: origin.not_before_ts,
            triggered_by: origin.triggered_by,
        };
        let payload = serde_json::to_string(&message)?;
        self.broker.push_back(&self.queue_name, payload).await?;
        if let Ok(depth) = self.broker.queue_len(&self.queue_name).await {
            metrics::set_queue_depth(depth);
        }

        tracing::info!(
            run_id = %run.id,
            robot_id = %robot_id,
            trigger = %run.trigger_type,
            attempt = run.attempt,
            "run enqueued",
        );
        Ok(run)
    }

    /// Request cancellation of a RUNNING run. Idempotent.
    pub fn request_cancel(&self, run_id: &RunId, actor: &str) -> Result<Run, EngineError> {
        let run = self.store.request_cancel(run_id, actor, self.clock.epoch_ms())?;
        tracing::info!(run_id = %run_id, actor, "run cancel requested");
        Ok(run)
    }

    pub fn get_run(&self, run_id: &RunId) -> Result<Run, EngineError> {
        Ok(self.store.get_run(run_id)?)
    }

    pub fn list_runs(
        &self,
        filter: &RunFilter,
        offset: usize,
        limit: usize,
    ) -> (Vec<Run>, usize) {
        self.store.list_runs(filter, offset, limit)
    }

    pub fn get_run_logs(&self, run_id: &RunId, limit: usize) -> Result<Vec<RunLog>, EngineError> {
        Ok(self.store.run_logs(run_id, limit)?)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
