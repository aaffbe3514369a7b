// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker runtime (C5): lease loop, heartbeats, and pause/stop handling.
//!
//! One runtime processes one leased run at a time. The supervision of the
//! child process lives in [`crate::execution`].

use crate::fanout::LogFanout;
use crate::metrics;
use crate::registry::RunRegistry;
use bf_adapters::{Broker, EnvStore};
use bf_core::{Clock, RunMessage, WorkerId, WorkerStatus};
use bf_storage::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 3_600;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: WorkerId,
    /// `hostname:pid`; labels the heartbeat key and metrics.
    pub worker_name: String,
    pub hostname: String,
    pub worker_version: String,
    pub queue_name: String,
    pub pubsub_prefix: String,
    pub heartbeat_prefix: String,
    pub artifacts_root: PathBuf,
    /// Interpreter for SCRIPT entrypoints.
    pub interpreter: String,
    pub worker_stale_seconds: u64,
    /// SIGTERM → SIGKILL grace for process-tree termination.
    pub grace: Duration,
    /// Blocking-pop timeout; short so heartbeats keep flowing.
    pub lease_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub status_poll_interval: Duration,
}

impl WorkerConfig {
    pub fn new(worker_id: WorkerId, hostname: &str, artifacts_root: PathBuf) -> Self {
        Self {
            worker_id,
            worker_name: format!("{hostname}:{}", std::process::id()),
            hostname: hostname.to_string(),
            worker_version: env!("CARGO_PKG_VERSION").to_string(),
            queue_name: "botfleet:runs:queue".to_string(),
            pubsub_prefix: "botfleet:runs".to_string(),
            heartbeat_prefix: "botfleet:workers".to_string(),
            artifacts_root,
            interpreter: "python3".to_string(),
            worker_stale_seconds: 120,
            grace: Duration::from_secs(5),
            lease_timeout: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(10),
            status_poll_interval: Duration::from_secs(2),
        }
    }
}

/// Leases jobs from the broker queue and executes them.
pub struct WorkerRuntime<C: Clock> {
    pub(crate) store: Arc<Store>,
    pub(crate) broker: Arc<dyn Broker>,
    pub(crate) env_store: Arc<dyn EnvStore>,
    pub(crate) fanout: LogFanout<C>,
    pub(crate) registry: RunRegistry<C>,
    pub(crate) config: WorkerConfig,
    pub(crate) clock: C,
}

impl<C: Clock> WorkerRuntime<C> {
    pub fn new(
        store: Arc<Store>,
        broker: Arc<dyn Broker>,
        env_store: Arc<dyn EnvStore>,
        config: WorkerConfig,
        clock: C,
    ) -> Arc<Self> {
        let fanout = LogFanout::new(
            store.clone(),
            broker.clone(),
            config.pubsub_prefix.clone(),
            clock.clone(),
        );
        let registry = RunRegistry::new(
            store.clone(),
            broker.clone(),
            env_store.clone(),
            config.queue_name.clone(),
            clock.clone(),
        );
        Arc::new(Self { store, broker, env_store, fanout, registry, config, clock })
    }

    /// Main loop: heartbeat, honor pause/stop, lease, execute. Returns when
    /// the shutdown token fires; the worker row is marked STOPPED on exit.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(
            worker = %self.config.worker_name,
            queue = %self.config.queue_name,
            "worker started",
        );

        let mut last_heartbeat_ms = 0u64;
        let mut last_status_poll_ms = 0u64;
        let mut status = WorkerStatus::Running;

        while !shutdown.is_cancelled() {
            let now_ms = self.clock.epoch_ms();
            if now_ms.saturating_sub(last_heartbeat_ms)
                >= self.config.heartbeat_interval.as_millis() as u64
            {
                last_heartbeat_ms = now_ms;
                status = self.heartbeat().await;
            }
            if now_ms.saturating_sub(last_status_poll_ms)
                >= self.config.status_poll_interval.as_millis() as u64
            {
                last_status_poll_ms = now_ms;
                status = self.read_status().await;
            }
            self.refresh_queue_depth().await;

            if matches!(status, WorkerStatus::Paused | WorkerStatus::Stopped) {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.status_poll_interval) => {}
                }
                continue;
            }

            let leased = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.broker.pop_front(&self.config.queue_name, self.config.lease_timeout) => {
                    match result {
                        Ok(leased) => leased,
                        Err(e) => {
                            tracing::warn!(error = %e, "lease poll failed, backing off");
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                            }
                            continue;
                        }
                    }
                }
            };
            let Some(raw) = leased else { continue };

            // Re-check status after the lease: a paused or stopped worker
            // returns the job so nothing is lost.
            status = self.read_status().await;
            if matches!(status, WorkerStatus::Paused | WorkerStatus::Stopped) {
                if let Err(e) = self.broker.push_back(&self.config.queue_name, raw).await {
                    tracing::error!(error = %e, "failed to requeue job on pause/stop");
                }
                continue;
            }

            let message: RunMessage = match serde_json::from_str(&raw) {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(error = %e, payload = %raw, "invalid payload from queue");
                    continue;
                }
            };

            // Future-dated messages go back to the tail unprocessed.
            if let Some(not_before) = message.not_before_ts {
                let now = self.clock.epoch_seconds();
                if now < not_before {
                    if let Err(e) = self.broker.push_back(&self.config.queue_name, raw).await {
                        tracing::error!(error = %e, "failed to requeue future-dated job");
                    }
                    let wait = Duration::from_secs_f64((not_before - now).clamp(0.05, 1.0));
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(wait) => {}
                    }
                    continue;
                }
            }

            Arc::clone(&self).process_message(message).await;
        }

        self.mark_stopped().await;
        tracing::info!(worker = %self.config.worker_name, "worker stopped");
    }

    /// Execute one leased message with panic containment: whatever happens
    /// inside the run body, the run row ends terminal.
    pub async fn process_message(self: Arc<Self>, message: RunMessage) {
        let run_id = message.run_id.clone();
        let runtime = Arc::clone(&self);
        let handle = tokio::spawn(async move { runtime.execute_run(message).await });
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.finalize_unexpected(&run_id, &e.to_string()).await,
            Err(join_error) => {
                self.finalize_unexpected(&run_id, &format!("worker task panicked: {join_error}"))
                    .await;
            }
        }
    }

    /// Persist the heartbeat row, refresh the TTL'd broker key, and export
    /// the heartbeat gauge. Returns the worker's current status.
    pub(crate) async fn heartbeat(&self) -> WorkerStatus {
        let now_ms = self.clock.epoch_ms();
        metrics::record_worker_heartbeat(&self.config.worker_name, self.clock.epoch_seconds());

        let status = match self.store.upsert_worker_heartbeat(
            &self.config.worker_id,
            &self.config.worker_name,
            &self.config.hostname,
            &self.config.worker_version,
            now_ms,
        ) {
            Ok(worker) => worker.status,
            Err(e) => {
                tracing::error!(error = %e, "failed to persist worker heartbeat");
                WorkerStatus::Running
            }
        };

        let key = format!("{}:{}", self.config.heartbeat_prefix, self.config.worker_name);
        let ttl = Duration::from_secs((self.config.worker_stale_seconds * 2).max(60));
        if let Err(e) = self
            .broker
            .set_key(&key, format!("{}", self.clock.epoch_seconds()), ttl)
            .await
        {
            tracing::warn!(error = %e, "failed to refresh broker heartbeat key");
        }
        status
    }

    pub(crate) async fn read_status(&self) -> WorkerStatus {
        if let Some(worker) = self.store.worker(&self.config.worker_id) {
            return worker.status;
        }
        self.heartbeat().await
    }

    async fn refresh_queue_depth(&self) {
        if let Ok(depth) = self.broker.queue_len(&self.config.queue_name).await {
            metrics::set_queue_depth(depth);
        }
    }

    async fn mark_stopped(&self) {
        if self.store.worker(&self.config.worker_id).is_some() {
            if let Err(e) = self
                .store
                .set_worker_status(&self.config.worker_id, WorkerStatus::Stopped)
            {
                tracing::error!(error = %e, "failed to mark worker as STOPPED");
            }
        }
    }
}
