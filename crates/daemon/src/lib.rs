// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Daemon wiring: configuration, tracing, and lifecycle of the worker
//! runtime, scheduler loop, and SLA monitor inside one process.

pub mod config;

use bf_adapters::{Broker, EnvStore, MemoryBroker, MemoryEnvStore};
use bf_core::{SystemClock, WorkerId};
use bf_engine::{
    SchedulerConfig, SchedulerLoop, SlaMonitorConfig, SlaMonitor, RunRegistry, WorkerConfig,
    WorkerRuntime,
};
use bf_storage::{Store, StoreError};
use config::{hostname, Settings, DAEMON_VERSION};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build and run the daemon until SIGINT.
pub async fn run() -> Result<(), DaemonError> {
    let settings = Settings::from_env();
    let _log_guard = init_tracing(&settings)?;
    tracing::info!(version = DAEMON_VERSION, "botfleet daemon starting");

    let store = Arc::new(Store::open(&settings.state_dir.join("events.jsonl"))?);
    let broker: Arc<dyn Broker> = Arc::new(MemoryBroker::new());
    let env_store: Arc<dyn EnvStore> = Arc::new(MemoryEnvStore::new());
    let clock = SystemClock;

    let shutdown = CancellationToken::new();
    let mut tasks = Vec::new();

    let worker = WorkerRuntime::new(
        store.clone(),
        broker.clone(),
        env_store.clone(),
        worker_config(&settings),
        clock,
    );
    tasks.push(tokio::spawn(worker.run(shutdown.clone())));

    let registry = RunRegistry::new(
        store.clone(),
        broker.clone(),
        env_store.clone(),
        settings.queue_name.clone(),
        clock,
    );
    let scheduler = SchedulerLoop::new(
        store.clone(),
        broker.clone(),
        registry,
        clock,
        SchedulerConfig {
            interval: settings.scheduler_interval,
            app_timezone: settings.app_timezone.clone(),
        },
    );
    tasks.push(tokio::spawn(scheduler.run(shutdown.clone())));

    let monitor = SlaMonitor::new(
        store.clone(),
        broker.clone(),
        clock,
        SlaMonitorConfig {
            interval: settings.sla_monitor_interval,
            failure_streak_threshold: settings.failure_streak_threshold,
            queue_backlog_threshold: settings.queue_backlog_alert_threshold,
            worker_stale_seconds: settings.worker_stale_seconds,
            queue_name: settings.queue_name.clone(),
            heartbeat_prefix: settings.heartbeat_prefix.clone(),
            app_timezone: settings.app_timezone.clone(),
        },
    );
    tasks.push(tokio::spawn(monitor.run(shutdown.clone())));

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested, draining loops");
    shutdown.cancel();
    for task in tasks {
        let _ = task.await;
    }
    tracing::info!("botfleet daemon stopped");
    Ok(())
}

fn worker_config(settings: &Settings) -> WorkerConfig {
    let host = hostname();
    let worker_id = std::env::var("BF_WORKER_ID")
        .ok()
        .filter(|s| !s.is_empty())
        .map(WorkerId::from_string)
        .unwrap_or_else(WorkerId::generate);

    let mut config = WorkerConfig::new(worker_id, &host, settings.artifacts_root.clone());
    config.queue_name = settings.queue_name.clone();
    config.pubsub_prefix = settings.pubsub_prefix.clone();
    config.heartbeat_prefix = settings.heartbeat_prefix.clone();
    config.interpreter = settings.interpreter.clone();
    config.worker_stale_seconds = settings.worker_stale_seconds;
    config.grace = settings.grace;
    config.worker_version = DAEMON_VERSION.to_string();
    if let Some(name) = &settings.worker_name {
        config.worker_name = name.clone();
    }
    config
}

/// Console subscriber, plus a non-blocking daily file appender when
/// `BF_LOG_DIR` is set. The returned guard must stay alive for the file
/// writer to flush.
fn init_tracing(
    settings: &Settings,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, DaemonError> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Ok(log_dir) = std::env::var("BF_LOG_DIR") {
        std::fs::create_dir_all(&log_dir)?;
        let appender = tracing_appender::rolling::daily(&log_dir, "bfd.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        return Ok(Some(guard));
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
    let _ = settings;
    Ok(None)
}
