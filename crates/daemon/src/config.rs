// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

/// Daemon version (from Cargo.toml).
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

/// All daemon configuration, resolved once at startup. Every key is
/// env-overridable with a default.
#[derive(Debug, Clone)]
pub struct Settings {
    /// WAL and daemon state. `BF_STATE_DIR` > `XDG_STATE_HOME/botfleet` >
    /// `~/.local/state/botfleet`.
    pub state_dir: PathBuf,
    /// Version artifacts and per-run workspaces.
    pub artifacts_root: PathBuf,
    pub queue_name: String,
    pub pubsub_prefix: String,
    pub heartbeat_prefix: String,
    pub scheduler_interval: Duration,
    pub sla_monitor_interval: Duration,
    pub worker_stale_seconds: u64,
    pub failure_streak_threshold: usize,
    pub queue_backlog_alert_threshold: usize,
    /// Interpreter for SCRIPT entrypoints.
    pub interpreter: String,
    pub app_timezone: String,
    /// SIGTERM → SIGKILL grace for run termination.
    pub grace: Duration,
    /// Retention windows; enforcement runs outside the core loops.
    pub artifact_retention_days: u32,
    pub log_retention_days: u32,
    /// Override for the worker's display name; defaults to `hostname:pid`.
    pub worker_name: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            state_dir: state_dir(),
            artifacts_root: env_path("BF_ARTIFACTS_ROOT")
                .unwrap_or_else(|| PathBuf::from("./data/artifacts")),
            queue_name: env_string("BF_QUEUE_NAME", "botfleet:runs:queue"),
            pubsub_prefix: env_string("BF_PUBSUB_PREFIX", "botfleet:runs"),
            heartbeat_prefix: env_string("BF_HEARTBEAT_PREFIX", "botfleet:workers"),
            scheduler_interval: Duration::from_secs(
                env_u64("BF_SCHEDULER_INTERVAL_SECONDS", 60).max(5),
            ),
            sla_monitor_interval: Duration::from_secs(
                env_u64("BF_SLA_MONITOR_INTERVAL_SECONDS", 60).max(30),
            ),
            worker_stale_seconds: env_u64("BF_WORKER_STALE_SECONDS", 120),
            failure_streak_threshold: env_u64("BF_FAILURE_STREAK_THRESHOLD", 3) as usize,
            queue_backlog_alert_threshold: env_u64("BF_QUEUE_BACKLOG_ALERT_THRESHOLD", 50)
                as usize,
            interpreter: env_string("BF_INTERPRETER", "python3"),
            app_timezone: env_string("BF_APP_TIMEZONE", "UTC"),
            grace: Duration::from_secs(env_u64("BF_GRACE_SECONDS", 5)),
            artifact_retention_days: env_u64("BF_ARTIFACT_RETENTION_DAYS", 90) as u32,
            log_retention_days: env_u64("BF_LOG_RETENTION_DAYS", 90) as u32,
            worker_name: std::env::var("BF_WORKER_NAME").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Resolve the state directory: BF_STATE_DIR > XDG_STATE_HOME/botfleet >
/// ~/.local/state/botfleet > ./botfleet-state.
fn state_dir() -> PathBuf {
    if let Some(dir) = env_path("BF_STATE_DIR") {
        return dir;
    }
    if let Some(xdg) = env_path("XDG_STATE_HOME") {
        return xdg.join("botfleet");
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local/state/botfleet"),
        Err(_) => PathBuf::from("./botfleet-state"),
    }
}

/// Best-effort hostname for worker identity and run rows.
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
