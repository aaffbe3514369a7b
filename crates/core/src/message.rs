// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker wire types: the queue message and the log frame.

use crate::id::{RobotId, RunId, ScheduleId, VersionId};
use crate::robot::EnvName;
use crate::run::TriggerType;
use crate::runlog::{LogLevel, RunLog};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of a queued run job. UTF-8 JSON on the broker's FIFO list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMessage {
    pub run_id: RunId,
    pub robot_id: RobotId,
    pub robot_version_id: VersionId,
    #[serde(default)]
    pub runtime_arguments: Vec<String>,
    #[serde(default)]
    pub runtime_env: HashMap<String, String>,
    pub trigger_type: TriggerType,
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<ScheduleId>,
    #[serde(default)]
    pub parameters_json: serde_json::Value,
    pub env_name: EnvName,
    /// Epoch seconds before which workers must not process this message.
    /// Future-dated messages are requeued to the tail (retry backoff).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before_ts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
}

/// JSON frame published on a run's log channel and replayed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFrame {
    pub run_id: RunId,
    /// RFC 3339 with millisecond precision.
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogFrame {
    pub fn from_log(entry: &RunLog) -> Self {
        Self {
            run_id: entry.run_id.clone(),
            timestamp: rfc3339_millis(entry.timestamp_ms),
            level: entry.level,
            message: entry.message.clone(),
        }
    }
}

/// Format epoch milliseconds as RFC 3339 UTC with millisecond precision.
pub fn rfc3339_millis(epoch_ms: u64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(epoch_ms as i64)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
