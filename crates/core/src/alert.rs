// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert events raised by the SLA monitor.

use crate::id::{AlertId, RobotId, RunId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Late,
    FailureStreak,
    WorkerDown,
    QueueBacklog,
}

crate::simple_display! {
    AlertType {
        Late => "LATE",
        FailureStreak => "FAILURE_STREAK",
        WorkerDown => "WORKER_DOWN",
        QueueBacklog => "QUEUE_BACKLOG",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Info,
    Warn,
    Critical,
}

crate::simple_display! {
    AlertSeverity {
        Info => "INFO",
        Warn => "WARN",
        Critical => "CRITICAL",
    }
}

/// A raised alert. At most one unresolved alert exists per
/// `(robot, alert_type)`; the store's open path deduplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: AlertId,
    pub robot_id: RobotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
}

impl AlertEvent {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at_ms.is_some()
    }
}
