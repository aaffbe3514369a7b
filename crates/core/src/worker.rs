// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process registry entry.

use crate::id::WorkerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Running,
    Paused,
    Stopped,
}

crate::simple_display! {
    WorkerStatus {
        Running => "RUNNING",
        Paused => "PAUSED",
        Stopped => "STOPPED",
    }
}

/// A worker process known to the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: WorkerId,
    /// `hostname:pid`, also the label on the broker heartbeat key.
    pub name: String,
    pub hostname: String,
    pub status: WorkerStatus,
    pub last_heartbeat_ms: u64,
    pub version: String,
}
