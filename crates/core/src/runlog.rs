// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only run log records.

use crate::id::RunId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Info => "INFO",
        Warn => "WARN",
        Error => "ERROR",
    }
}

/// One persisted log line. Ids are assigned monotonically by the store, so
/// ascending id equals append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    pub id: u64,
    pub run_id: RunId,
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
}
