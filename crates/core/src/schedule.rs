// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedule attached to a robot.

use crate::cron::CronExpr;
use crate::error::DomainError;
use crate::id::{RobotId, ScheduleId};
use serde::{Deserialize, Serialize};

/// Dispatch policy for a robot. At most one per robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub robot_id: RobotId,
    pub enabled: bool,
    /// Five-field cron expression (see [`crate::cron`]).
    pub cron_expr: String,
    /// IANA timezone name the cron expression is evaluated in.
    pub timezone: String,
    /// `HH:MM` daily window bounds; both set or neither. A wrapped window
    /// (start > end) spans midnight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_end: Option<String>,
    pub max_concurrency: u32,
    pub timeout_seconds: u64,
    pub retry_count: u32,
    pub retry_backoff_seconds: u64,
    pub created_at_ms: u64,
}

impl Schedule {
    /// Validate all user-supplied fields. Called on every write.
    pub fn validate(&self) -> Result<(), DomainError> {
        CronExpr::parse(&self.cron_expr)
            .map_err(|e| DomainError::InvalidCron(e.to_string()))?;

        match (&self.window_start, &self.window_end) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                parse_hhmm(start)?;
                parse_hhmm(end)?;
            }
            _ => {
                return Err(DomainError::InvalidWindow(
                    "window_start and window_end must be set together".to_string(),
                ));
            }
        }

        if self.max_concurrency < 1 {
            return Err(DomainError::Invalid("max_concurrency must be >= 1".to_string()));
        }
        if self.retry_backoff_seconds < 1 {
            return Err(DomainError::Invalid("retry_backoff_seconds must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Whether a local time (minutes since midnight) falls inside the
    /// execution window. No window means always inside.
    pub fn window_contains(&self, local_minutes: u32) -> Result<bool, DomainError> {
        let (Some(start), Some(end)) = (&self.window_start, &self.window_end) else {
            return Ok(true);
        };
        let start = parse_hhmm(start)?;
        let end = parse_hhmm(end)?;
        Ok(if start <= end {
            start <= local_minutes && local_minutes <= end
        } else {
            local_minutes >= start || local_minutes <= end
        })
    }
}

/// Parse `HH:MM` into minutes since midnight.
pub fn parse_hhmm(value: &str) -> Result<u32, DomainError> {
    let invalid = || DomainError::InvalidWindow(format!("expected HH:MM, got {value:?}"));
    let (hour_text, minute_text) = value.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour_text.parse().map_err(|_| invalid())?;
    let minute: u32 = minute_text.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(hour * 60 + minute)
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
