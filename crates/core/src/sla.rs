// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-robot SLA expectation used by the monitor loop.

use crate::error::DomainError;
use crate::id::{RobotId, SlaRuleId};
use crate::schedule::parse_hhmm;
use serde::{Deserialize, Serialize};

/// Lateness expectation for a robot. At most one per robot; exactly one of
/// the two expectation fields must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaRule {
    pub id: SlaRuleId,
    pub robot_id: RobotId,
    /// "A run should be queued at least every N minutes."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_run_every_minutes: Option<u32>,
    /// "A run should be queued by HH:MM local time every day."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_daily_time: Option<String>,
    /// Slack added on top of the expectation before a LATE alert opens.
    pub late_after_minutes: u32,
    pub alert_on_failure: bool,
    pub alert_on_late: bool,
    pub created_at_ms: u64,
}

impl SlaRule {
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.expected_run_every_minutes, &self.expected_daily_time) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(DomainError::InvalidSla(
                    "set exactly one of expected_run_every_minutes or expected_daily_time"
                        .to_string(),
                ));
            }
            (Some(minutes), None) if minutes == 0 => {
                return Err(DomainError::InvalidSla(
                    "expected_run_every_minutes must be >= 1".to_string(),
                ));
            }
            (None, Some(time)) => {
                parse_hhmm(time)
                    .map_err(|_| DomainError::InvalidSla(format!("bad daily time {time:?}")))?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "sla_tests.rs"]
mod tests;
