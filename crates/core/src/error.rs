// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain errors that cross the core boundary.
//!
//! These are values, not panics: the facade maps them onto HTTP statuses
//! (404/400/409), the scheduler logs and skips, the worker finalizes the run.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("robot not found")]
    RobotNotFound,

    #[error("robot version not found")]
    VersionNotFound,

    #[error("run not found")]
    RunNotFound,

    #[error("schedule not found")]
    ScheduleNotFound,

    #[error("SLA rule not found")]
    SlaRuleNotFound,

    #[error("alert not found")]
    AlertNotFound,

    #[error("worker not found")]
    WorkerNotFound,

    #[error("no runnable version for robot")]
    NoRunnableVersion,

    #[error("missing env values for keys: {}", .keys.join(", "))]
    MissingEnv { keys: Vec<String> },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("invalid execution window: {0}")]
    InvalidWindow(String),

    #[error("invalid SLA rule: {0}")]
    InvalidSla(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("invalid input: {0}")]
    Invalid(String),
}
