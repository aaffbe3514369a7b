// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity collaborator for the log-stream subscriber.
//!
//! Authentication providers differ (local accounts vs. external directory),
//! but the core only ever consumes the set of granted permissions, never
//! the variant.

use std::collections::HashSet;
use thiserror::Error;

/// Permission required to stream run logs.
pub const STREAM_RUN_LOGS: &str = "runs:logs:read";

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Local {
        user: String,
        permissions: HashSet<String>,
    },
    External {
        subject: String,
        groups: Vec<String>,
        permissions: HashSet<String>,
    },
}

impl Principal {
    pub fn permissions(&self) -> &HashSet<String> {
        match self {
            Principal::Local { permissions, .. } => permissions,
            Principal::External { permissions, .. } => permissions,
        }
    }

    /// Display name for audit/log lines.
    pub fn name(&self) -> &str {
        match self {
            Principal::Local { user, .. } => user,
            Principal::External { subject, .. } => subject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No or invalid credentials (WS close 4401).
    #[error("unauthenticated")]
    Unauthenticated,
    /// Authenticated but not permitted (WS close 4403).
    #[error("forbidden")]
    Forbidden,
}

/// Authorization seam for log streaming.
pub trait StreamAuth: Send + Sync + 'static {
    fn authorize_run_logs(&self, principal: Option<&Principal>) -> Result<(), AuthError>;
}

/// Permission-set check, the default policy.
#[derive(Clone, Copy, Default)]
pub struct PermissionStreamAuth;

impl StreamAuth for PermissionStreamAuth {
    fn authorize_run_logs(&self, principal: Option<&Principal>) -> Result<(), AuthError> {
        let principal = principal.ok_or(AuthError::Unauthenticated)?;
        if principal.permissions().contains(STREAM_RUN_LOGS) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
