// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot and robot-version entities.

use crate::error::DomainError;
use crate::id::{RobotId, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::str::FromStr;

/// Named runtime environment a run executes against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvName {
    #[default]
    Prod,
    Hml,
    Test,
}

crate::simple_display! {
    EnvName {
        Prod => "PROD",
        Hml => "HML",
        Test => "TEST",
    }
}

impl FromStr for EnvName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROD" => Ok(EnvName::Prod),
            "HML" => Ok(EnvName::Hml),
            "TEST" => Ok(EnvName::Test),
            other => Err(DomainError::Invalid(format!(
                "env must be one of PROD, HML, TEST (got {other:?})"
            ))),
        }
    }
}

/// Kind of stored package a version ships as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    Zip,
    Exe,
}

crate::simple_display! {
    ArtifactKind {
        Zip => "ZIP",
        Exe => "EXE",
    }
}

/// How the entrypoint inside a ZIP payload is launched.
///
/// `Script` entrypoints go through the configured interpreter; `Exe`
/// entrypoints (or paths ending in `.exe`) execute directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrypointKind {
    Script,
    Exe,
}

crate::simple_display! {
    EntrypointKind {
        Script => "SCRIPT",
        Exe => "EXE",
    }
}

/// Release channel of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Stable,
    Beta,
    Hotfix,
}

crate::simple_display! {
    ReleaseChannel {
        Stable => "stable",
        Beta => "beta",
        Hotfix => "hotfix",
    }
}

/// A named automation program. Owns its versions, at most one schedule, and
/// at most one SLA rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    pub id: RobotId,
    /// Unique across the fleet.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub created_at_ms: u64,
}

/// One packaged, content-addressed version of a robot.
///
/// At most one version per robot is active; activating a version deactivates
/// the others atomically (enforced by the store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotVersion {
    pub id: VersionId,
    pub robot_id: RobotId,
    /// Semver string, unique per robot.
    pub version: String,
    pub channel: ReleaseChannel,
    pub artifact_kind: ArtifactKind,
    /// Location of the stored package under the artifacts root.
    pub artifact_path: PathBuf,
    pub artifact_sha256: String,
    pub entrypoint_kind: EntrypointKind,
    /// Path of the entrypoint inside the extracted workspace (ZIP) or the
    /// executable itself (EXE).
    pub entrypoint_path: String,
    /// Default arguments, prepended before any runtime arguments.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Default environment, overridden by robot env store and request env.
    #[serde(default)]
    pub env_defaults: HashMap<String, String>,
    /// Keys that must exist in the robot's env store before a run may be
    /// enqueued for this version.
    #[serde(default)]
    pub required_env_keys: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    pub is_active: bool,
    pub created_at_ms: u64,
}

/// Loose semver check: `MAJOR.MINOR.PATCH` with optional `-pre`/`+build`.
pub fn is_valid_semver(version: &str) -> bool {
    let core = version.split(['-', '+']).next().unwrap_or_default();
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
#[path = "robot_tests.rs"]
mod tests;
