// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot environment store collaborator.
//!
//! The real store keeps values encrypted at rest and decrypts on read; that
//! machinery is outside the core. The engine only needs resolved plaintext
//! values (env composition) and the set of defined keys (enqueue preflight).

use async_trait::async_trait;
use bf_core::{EnvName, RobotId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvStoreError {
    #[error("env store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EnvStore: Send + Sync + 'static {
    /// Resolved values for a robot in one environment.
    async fn values(
        &self,
        robot_id: &RobotId,
        env_name: EnvName,
    ) -> Result<HashMap<String, String>, EnvStoreError>;

    /// Keys that have a value defined, regardless of secrecy.
    async fn defined_keys(
        &self,
        robot_id: &RobotId,
        env_name: EnvName,
    ) -> Result<HashSet<String>, EnvStoreError> {
        Ok(self.values(robot_id, env_name).await?.into_keys().collect())
    }
}

/// Plain in-memory env store.
#[derive(Clone, Default)]
pub struct MemoryEnvStore {
    values: Arc<RwLock<HashMap<(String, EnvName), HashMap<String, String>>>>,
}

impl MemoryEnvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, robot_id: &RobotId, env_name: EnvName, key: &str, value: &str) {
        self.values
            .write()
            .entry((robot_id.as_str().to_string(), env_name))
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, robot_id: &RobotId, env_name: EnvName, key: &str) {
        if let Some(entries) = self
            .values
            .write()
            .get_mut(&(robot_id.as_str().to_string(), env_name))
        {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl EnvStore for MemoryEnvStore {
    async fn values(
        &self,
        robot_id: &RobotId,
        env_name: EnvName,
    ) -> Result<HashMap<String, String>, EnvStoreError> {
        Ok(self
            .values
            .read()
            .get(&(robot_id.as_str().to_string(), env_name))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "env_store_tests.rs"]
mod tests;
