// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine unit tests.

use crate::registry::RunRegistry;
use bf_adapters::{Broker, MemoryBroker, MemoryEnvStore};
use bf_core::{
    ArtifactKind, Clock, EntrypointKind, FakeClock, ReleaseChannel, Robot, RobotId, RobotVersion,
    Schedule, ScheduleId, VersionId,
};
use bf_storage::Store;
use std::sync::Arc;

pub(crate) const QUEUE: &str = "test:runs:queue";
pub(crate) const PUBSUB_PREFIX: &str = "test:runs";
pub(crate) const HEARTBEAT_PREFIX: &str = "test:workers";

/// 2023-11-14T22:13:20Z, an arbitrary but fixed instant.
pub(crate) const EPOCH_MS: u64 = 1_700_000_000_000;

pub(crate) struct Fixture {
    pub dir: tempfile::TempDir,
    pub store: Arc<Store>,
    pub broker: MemoryBroker,
    pub env_store: Arc<MemoryEnvStore>,
    pub clock: FakeClock,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(&dir.path().join("state/events.jsonl")).unwrap());
        Self {
            dir,
            store,
            broker: MemoryBroker::new(),
            env_store: Arc::new(MemoryEnvStore::new()),
            clock: FakeClock::at_epoch_ms(EPOCH_MS),
        }
    }

    pub fn broker_arc(&self) -> Arc<dyn Broker> {
        Arc::new(self.broker.clone())
    }

    pub fn registry(&self) -> RunRegistry<FakeClock> {
        RunRegistry::new(
            self.store.clone(),
            self.broker_arc(),
            self.env_store.clone(),
            QUEUE.to_string(),
            self.clock.clone(),
        )
    }

    pub fn seed_robot(&self, name: &str) -> Robot {
        self.store
            .create_robot(Robot {
                id: RobotId::generate(),
                name: name.to_string(),
                description: None,
                tags: Default::default(),
                created_at_ms: self.clock.epoch_ms(),
            })
            .unwrap()
    }

    pub fn seed_version(&self, robot_id: &RobotId, semver: &str) -> RobotVersion {
        self.store
            .add_version(RobotVersion {
                id: VersionId::generate(),
                robot_id: robot_id.clone(),
                version: semver.to_string(),
                channel: ReleaseChannel::Stable,
                artifact_kind: ArtifactKind::Zip,
                artifact_path: format!("robots/{robot_id}/{semver}/artifact.zip").into(),
                artifact_sha256: "0".repeat(64),
                entrypoint_kind: EntrypointKind::Script,
                entrypoint_path: "main.py".to_string(),
                arguments: Vec::new(),
                env_defaults: Default::default(),
                required_env_keys: Default::default(),
                working_directory: None,
                is_active: true,
                created_at_ms: self.clock.epoch_ms(),
            })
            .unwrap()
    }

    pub fn seed_schedule(&self, robot_id: &RobotId, cron_expr: &str) -> Schedule {
        self.store
            .create_schedule(Schedule {
                id: ScheduleId::generate(),
                robot_id: robot_id.clone(),
                enabled: true,
                cron_expr: cron_expr.to_string(),
                timezone: "UTC".to_string(),
                window_start: None,
                window_end: None,
                max_concurrency: 1,
                timeout_seconds: 60,
                retry_count: 0,
                retry_backoff_seconds: 1,
                created_at_ms: self.clock.epoch_ms(),
            })
            .unwrap()
    }
}
