// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared end-to-end harness: temp store, in-memory broker, and a worker
//! runtime configured for fast test cadences.

use bf_adapters::{Broker, MemoryBroker, MemoryEnvStore};
use bf_core::{
    ArtifactKind, EntrypointKind, ReleaseChannel, Robot, RobotId, RobotVersion, Run, RunId,
    Schedule, ScheduleId, SystemClock, VersionId, WorkerId,
};
use bf_engine::{RunRegistry, WorkerConfig, WorkerRuntime};
use bf_storage::Store;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const QUEUE: &str = "specs:runs:queue";
pub const PUBSUB_PREFIX: &str = "specs:runs";
pub const HEARTBEAT_PREFIX: &str = "specs:workers";

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Arc<Store>,
    pub broker: MemoryBroker,
    pub env_store: Arc<MemoryEnvStore>,
    pub clock: SystemClock,
    pub shutdown: CancellationToken,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(&dir.path().join("state/events.jsonl")).unwrap());
        Self {
            dir,
            store,
            broker: MemoryBroker::new(),
            env_store: Arc::new(MemoryEnvStore::new()),
            clock: SystemClock,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn artifacts_root(&self) -> PathBuf {
        self.dir.path().join("artifacts")
    }

    pub fn broker_arc(&self) -> Arc<dyn Broker> {
        Arc::new(self.broker.clone())
    }

    pub fn registry(&self) -> RunRegistry<SystemClock> {
        RunRegistry::new(
            self.store.clone(),
            self.broker_arc(),
            self.env_store.clone(),
            QUEUE.to_string(),
            self.clock,
        )
    }

    /// Spawn a worker runtime with sub-second cadences and a short kill
    /// grace so scenarios stay fast.
    pub fn start_worker(&self) {
        let mut config =
            WorkerConfig::new(WorkerId::generate(), "spec-host", self.artifacts_root());
        config.queue_name = QUEUE.to_string();
        config.pubsub_prefix = PUBSUB_PREFIX.to_string();
        config.heartbeat_prefix = HEARTBEAT_PREFIX.to_string();
        config.interpreter = "/bin/sh".to_string();
        config.lease_timeout = Duration::from_millis(200);
        config.heartbeat_interval = Duration::from_secs(1);
        config.status_poll_interval = Duration::from_millis(500);
        config.grace = Duration::from_secs(2);

        let worker = WorkerRuntime::new(
            self.store.clone(),
            self.broker_arc(),
            self.env_store.clone(),
            config,
            self.clock,
        );
        tokio::spawn(worker.run(self.shutdown.clone()));
    }

    /// Register a robot whose active version is a ZIP holding one shell
    /// script entrypoint.
    pub fn robot_with_script(&self, name: &str, script: &str) -> (Robot, RobotVersion) {
        let robot = self
            .store
            .create_robot(Robot {
                id: RobotId::generate(),
                name: name.to_string(),
                description: None,
                tags: Default::default(),
                created_at_ms: 0,
            })
            .unwrap();

        let artifact_rel = PathBuf::from(format!("robots/{}/1.0.0/artifact.zip", robot.id));
        let artifact_abs = self.artifacts_root().join(&artifact_rel);
        std::fs::create_dir_all(artifact_abs.parent().unwrap()).unwrap();
        let file = std::fs::File::create(&artifact_abs).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file("main.sh", zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(script.as_bytes()).unwrap();
        writer.finish().unwrap();

        let version = self
            .store
            .add_version(RobotVersion {
                id: VersionId::generate(),
                robot_id: robot.id.clone(),
                version: "1.0.0".to_string(),
                channel: ReleaseChannel::Stable,
                artifact_kind: ArtifactKind::Zip,
                artifact_path: artifact_rel,
                artifact_sha256: "0".repeat(64),
                entrypoint_kind: EntrypointKind::Script,
                entrypoint_path: "main.sh".to_string(),
                arguments: Vec::new(),
                env_defaults: Default::default(),
                required_env_keys: Default::default(),
                working_directory: None,
                is_active: true,
                created_at_ms: 0,
            })
            .unwrap();
        (robot, version)
    }

    pub fn schedule(
        &self,
        robot_id: &RobotId,
        timeout_seconds: u64,
        retry_count: u32,
        retry_backoff_seconds: u64,
    ) -> Schedule {
        self.store
            .create_schedule(Schedule {
                id: ScheduleId::generate(),
                robot_id: robot_id.clone(),
                enabled: true,
                cron_expr: "* * * * *".to_string(),
                timezone: "UTC".to_string(),
                window_start: None,
                window_end: None,
                max_concurrency: 10,
                timeout_seconds,
                retry_count,
                retry_backoff_seconds,
                created_at_ms: 0,
            })
            .unwrap()
    }

    /// Poll the run row until the predicate holds or the timeout elapses.
    pub async fn wait_for_run(
        &self,
        run_id: &RunId,
        timeout: Duration,
        predicate: impl Fn(&Run) -> bool,
    ) -> Run {
        let deadline = Instant::now() + timeout;
        loop {
            let run = self.store.get_run(run_id).unwrap();
            if predicate(&run) {
                return run;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for run condition; last state: {run:?}",
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Poll an arbitrary condition until it holds or the timeout elapses.
    pub async fn wait_until(&self, timeout: Duration, what: &str, predicate: impl Fn() -> bool) {
        let deadline = Instant::now() + timeout;
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
