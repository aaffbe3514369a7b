// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run execution: preflight, spawn, stream capture, supervision, and
//! finalization with retry scheduling.

use crate::error::EngineError;
use crate::metrics;
use crate::registry::{ExecuteRequest, RunOrigin};
use crate::runtime::{WorkerRuntime, DEFAULT_TIMEOUT_SECONDS};
use crate::workspace::{collect_output_files, compose_env, resolve_execution_plan, ExecutionPlan};
use bf_core::{
    rfc3339_millis, ArtifactFile, Clock, DomainError, LogLevel, RunId, RunMessage, RunStatus,
    Schedule, TriggerType,
};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Cadence of the cancel-flag poll against the run row.
const CANCEL_POLL: Duration = Duration::from_secs(1);
/// How long the supervision loop waits for the next captured line.
const LINE_WAIT: Duration = Duration::from_millis(200);

struct StreamLine {
    level: LogLevel,
    message: String,
}

struct ExecOutcome {
    canceled: bool,
    timed_out: bool,
    exit_code: Option<i32>,
}

impl<C: Clock> WorkerRuntime<C> {
    /// Run body for one leased message. Every early return leaves the run
    /// row terminal; errors bubbling out are finalized by the caller.
    pub(crate) async fn execute_run(&self, message: RunMessage) -> Result<(), EngineError> {
        let run_id = message.run_id.clone();
        let run = match self.store.get_run(&run_id) {
            Ok(run) => run,
            Err(_) => {
                tracing::error!(run_id = %run_id, "run not found for leased message");
                return Ok(());
            }
        };
        // At-least-once delivery: a finished run leased again is a no-op.
        if run.is_terminal() {
            return Ok(());
        }

        let schedule = message.schedule_id.as_ref().and_then(|id| self.store.schedule(id));

        let version = match self.store.get_version(&message.robot_version_id) {
            Ok(version) => version,
            Err(_) => {
                self.finalize_preflight_failure(
                    &run_id,
                    "Robot version not found.",
                    "Robot version not found for execution.",
                )
                .await;
                return Ok(());
            }
        };

        self.store
            .mark_run_running(&run_id, &self.config.hostname, self.clock.epoch_ms())?;
        let run_dir = self.config.artifacts_root.join("runs").join(run_id.as_str());
        std::fs::create_dir_all(&run_dir)?;

        self.fanout.append(&run_id, LogLevel::Info, "Execution started.").await?;
        self.fanout
            .append(
                &run_id,
                LogLevel::Info,
                &format!("Using robot version {} ({})", version.version, version.id),
            )
            .await?;
        self.fanout
            .append(&run_id, LogLevel::Info, &format!("Runtime environment: {}", message.env_name))
            .await?;

        let plan = match resolve_execution_plan(
            &version,
            &self.config.artifacts_root,
            &run_dir,
            &message.runtime_arguments,
            &self.config.interpreter,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                let reason = e.to_string();
                self.finalize_preflight_failure(&run_id, &reason, &reason).await;
                return Ok(());
            }
        };

        let robot_env = self.env_store.values(&message.robot_id, message.env_name).await?;
        let env = compose_env(
            std::env::vars(),
            &version.env_defaults,
            &robot_env,
            &message.runtime_env,
        );
        let timeout_seconds = schedule
            .as_ref()
            .map(|s| s.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        self.fanout
            .append(&run_id, LogLevel::Info, &format!("Command: {}", plan.command.join(" ")))
            .await?;
        self.fanout
            .append(
                &run_id,
                LogLevel::Info,
                &format!("Working directory: {}", plan.working_directory.display()),
            )
            .await?;
        self.fanout
            .append(&run_id, LogLevel::Info, &format!("Timeout seconds: {timeout_seconds}"))
            .await?;

        let outcome = self.supervise(&run_id, &plan, env, timeout_seconds, &run_dir).await?;
        self.finalize(&message, schedule.as_ref(), outcome, &run_dir).await
    }

    /// Spawn the child in its own process group, capture both streams
    /// line-by-line, and poll for cancellation, timeout, and exit.
    async fn supervise(
        &self,
        run_id: &RunId,
        plan: &ExecutionPlan,
        env: HashMap<String, String>,
        timeout_seconds: u64,
        run_dir: &Path,
    ) -> Result<ExecOutcome, EngineError> {
        let (program, args) = plan
            .command
            .split_first()
            .ok_or_else(|| EngineError::Domain(DomainError::Invalid("empty command".into())))?;

        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .env_clear()
            .envs(&env)
            .current_dir(&plan.working_directory)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        let mut child = command.spawn()?;
        self.store.set_run_process(run_id, child.id())?;

        let (tx, mut rx) = mpsc::unbounded_channel::<StreamLine>();
        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, LogLevel::Info, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, LogLevel::Error, tx.clone());
        }
        drop(tx);

        let mut log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join("run.log"))?;

        let started = self.clock.now();
        let mut last_cancel_check: Option<Instant> = None;
        let mut canceled = false;
        let mut timed_out = false;
        let mut readers_done = false;

        loop {
            if readers_done {
                tokio::time::sleep(LINE_WAIT).await;
            } else {
                match tokio::time::timeout(LINE_WAIT, rx.recv()).await {
                    Ok(Some(line)) => {
                        self.fanout.append(run_id, line.level, &line.message).await?;
                        let stamp = rfc3339_millis(self.clock.epoch_ms());
                        let _ = writeln!(log_file, "{stamp} [{}] {}", line.level, line.message);
                    }
                    Ok(None) => readers_done = true,
                    Err(_) => {}
                }
            }

            let exited = child.try_wait()?.is_some();

            if !exited
                && !canceled
                && last_cancel_check.map_or(true, |at| at.elapsed() >= CANCEL_POLL)
            {
                last_cancel_check = Some(Instant::now());
                if self.cancel_requested(run_id) {
                    canceled = true;
                    self.fanout.append(run_id, LogLevel::Info, "Execution canceled by user").await?;
                    terminate_process_tree(&mut child, self.config.grace).await;
                }
            }

            if !canceled
                && !timed_out
                && !exited
                && timeout_seconds > 0
                && self.clock.now().duration_since(started).as_secs() > timeout_seconds
            {
                timed_out = true;
                terminate_process_tree(&mut child, self.config.grace).await;
                self.fanout
                    .append(
                        run_id,
                        LogLevel::Error,
                        &format!("TIMEOUT: exceeded {timeout_seconds} seconds."),
                    )
                    .await?;
            }

            if exited && readers_done {
                break;
            }
        }

        let status = child.wait().await?;
        Ok(ExecOutcome { canceled, timed_out, exit_code: status.code() })
    }

    fn cancel_requested(&self, run_id: &RunId) -> bool {
        self.store
            .get_run(run_id)
            .map(|run| run.cancel_requested && run.status == RunStatus::Running)
            .unwrap_or(false)
    }

    async fn finalize(
        &self,
        message: &RunMessage,
        schedule: Option<&Schedule>,
        outcome: ExecOutcome,
        run_dir: &Path,
    ) -> Result<(), EngineError> {
        let run_id = &message.run_id;
        let finished_at_ms = self.clock.epoch_ms();

        let (status, error_message, level, line) = if outcome.canceled {
            (RunStatus::Canceled, None, LogLevel::Info, "Execution marked as CANCELED.".to_string())
        } else if outcome.timed_out {
            (RunStatus::Failed, Some("TIMEOUT".to_string()), LogLevel::Error, "TIMEOUT".to_string())
        } else if outcome.exit_code == Some(0) {
            (RunStatus::Success, None, LogLevel::Info, "Execution finished successfully.".to_string())
        } else {
            let text = format!("Process returned exit code {}", outcome.exit_code.unwrap_or(-1));
            (RunStatus::Failed, Some(text.clone()), LogLevel::Error, text)
        };

        let transitioned =
            self.store.finish_run(run_id, status, finished_at_ms, error_message)?;
        if !transitioned {
            tracing::warn!(run_id = %run_id, "run already finalized, skipping");
            return Ok(());
        }
        self.fanout.append(run_id, level, &line).await?;

        self.register_artifacts(run_id, run_dir).await?;

        let run = self.store.get_run(run_id)?;
        metrics::record_run_completed(status, run.duration_seconds);

        if status == RunStatus::Failed {
            self.schedule_retry_if_needed(message, schedule).await;
        }
        tracing::info!(run_id = %run_id, status = %status, "run finalized");
        Ok(())
    }

    /// Deterministic preflight failure: FAILED, logged, counted, no retry.
    async fn finalize_preflight_failure(&self, run_id: &RunId, error: &str, log_line: &str) {
        match self
            .store
            .finish_run(run_id, RunStatus::Failed, self.clock.epoch_ms(), Some(error.to_string()))
        {
            Ok(true) => {
                let _ = self.fanout.append(run_id, LogLevel::Error, log_line).await;
                let duration = self.store.get_run(run_id).ok().and_then(|r| r.duration_seconds);
                metrics::record_run_completed(RunStatus::Failed, duration);
                tracing::error!(run_id = %run_id, error, "run failed in preflight");
            }
            Ok(false) => {}
            Err(e) => tracing::error!(run_id = %run_id, error = %e, "failed to finalize run"),
        }
    }

    /// Failure escape hatch for errors and panics inside the run body: the
    /// run row must never stay PENDING/RUNNING.
    pub(crate) async fn finalize_unexpected(&self, run_id: &RunId, error: &str) {
        let Ok(run) = self.store.get_run(run_id) else { return };
        if run.is_terminal() {
            return;
        }
        match self.store.finish_run(
            run_id,
            RunStatus::Failed,
            self.clock.epoch_ms(),
            Some(error.to_string()),
        ) {
            Ok(true) => {
                let _ = self
                    .fanout
                    .append(run_id, LogLevel::Error, &format!("Unexpected failure: {error}"))
                    .await;
                let duration = self.store.get_run(run_id).ok().and_then(|r| r.duration_seconds);
                metrics::record_run_completed(RunStatus::Failed, duration);
                tracing::error!(run_id = %run_id, error, "run failed unexpectedly");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "failed to finalize run after error");
            }
        }
    }

    async fn register_artifacts(&self, run_id: &RunId, run_dir: &Path) -> Result<(), EngineError> {
        for path in collect_output_files(run_dir)? {
            let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.store.record_artifact(ArtifactFile {
                run_id: run_id.clone(),
                name,
                file_path: path,
                size_bytes,
            })?;
        }
        Ok(())
    }

    /// Schedule-owned FAILED runs retry with backoff until the attempt
    /// budget is spent. The retry run carries the same version, arguments,
    /// env, and parameters.
    async fn schedule_retry_if_needed(&self, message: &RunMessage, schedule: Option<&Schedule>) {
        let Some(schedule) = schedule else { return };
        if message.attempt > schedule.retry_count {
            return;
        }
        let backoff = schedule.retry_backoff_seconds.max(1);
        let attempt = message.attempt + 1;

        let request = ExecuteRequest {
            version_id: Some(message.robot_version_id.clone()),
            runtime_arguments: message.runtime_arguments.clone(),
            runtime_env: message.runtime_env.clone(),
            env_name: message.env_name,
        };
        let origin = RunOrigin {
            trigger_type: TriggerType::Retry,
            attempt,
            schedule_id: message.schedule_id.clone(),
            service_id: message.service_id.clone(),
            parameters: message.parameters_json.clone(),
            triggered_by: message.triggered_by.clone(),
            not_before_ts: Some(self.clock.epoch_seconds() + backoff as f64),
        };
        match self.registry.create_run(&message.robot_id, request, origin).await {
            Ok(retry_run) => {
                let _ = self
                    .fanout
                    .append(
                        &message.run_id,
                        LogLevel::Warn,
                        &format!(
                            "Retry scheduled: attempt={attempt} backoff={backoff}s run_id={}",
                            retry_run.id
                        ),
                    )
                    .await;
            }
            Err(e) => {
                tracing::error!(run_id = %message.run_id, error = %e, "failed to schedule retry");
            }
        }
    }
}

fn spawn_stream_reader(
    stream: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    level: LogLevel,
    tx: mpsc::UnboundedSender<StreamLine>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(message)) = lines.next_line().await {
            if tx.send(StreamLine { level, message }).is_err() {
                break;
            }
        }
    });
}

/// Best-effort tree kill: SIGTERM to the child's process group, wait out the
/// grace period, SIGKILL any survivors.
async fn terminate_process_tree(child: &mut tokio::process::Child, grace: Duration) {
    let Some(pid) = child.id() else { return };
    let pgid = Pid::from_raw(pid as i32);
    if killpg(pgid, Signal::SIGTERM).is_err() {
        // Group already gone.
        return;
    }
    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let _ = killpg(pgid, Signal::SIGKILL);
}
