// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log fan-out: persist a run log row, then publish the live frame.

use crate::error::EngineError;
use bf_adapters::Broker;
use bf_core::{Clock, LogFrame, LogLevel, RunId, RunLog};
use bf_storage::Store;
use std::sync::Arc;

/// Channel name for one run's log stream.
pub fn run_log_channel(prefix: &str, run_id: &RunId) -> String {
    format!("{prefix}:{run_id}:logs")
}

/// Appends a log record and fans it out to live subscribers.
#[derive(Clone)]
pub struct LogFanout<C: Clock> {
    store: Arc<Store>,
    broker: Arc<dyn Broker>,
    pubsub_prefix: String,
    clock: C,
}

impl<C: Clock> LogFanout<C> {
    pub fn new(
        store: Arc<Store>,
        broker: Arc<dyn Broker>,
        pubsub_prefix: String,
        clock: C,
    ) -> Self {
        Self { store, broker, pubsub_prefix, clock }
    }

    /// Persist one line and publish its frame.
    ///
    /// Persistence failures propagate: no publish happens without a durable
    /// row. A publish failure after the commit is swallowed: the persisted
    /// row is the source of truth and replay covers the missed frame.
    pub async fn append(
        &self,
        run_id: &RunId,
        level: LogLevel,
        message: &str,
    ) -> Result<RunLog, EngineError> {
        let entry = self
            .store
            .append_run_log(run_id, level, message, self.clock.epoch_ms())?;

        match serde_json::to_string(&LogFrame::from_log(&entry)) {
            Ok(payload) => {
                let channel = run_log_channel(&self.pubsub_prefix, run_id);
                if let Err(e) = self.broker.publish(&channel, payload).await {
                    tracing::warn!(
                        run_id = %run_id,
                        error = %e,
                        "log publish failed; persisted row is authoritative",
                    );
                }
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "failed to encode log frame");
            }
        }
        Ok(entry)
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
