// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log-stream subscriber (C8): replay persisted logs, then bridge the run's
//! broker channel to a subscriber until it disconnects.

use crate::fanout::run_log_channel;
use async_trait::async_trait;
use bf_adapters::{AuthError, Broker, BrokerError, Principal, StreamAuth};
use bf_core::{LogFrame, RunId};
use bf_storage::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REPLAY_LIMIT: usize = 200;
const LIVE_POLL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("unauthorized")]
    Forbidden,
    #[error("unknown run")]
    UnknownRun,
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error("storage error: {0}")]
    Store(String),
    #[error("subscriber disconnected")]
    SinkClosed,
}

impl StreamError {
    /// WebSocket close code the facade should use, if any.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            StreamError::Unauthenticated => Some(4401),
            StreamError::Forbidden => Some(4403),
            StreamError::UnknownRun => Some(4404),
            _ => None,
        }
    }
}

impl From<StoreError> for StreamError {
    fn from(e: StoreError) -> Self {
        StreamError::Store(e.to_string())
    }
}

/// Outbound side of a subscriber connection.
#[async_trait]
pub trait LogSink: Send {
    /// Send one JSON text frame. Errors with [`StreamError::SinkClosed`]
    /// once the peer is gone.
    async fn send_text(&mut self, frame: String) -> Result<(), StreamError>;

    /// Token that fires when the subscriber disconnects.
    fn disconnected(&self) -> CancellationToken;
}

/// Streams one run's logs to one subscriber.
pub struct LogStream<A: StreamAuth> {
    store: Arc<Store>,
    broker: Arc<dyn Broker>,
    auth: A,
    pubsub_prefix: String,
    replay_limit: usize,
}

impl<A: StreamAuth> LogStream<A> {
    pub fn new(store: Arc<Store>, broker: Arc<dyn Broker>, auth: A, pubsub_prefix: String) -> Self {
        Self { store, broker, auth, pubsub_prefix, replay_limit: DEFAULT_REPLAY_LIMIT }
    }

    pub fn with_replay_limit(mut self, limit: usize) -> Self {
        self.replay_limit = limit;
        self
    }

    /// Authorize, replay the persisted tail, then forward live frames until
    /// the subscriber disconnects or the channel closes.
    ///
    /// No backpressure: a slow subscriber may miss live frames and observes
    /// them on reconnect through replay.
    pub async fn stream(
        &self,
        principal: Option<&Principal>,
        run_id: &RunId,
        sink: &mut dyn LogSink,
    ) -> Result<(), StreamError> {
        self.auth.authorize_run_logs(principal).map_err(|e| match e {
            AuthError::Unauthenticated => StreamError::Unauthenticated,
            AuthError::Forbidden => StreamError::Forbidden,
        })?;
        if self.store.get_run(run_id).is_err() {
            return Err(StreamError::UnknownRun);
        }

        // Subscribe before replay so frames published mid-replay are not
        // lost; late subscribers have no ordering claim on older frames.
        let mut subscription = self
            .broker
            .subscribe(&run_log_channel(&self.pubsub_prefix, run_id))
            .await?;

        let replay = self.store.run_logs(run_id, self.replay_limit)?;
        for entry in &replay {
            if let Ok(frame) = serde_json::to_string(&LogFrame::from_log(entry)) {
                sink.send_text(frame).await?;
            }
        }

        let disconnected = sink.disconnected();
        tracing::debug!(run_id = %run_id, replayed = replay.len(), "log stream attached");
        loop {
            tokio::select! {
                _ = disconnected.cancelled() => break,
                next = subscription.next_message(LIVE_POLL_TIMEOUT) => {
                    match next {
                        Ok(Some(payload)) => sink.send_text(payload).await?,
                        Ok(None) => {}
                        Err(_) => break,
                    }
                }
            }
        }
        tracing::debug!(run_id = %run_id, "log stream detached");
        Ok(())
    }
}

/// Channel-backed sink: frames land on an mpsc receiver, disconnection is a
/// token the owner cancels. Used by tests and in-process consumers.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
    token: CancellationToken,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, token: CancellationToken::new() }, rx)
    }

    /// Handle the owner cancels to simulate/signal disconnect.
    pub fn disconnect_handle(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[async_trait]
impl LogSink for ChannelSink {
    async fn send_text(&mut self, frame: String) -> Result<(), StreamError> {
        self.tx.send(frame).map_err(|_| StreamError::SinkClosed)
    }

    fn disconnected(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
#[path = "logstream_tests.rs"]
mod tests;
