// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker contract: one FIFO job queue, per-run log channels, TTL'd
//! heartbeat keys, and non-blocking named dispatch locks.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from broker operations. The registry surfaces these to callers
/// (`503`); the worker backs off and retries.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("subscription closed")]
    SubscriptionClosed,
}

/// A live subscription to one pub/sub channel. Dropping it unsubscribes.
#[async_trait]
pub trait Subscription: Send {
    /// Wait up to `timeout` for the next message. `Ok(None)` on timeout.
    ///
    /// A slow consumer may observe dropped frames; the persisted log is the
    /// source of truth and replay covers the gap.
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError>;
}

/// Guard for a named dispatch lock; the lock is held until drop.
pub struct DispatchGuard {
    _inner: Box<dyn Send>,
}

impl DispatchGuard {
    pub fn new(inner: impl Send + 'static) -> Self {
        Self { _inner: Box::new(inner) }
    }
}

/// The queue + pub/sub collaborator (C2).
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Append a message to the tail of a FIFO queue.
    async fn push_back(&self, queue: &str, payload: String) -> Result<(), BrokerError>;

    /// Pop the head of a queue, waiting up to `timeout`. `Ok(None)` when the
    /// queue stayed empty; the short timeout keeps lease loops responsive
    /// to pause/stop and heartbeats.
    async fn pop_front(&self, queue: &str, timeout: Duration)
        -> Result<Option<String>, BrokerError>;

    async fn queue_len(&self, queue: &str) -> Result<usize, BrokerError>;

    /// Publish to a channel. Fire-and-forget: no subscribers is not an error.
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BrokerError>;

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, BrokerError>;

    /// Set a key with a TTL (worker heartbeats).
    async fn set_key(&self, key: &str, value: String, ttl: Duration) -> Result<(), BrokerError>;

    async fn get_key(&self, key: &str) -> Result<Option<String>, BrokerError>;

    /// All live keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BrokerError>;

    /// Try to take the named dispatch lock without blocking. `None` when
    /// another holder has it; the caller skips its cycle.
    fn try_dispatch_lock(&self, name: &str) -> Option<DispatchGuard>;
}
