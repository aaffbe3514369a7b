// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory broker for single-process deployments and tests.

use crate::broker::{Broker, BrokerError, DispatchGuard, Subscription};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;
const POP_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Default)]
struct MemoryBrokerState {
    queues: HashMap<String, VecDeque<String>>,
    channels: HashMap<String, broadcast::Sender<String>>,
    keys: HashMap<String, (String, Instant)>,
}

/// Process-local [`Broker`]. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<MemoryBrokerState>>,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        let mut state = self.state.lock();
        state
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn push_back(&self, queue: &str, payload: String) -> Result<(), BrokerError> {
        self.state.lock().queues.entry(queue.to_string()).or_default().push_back(payload);
        Ok(())
    }

    async fn pop_front(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, BrokerError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(payload) = self
                .state
                .lock()
                .queues
                .get_mut(queue)
                .and_then(|q| q.pop_front())
            {
                return Ok(Some(payload));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POP_POLL_INTERVAL).await;
        }
    }

    async fn queue_len(&self, queue: &str) -> Result<usize, BrokerError> {
        Ok(self.state.lock().queues.get(queue).map_or(0, |q| q.len()))
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<(), BrokerError> {
        // No receivers is fine; live subscribers are best-effort.
        let _ = self.sender(channel).send(payload);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, BrokerError> {
        Ok(Box::new(MemorySubscription { rx: self.sender(channel).subscribe() }))
    }

    async fn set_key(&self, key: &str, value: String, ttl: Duration) -> Result<(), BrokerError> {
        self.state
            .lock()
            .keys
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn get_key(&self, key: &str) -> Result<Option<String>, BrokerError> {
        let mut state = self.state.lock();
        match state.keys.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                state.keys.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BrokerError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.keys.retain(|_, (_, expires)| *expires > now);
        Ok(state.keys.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn try_dispatch_lock(&self, name: &str) -> Option<DispatchGuard> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(name.to_string()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
        };
        lock.try_lock_owned().ok().map(DispatchGuard::new)
    }
}

struct MemorySubscription {
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.rx.recv()).await {
                Ok(Ok(payload)) => return Ok(Some(payload)),
                // Lagged receivers drop frames and keep going; replay covers
                // the persisted history.
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(BrokerError::SubscriptionClosed)
                }
                Err(_) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
