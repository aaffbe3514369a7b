// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level error type.

use bf_adapters::{BrokerError, EnvStoreError};
use bf_core::DomainError;
use bf_storage::{StoreError, WalError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(DomainError),

    #[error("storage error: {0}")]
    Storage(#[from] WalError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    EnvStore(#[from] EnvStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<DomainError> for EngineError {
    fn from(e: DomainError) -> Self {
        EngineError::Domain(e)
    }
}

// Flatten store errors so callers can match on the domain kind directly.
impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Domain(domain) => EngineError::Domain(domain),
            StoreError::Wal(wal) => EngineError::Storage(wal),
        }
    }
}
