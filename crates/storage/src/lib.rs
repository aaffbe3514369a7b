// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable fleet store: an append-only event WAL replayed into materialized
//! state, fronted by repository-style accessors.
//!
//! Every write commits one event: the WAL append (with fsync) is the
//! durability point, then the event is applied to the in-memory state. A
//! reopened store replays the WAL and reproduces the exact same state.

mod state;
mod store;
mod wal;

pub use state::FleetState;
pub use store::{AlertFilter, AlertStatusFilter, RunFilter, Store, StoreError};
pub use wal::{Wal, WalError};
