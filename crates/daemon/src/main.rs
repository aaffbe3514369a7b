// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bfd`, the botfleet orchestration daemon.

#[tokio::main]
async fn main() {
    if let Err(e) = bf_daemon::run().await {
        eprintln!("bfd: {e}");
        std::process::exit(1);
    }
}
