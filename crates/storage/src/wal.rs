// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL event write-ahead log.
//!
//! Each entry is one line of JSON: `{"seq":N,"event":{...}}\n`. Appends are
//! fsynced individually; a successful [`Wal::append`] is the durability
//! point for the commit that carries it. On open the whole log is replayed;
//! a torn or corrupt tail is truncated so the next append lands on a clean
//! boundary.

use bf_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization helper for writing entries without cloning the event.
#[derive(Serialize)]
struct RecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(Deserialize)]
struct Record {
    seq: u64,
    event: Event,
}

/// Append-only JSONL event log.
pub struct Wal {
    file: File,
    path: PathBuf,
    next_seq: u64,
}

impl Wal {
    /// Open or create a WAL, replaying every valid entry.
    ///
    /// Returns the log handle and the replayed events in append order.
    pub fn open(path: &Path) -> Result<(Self, Vec<Event>), WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).read(true).append(true).open(path)?;

        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut events = Vec::new();
        let mut max_seq = 0u64;
        let mut valid_len = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    Self::truncate_tail(&file, path, valid_len)?;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                valid_len += bytes_read as u64;
                continue;
            }

            match serde_json::from_str::<Record>(trimmed) {
                Ok(record) => {
                    max_seq = max_seq.max(record.seq);
                    events.push(record.event);
                    valid_len += bytes_read as u64;
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        offset = valid_len,
                        error = %e,
                        "corrupt WAL tail, truncating to last valid entry",
                    );
                    Self::truncate_tail(&file, path, valid_len)?;
                    break;
                }
            }
        }

        Ok((Self { file, path: path.to_owned(), next_seq: max_seq + 1 }, events))
    }

    fn truncate_tail(file: &File, path: &Path, valid_len: u64) -> Result<(), WalError> {
        warn!(path = %path.display(), valid_len, "dropping WAL bytes past corruption point");
        file.set_len(valid_len)?;
        file.sync_all()?;
        Ok(())
    }

    /// Append one event and fsync it. Returns the assigned sequence number.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        let seq = self.next_seq;
        let mut line = serde_json::to_vec(&RecordRef { seq, event })?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        self.next_seq += 1;
        Ok(seq)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
