// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output files produced by a run.

use crate::id::RunId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file registered at run finalization. Unique per `(run_id, file_path)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub run_id: RunId,
    /// Base name of the file.
    pub name: String,
    /// Absolute path under the run's workspace directory.
    pub file_path: PathBuf,
    pub size_bytes: u64,
}
