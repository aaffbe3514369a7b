// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run workspace materialization and environment composition.

use bf_core::{ArtifactKind, EntrypointKind, RobotVersion};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Deterministic materialization failures. These finalize the run as FAILED
/// and are never retried.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Version artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Entrypoint not found inside ZIP workspace: {}", .0.display())]
    EntrypointMissing(PathBuf),

    #[error("failed to extract artifact: {0}")]
    Extract(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Resolved command line and working directory for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub command: Vec<String>,
    pub working_directory: PathBuf,
}

/// Materialize the run's workspace and resolve its command.
///
/// - `EXE` artifacts execute in place; the working directory defaults to the
///   artifact's parent.
/// - `ZIP` artifacts extract into `<run_dir>/workspace/`; the entrypoint is
///   resolved inside it and executed directly for `EXE` entrypoints (or
///   `.exe` paths), otherwise through the configured interpreter.
pub fn resolve_execution_plan(
    version: &RobotVersion,
    artifacts_root: &Path,
    run_dir: &Path,
    runtime_arguments: &[String],
    interpreter: &str,
) -> Result<ExecutionPlan, MaterializeError> {
    let mut artifact_path = version.artifact_path.clone();
    if artifact_path.is_relative() {
        artifact_path = artifacts_root.join(artifact_path);
    }
    if !artifact_path.exists() {
        return Err(MaterializeError::ArtifactMissing(artifact_path));
    }

    let arguments: Vec<String> = version
        .arguments
        .iter()
        .chain(runtime_arguments.iter())
        .cloned()
        .collect();

    match version.artifact_kind {
        ArtifactKind::Exe => {
            let mut command = vec![artifact_path.to_string_lossy().into_owned()];
            command.extend(arguments);
            let working_directory = version.working_directory.clone().unwrap_or_else(|| {
                artifact_path.parent().unwrap_or(Path::new(".")).to_path_buf()
            });
            Ok(ExecutionPlan { command, working_directory })
        }
        ArtifactKind::Zip => {
            let workspace_dir = run_dir.join("workspace");
            std::fs::create_dir_all(&workspace_dir)?;
            let mut archive = zip::ZipArchive::new(File::open(&artifact_path)?)?;
            archive.extract(&workspace_dir)?;

            let entrypoint = workspace_dir.join(&version.entrypoint_path);
            if !entrypoint.exists() {
                return Err(MaterializeError::EntrypointMissing(entrypoint));
            }

            let direct = version.entrypoint_kind == EntrypointKind::Exe
                || entrypoint
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("exe"));
            let mut command = if direct {
                vec![entrypoint.to_string_lossy().into_owned()]
            } else {
                vec![interpreter.to_string(), entrypoint.to_string_lossy().into_owned()]
            };
            command.extend(arguments);

            let working_directory =
                version.working_directory.clone().unwrap_or(workspace_dir);
            Ok(ExecutionPlan { command, working_directory })
        }
    }
}

/// Final child environment. Later layers override earlier ones:
/// process env ◁ version defaults ◁ robot env store ◁ request env.
pub fn compose_env(
    process_env: impl IntoIterator<Item = (String, String)>,
    version_defaults: &HashMap<String, String>,
    robot_env: &HashMap<String, String>,
    request_env: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = process_env.into_iter().collect();
    env.extend(version_defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(robot_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(request_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Every regular file under the run directory that a finished run produced.
///
/// The extracted `workspace/` tree is input, not output, and is skipped.
pub fn collect_output_files(run_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !run_dir.exists() {
        return Ok(files);
    }
    let skip = run_dir.join("workspace");
    collect_into(run_dir, &skip, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(dir: &Path, skip: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path == skip {
            continue;
        }
        if path.is_dir() {
            collect_into(&path, skip, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
