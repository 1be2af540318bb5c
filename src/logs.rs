//! # Log-file provisioning for spawned services.
//!
//! Every spawned process gets one stdout and one stderr redirect target,
//! named by a human-readable tag plus a zero-padded random numeric suffix so
//! repeated runs never collide.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{OrchestratorError, Result};

/// Default directory for per-process log files.
pub const DEFAULT_LOG_DIR: &str = "/tmp/clustervisor-logs";

/// An open stdout/stderr pair for one spawned process.
#[derive(Debug)]
pub struct LogFiles {
    /// Redirect target for the child's stdout.
    pub stdout: File,
    /// Redirect target for the child's stderr.
    pub stderr: File,
    /// Path of the stdout file, kept for log messages.
    pub stdout_path: PathBuf,
    /// Path of the stderr file, kept for log messages.
    pub stderr_path: PathBuf,
}

/// Creates redirect targets for one process, or `None` when output should be
/// inherited from the orchestrator.
///
/// File names look like `{tag}-{NNNNNN}.out` / `{tag}-{NNNNNN}.err` with a
/// zero-padded random suffix. Files are opened in append mode; the directory
/// is created on demand.
pub fn new_log_files(dir: &Path, tag: &str, redirect: bool) -> Result<Option<LogFiles>> {
    if !redirect {
        return Ok(None);
    }
    fs::create_dir_all(dir).map_err(|source| OrchestratorError::Spawn {
        service: "log provisioning",
        source,
    })?;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let stdout_path = dir.join(format!("{tag}-{suffix:06}.out"));
    let stderr_path = dir.join(format!("{tag}-{suffix:06}.err"));
    let open = |path: &Path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| OrchestratorError::Spawn {
                service: "log provisioning",
                source,
            })
    };
    Ok(Some(LogFiles {
        stdout: open(&stdout_path)?,
        stderr: open(&stderr_path)?,
        stdout_path,
        stderr_path,
    }))
}
