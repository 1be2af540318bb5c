//! # A single spawned service process.
//!
//! [`ProcessHandle`] wraps a [`tokio::process::Child`] together with the pid
//! captured at spawn time, so signals can still be addressed to the process
//! after the child reports an exit.
//!
//! ## Liveness
//! "Is this process still alive" is answered by a non-blocking poll that
//! distinguishes *still running* from *exited with a code*. No other IPC
//! channel is assumed.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{OrchestratorError, Result};
use crate::logs::LogFiles;

/// What to run for one service process.
///
/// The addresses and sockets a service needs are always encoded as
/// command-line arguments; the bound socket or port a service produces is
/// discovered out-of-band (return value of the launcher, or pre-selected by
/// the caller on the explicit-port path).
#[derive(Debug)]
pub struct ServiceCommand {
    /// Program to execute.
    pub program: PathBuf,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Working directory, when the service cares (dashboard frontend).
    pub cwd: Option<PathBuf>,
    /// Redirect targets for stdout/stderr; `None` inherits the parent's.
    pub logs: Option<LogFiles>,
    /// True when the process runs under a profiler and needs SIGINT before
    /// termination to flush profiler buffers.
    pub profiled: bool,
}

impl ServiceCommand {
    /// Creates a command for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            logs: None,
            profiled: false,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Attaches stdout/stderr redirect targets.
    pub fn logs(mut self, logs: Option<LogFiles>) -> Self {
        self.logs = logs;
        self
    }
}

/// Spawns a service process.
///
/// `service` is a stable human-readable name used in errors and logs.
pub fn spawn_service(service: &'static str, spec: ServiceCommand) -> Result<ProcessHandle> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).stdin(Stdio::null()).kill_on_drop(false);

    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    match spec.logs {
        Some(logs) => {
            debug!(
                service,
                stdout = %logs.stdout_path.display(),
                stderr = %logs.stderr_path.display(),
                "redirecting service output"
            );
            cmd.stdout(Stdio::from(logs.stdout));
            cmd.stderr(Stdio::from(logs.stderr));
        }
        None => {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }
    }

    let child = cmd
        .spawn()
        .map_err(|source| OrchestratorError::Spawn { service, source })?;
    let pid = child.id().ok_or_else(|| OrchestratorError::Spawn {
        service,
        source: std::io::Error::other("spawned process has no pid"),
    })?;
    debug!(service, pid, "spawned service process");

    Ok(ProcessHandle {
        service,
        child,
        pid,
        profiled: spec.profiled,
        #[cfg(test)]
        signals_suppressed: false,
    })
}

/// Handle to one spawned service process.
#[derive(Debug)]
pub struct ProcessHandle {
    service: &'static str,
    child: Child,
    pid: u32,
    profiled: bool,
    #[cfg(test)]
    signals_suppressed: bool,
}

impl ProcessHandle {
    /// The service name this process was spawned for.
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// The OS process id captured at spawn time.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// True when the process needs a profiler-flush SIGINT before terminating.
    pub fn profiled(&self) -> bool {
        self.profiled
    }

    /// Non-blocking liveness poll: true iff the process has not exited.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Sends SIGINT (profiler flush).
    pub fn interrupt(&self) {
        self.signal(libc::SIGINT);
    }

    /// Requests graceful shutdown with SIGTERM.
    pub fn terminate(&self) {
        self.signal(libc::SIGTERM);
    }

    /// Forcefully kills the process.
    pub fn kill(&mut self) {
        #[cfg(test)]
        if self.signals_suppressed {
            return;
        }
        // start_kill delivers SIGKILL without awaiting the reaped status.
        let _ = self.child.start_kill();
    }

    /// Makes every outgoing signal a no-op: the handle then behaves like a
    /// process that survives all termination attempts.
    #[cfg(test)]
    pub(crate) fn suppress_signals(&mut self) {
        self.signals_suppressed = true;
    }

    /// Waits for the process to exit. Errors from the underlying wait are
    /// treated as "already reaped".
    pub async fn wait(&mut self) {
        let _ = self.child.wait().await;
    }

    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) {
        #[cfg(test)]
        if self.signals_suppressed {
            return;
        }
        // A stale pid is harmless here: kill(2) on a reaped child of ours
        // fails with ESRCH, which we ignore.
        unsafe {
            libc::kill(self.pid as libc::pid_t, signal);
        }
    }

    #[cfg(not(unix))]
    fn signal(&self, _signal: i32) {
        // No graceful signal delivery off Unix; escalation handles it.
    }
}
