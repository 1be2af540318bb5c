//! # Bounded retry-with-mutation for service startup.
//!
//! Some services bind a port the orchestrator picked at random. A collision
//! shows up as the process exiting almost immediately, so a launch attempt is
//! judged by giving the child a short liveness window and polling it once.
//! On failure the candidate is regenerated and the launch retried, up to a
//! fixed attempt budget.
//!
//! The budget bounds attempt *count* only; wall-clock duration is left
//! unbounded on purpose, since each attempt's cost is itself bounded by the
//! liveness window.
//!
//! ## Example flow
//! ```text
//! loop (attempts) {
//!   candidate = generate()        // e.g. a fresh random port
//!   handle    = spawn(candidate)  // spawn failure is fatal, not retried
//!   sleep(liveness_window)
//!   handle alive? ──► yes: done (candidate, handle)
//!                └──► no:  next attempt with a new candidate
//! }
//! exhausted ──► None (caller maps to its typed error)
//! ```

use std::fmt::Display;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::error::Result;
use crate::process::ProcessHandle;

/// Retry budget and failure-detection window for one launch site.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Maximum number of launch attempts.
    pub attempts: u32,
    /// How long a fresh child gets to fail fast before being accepted.
    pub liveness_window: Duration,
}

impl RetryPolicy {
    /// A single attempt: used when the caller pinned the candidate
    /// explicitly and a collision must be immediately fatal.
    pub fn single(liveness_window: Duration) -> Self {
        Self {
            attempts: 1,
            liveness_window,
        }
    }
}

impl Default for RetryPolicy {
    /// Defaults: 20 attempts, 100ms liveness window.
    fn default() -> Self {
        Self {
            attempts: 20,
            liveness_window: Duration::from_millis(100),
        }
    }
}

/// Launches a process with retry-by-mutating-a-candidate.
///
/// `generate` mints the next candidate (typically a port); `start` spawns the
/// service for that candidate. A child that survives the liveness window is
/// accepted. Returns `Ok(None)` when the attempt budget is exhausted — the
/// caller maps that to its own typed error. Spawn errors are fatal and
/// propagate immediately; they indicate a missing binary, not a collision.
pub async fn spawn_until_live<C, G, S>(
    policy: &RetryPolicy,
    service: &'static str,
    mut generate: G,
    mut start: S,
) -> Result<Option<(C, ProcessHandle)>>
where
    C: Copy + Display,
    G: FnMut() -> C,
    S: FnMut(C) -> Result<ProcessHandle>,
{
    for attempt in 0..policy.attempts {
        if attempt > 0 {
            info!(service, attempt, "start failed, retrying with a new candidate");
        }
        let candidate = generate();
        let mut handle = start(candidate)?;
        sleep(policy.liveness_window).await;
        if handle.is_alive() {
            return Ok(Some((candidate, handle)));
        }
    }
    Ok(None)
}
