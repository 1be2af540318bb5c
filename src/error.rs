//! Error types used by the orchestrator.
//!
//! A single [`OrchestratorError`] enum covers every fatal failure mode of the
//! bootstrap path. Best-effort services (the dashboard) report degradation as
//! a boolean instead of an error, so their failure never unwinds a bootstrap
//! call.
//!
//! ## Retry semantics
//! - `StoreStartFailed` / `ServiceStartFailed` are produced only after a
//!   bounded retry budget has been exhausted; the budget is part of the error.
//! - `MalformedAddress`, `InvalidConfig` and `InvariantViolation` are never
//!   retried. The last one always indicates a logic defect, not user error.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// # Errors produced by cluster bootstrap and teardown.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// An address string could not be decoded into a `host:port` pair.
    #[error("unable to parse host and port from address {address:?}")]
    MalformedAddress {
        /// The offending address string.
        address: String,
    },

    /// The OS refused to spawn a service process.
    #[error("failed to spawn {service}: {source}")]
    Spawn {
        /// Which service was being launched.
        service: &'static str,
        /// The underlying spawn error.
        source: std::io::Error,
    },

    /// The coordination store kept exiting right after launch; the retry
    /// budget (new random port per attempt) is exhausted.
    #[error("coordination store failed to start after {attempts} attempts")]
    StoreStartFailed {
        /// Number of launch attempts made.
        attempts: u32,
    },

    /// A service process kept exiting right after launch and its retry
    /// budget is exhausted.
    #[error("{service} failed to start after {attempts} attempts")]
    ServiceStartFailed {
        /// Which service was being launched.
        service: &'static str,
        /// Number of launch attempts made.
        attempts: u32,
    },

    /// The coordination store process is alive but never answered the
    /// liveness probe within the polling budget.
    #[error(
        "coordination store at {address} did not respond after {retries} probes; \
         if the store is on another machine, check that your firewall allows the connection"
    )]
    StoreUnreachable {
        /// The `host:port` address that was probed.
        address: String,
        /// Number of probes sent before giving up.
        retries: u32,
    },

    /// An I/O failure while configuring a store that already answered probes.
    #[error("i/o failure talking to the coordination store at {address}: {source}")]
    StoreIo {
        /// The `host:port` address of the store.
        address: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Caller-supplied configuration is rejected before any process spawns.
    #[error("invalid configuration: {detail}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        detail: String,
    },

    /// A post-condition assertion failed. This is a logic defect in the
    /// orchestrator, never a user-recoverable condition.
    #[error("invariant violated: {detail}")]
    InvariantViolation {
        /// Which invariant was violated.
        detail: String,
    },
}

impl OrchestratorError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            OrchestratorError::MalformedAddress { .. } => "malformed_address",
            OrchestratorError::Spawn { .. } => "spawn_failed",
            OrchestratorError::StoreStartFailed { .. } => "store_start_failed",
            OrchestratorError::ServiceStartFailed { .. } => "service_start_failed",
            OrchestratorError::StoreUnreachable { .. } => "store_unreachable",
            OrchestratorError::StoreIo { .. } => "store_io",
            OrchestratorError::InvalidConfig { .. } => "invalid_config",
            OrchestratorError::InvariantViolation { .. } => "invariant_violation",
        }
    }

    /// Builds an [`OrchestratorError::InvariantViolation`] from a message.
    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        OrchestratorError::InvariantViolation {
            detail: detail.into(),
        }
    }

    /// Builds an [`OrchestratorError::InvalidConfig`] from a message.
    pub(crate) fn config(detail: impl Into<String>) -> Self {
        OrchestratorError::InvalidConfig {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let err = OrchestratorError::MalformedAddress {
            address: "nope".into(),
        };
        assert_eq!(err.as_label(), "malformed_address");

        let err = OrchestratorError::StoreStartFailed { attempts: 20 };
        assert_eq!(err.as_label(), "store_start_failed");
    }

    #[test]
    fn test_display_names_the_exhausted_budget() {
        let err = OrchestratorError::StoreStartFailed { attempts: 20 };
        assert!(err.to_string().contains("20 attempts"));

        let err = OrchestratorError::StoreUnreachable {
            address: "10.0.0.1:6379".into(),
            retries: 5,
        };
        assert!(err.to_string().contains("5 probes"));
    }
}
