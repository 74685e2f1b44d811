//! CLI/orchestrator error taxonomy (§7, §6 exit-code contract).
//!
//! Everything upstream of a validated config surfaces as [`CfgError`];
//! everything from a running host as [`ExecutionError`]. This enum just
//! adds the handful of failure modes that only make sense at the
//! orchestration layer (bad `CFG` tokens, a failed remote dispatch).

use thiserror::Error;
use xact_types::{CfgError, HostId};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Cfg(#[from] CfgError),

    #[error(transparent)]
    Execution(#[from] xact_core::ExecutionError),

    #[error("malformed CFG token: {0}")]
    MalformedCfgToken(String),

    #[error("dispatch to host '{host}' failed: {reason}")]
    DispatchFailed { host: HostId, reason: String },

    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// §6: exit 0 on clean halt, 1 on config error or non-recoverable
    /// failure. Every CLI error kind is the latter.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
